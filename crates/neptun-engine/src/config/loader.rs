use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::schema::EngineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the first candidate location that exists, falling back to
    /// the built-in defaults when none does.
    pub async fn load_default() -> Result<EngineConfig, ConfigError> {
        for path in Self::candidate_paths() {
            if path.exists() {
                debug!(path = %path.display(), "loading configuration");
                return Self::load_from(&path).await;
            }
        }
        debug!("no configuration file found, using defaults");
        Ok(EngineConfig::default())
    }

    /// Lookup order: the working directory first, then the per-user file.
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./neptun.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".neptun").join("config.yaml"));
        }
        paths
    }

    pub async fn load_from(path: &Path) -> Result<EngineConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
