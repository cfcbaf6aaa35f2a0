//! Engine tuning, threaded through component constructors instead of
//! living as ambient module-level globals, so collection and interactive
//! usage can supply different values without mutating shared state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Per-tier timeouts. Short covers presence probes, medium covers ordinary
/// interactions, long covers full page/calendar loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutTiers {
    pub short_ms: u64,
    pub medium_ms: u64,
    pub long_ms: u64,
}

impl Default for TimeoutTiers {
    fn default() -> Self {
        Self {
            short_ms: 2_000,
            medium_ms: 5_000,
            long_ms: 15_000,
        }
    }
}

impl TimeoutTiers {
    pub fn short(&self) -> Duration {
        Duration::from_millis(self.short_ms)
    }

    pub fn medium(&self) -> Duration {
        Duration::from_millis(self.medium_ms)
    }

    pub fn long(&self) -> Duration {
        Duration::from_millis(self.long_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entry page of the booking portal.
    pub portal_url: String,
    /// Attempt budget for element-level operations.
    pub max_retry_attempts: u32,
    /// Base delay fed into both backoff curves.
    pub base_retry_delay_ms: u64,
    /// Polling cadence inside a resolution share.
    pub poll_interval_ms: u64,
    /// Brief clickability wait applied before each click.
    pub click_wait_ms: u64,
    pub timeouts: TimeoutTiers,
    /// Upper bound on calendar months visited in one crawl session.
    pub max_months: u32,
    /// A month view with fewer enabled dates than this triggers one
    /// immediate advance before iteration starts.
    pub minimum_available_days: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            portal_url:
                "https://bpsb.registo.ro/client-interface/appointment-subscription/step1".into(),
            max_retry_attempts: 3,
            base_retry_delay_ms: 500,
            poll_interval_ms: 250,
            click_wait_ms: 1_000,
            timeouts: TimeoutTiers::default(),
            max_months: 2,
            minimum_available_days: 15,
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn click_wait(&self) -> Duration {
        Duration::from_millis(self.click_wait_ms)
    }

    /// Linear policy for element-level retries.
    pub fn element_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(
            self.max_retry_attempts,
            Duration::from_millis(self.base_retry_delay_ms),
        )
    }

    /// Exponential policy for multi-step procedure retries. Deliberately a
    /// different curve from [`EngineConfig::element_policy`].
    pub fn procedure_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_retry_attempts,
            Duration::from_millis(self.base_retry_delay_ms),
        )
    }
}
