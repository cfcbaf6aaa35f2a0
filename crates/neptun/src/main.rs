use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use neptun_common::sink::{EventSink, JsonlSink, LogSink};
use neptun_engine::config::ConfigLoader;
use neptun_engine::crawler::AvailabilityCrawler;
use neptun_webdriver::WebDriverSession;

#[derive(Parser)]
#[command(name = "neptun", version, about = "Booking portal availability crawler")]
struct Args {
    /// Configuration file (default: ./neptun.yaml, then ~/.neptun/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// WebDriver endpoint to attach to
    #[arg(long, default_value = "http://localhost:9515")]
    driver_url: String,

    /// Subscription code to crawl (repeatable)
    #[arg(long = "code")]
    codes: Vec<String>,

    /// File with one subscription code per line ('#' starts a comment)
    #[arg(long)]
    codes_file: Option<PathBuf>,

    /// Display name attached to collected records
    #[arg(long)]
    name: Option<String>,

    /// Append availability records to this JSON Lines file
    #[arg(long)]
    records: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr; stdout carries only the per-code summaries.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut codes = args.codes.clone();
    if let Some(path) = &args.codes_file {
        let contents = tokio::fs::read_to_string(path).await?;
        codes.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string),
        );
    }
    if codes.is_empty() {
        return Err("no subscription codes given; use --code or --codes-file".into());
    }

    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };

    let sink: Arc<dyn EventSink> = match &args.records {
        Some(path) => Arc::new(JsonlSink::open(path)?),
        None => Arc::new(LogSink),
    };

    let mut session = match WebDriverSession::connect(&args.driver_url).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to connect to WebDriver: {}", e);
            return Err(e.into());
        }
    };

    let total = codes.len();
    let mut failed = 0usize;
    for code in &codes {
        let crawler = AvailabilityCrawler::new(config.clone(), Arc::clone(&sink));
        info!(code = code.as_str(), session = crawler.session_id(), "starting crawl");
        match crawler.run(&mut session, code, args.name.as_deref()).await {
            Ok(summary) => {
                println!(
                    "{}: {} records over {} month(s), {} date(s) skipped{}",
                    code,
                    summary.records_collected,
                    summary.months_visited,
                    summary.dates_failed,
                    summary
                        .remaining_reservations
                        .map(|n| format!(", {n} reservation(s) remaining"))
                        .unwrap_or_default(),
                );
            }
            // A terminal failure halts this code only; the batch moves on.
            Err(e) => {
                error!(code = code.as_str(), error = %e, "crawl failed");
                println!("{}: failed ({})", code, e);
                failed += 1;
            }
        }
    }

    session.close().await?;

    if failed > 0 {
        return Err(format!("{failed} of {total} subscription(s) failed").into());
    }
    Ok(())
}
