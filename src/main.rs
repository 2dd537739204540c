//! # News Poster
//!
//! Picks at most one fresh, not-yet-processed news story per run from a
//! Google News RSS feed and finds the best illustrative image for it.
//!
//! ## Features
//!
//! - Freshness window and last-seen deduplication across scheduled runs
//! - Canonical publisher URL resolution for aggregator links
//! - Multi-tier image search: publisher metadata, AMP pages, feed media,
//!   image-search fallback and aggregator thumbnails
//! - Download validation (size, decode, minimum dimensions) and tiered ranking
//! - Operator headline override that bypasses the gate
//!
//! ## Usage
//!
//! ```sh
//! news_poster -q "nepal protests" -a 30 -o ./out
//! ```
//!
//! ## Architecture
//!
//! 1. **Config**: defaults, optional YAML file, then flags and environment
//! 2. **Gate**: newest feed item, freshness check, dedup against the state file
//! 3. **Images**: resolve, extract candidates concurrently, validate, select
//! 4. **Output**: PNG + `meta.json`, then the new state is persisted
//!
//! Every run ends by printing `outcome=<signal>` on stdout.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod extractors;
mod feeds;
mod gate;
mod http;
mod images;
mod models;
mod outputs;
mod pipeline;
mod resolver;
mod state;
mod utils;

use cli::Cli;
use config::Settings;
use pipeline::Pipeline;
use utils::{ensure_writable_dir, truncate_for_log};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_poster starting up");

    // Parse CLI and settle configuration before touching the network
    let args = Cli::parse();
    debug!(?args.config, ?args.news_query, "Parsed CLI arguments");
    let settings = Settings::load(&args)?;
    info!(
        feed = %settings.resolved_feed_url(),
        max_age_minutes = settings.max_age_minutes,
        "Configuration loaded"
    );

    if let Err(e) = ensure_writable_dir(&settings.output_dir).await {
        error!(error = %e, "Output directory is not writable (fix perms or choose a different path)");
        return Err(e.into());
    }

    let manual = read_override(args.headline.as_deref(), &settings.override_path).await;
    let state = state::load(&settings.state_path).await;

    let output_dir = settings.output_dir.clone();
    let state_path = settings.state_path.clone();
    let pipeline = Pipeline::new(settings)?;

    let now = Utc::now();
    let (outcome, next_state) = pipeline.run(manual.as_deref(), &state, now).await;

    // Commit only once the outputs exist, so a failed write can be retried.
    match outputs::write_run(&outcome, &output_dir, now).await {
        Ok(Some(meta_path)) => {
            info!(path = %meta_path.display(), "Outputs written");
            if let Err(e) = state::save(&state_path, &next_state).await {
                error!(error = %e, "Failed to persist state; the story may be picked again");
            }
        }
        Ok(None) => debug!("No outputs for this outcome"),
        Err(e) => error!(error = %e, "Failed to write outputs; state left unchanged"),
    }

    println!("outcome={}", outcome.signal());

    let elapsed = start_time.elapsed();
    let uid = outcome.fingerprint();
    info!(
        outcome = %outcome.signal(),
        uid = uid.map(|fp| fp.as_str()),
        manual = uid.is_some_and(|fp| fp.is_manual()),
        age_minutes = outcome.stale_age_minutes(),
        elapsed_secs = elapsed.as_secs_f64(),
        "Run finished"
    );

    Ok(())
}

/// The operator headline: `--headline`, else the override file's contents.
/// Blank values mean no override.
async fn read_override(flag: Option<&str>, path: &Path) -> Option<String> {
    if let Some(headline) = flag.map(str::trim).filter(|h| !h.is_empty()) {
        return Some(headline.to_string());
    }
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let headline = contents.trim();
            if headline.is_empty() {
                None
            } else {
                info!(path = %path.display(), headline = %truncate_for_log(headline, 120), "Override file present");
                Some(headline.to_string())
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Override file unreadable; ignoring");
            None
        }
    }
}
