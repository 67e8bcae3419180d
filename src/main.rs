//! # NRK Rettelser
//!
//! Detects published correction notices on news articles. Each run polls
//! the outlet's RSS feed, fetches every article not seen before, looks for
//! stock correction phrases ("NRK retter", "I en tidligere versjon", ...)
//! and appends what it finds to a JSON record file.
//!
//! ## Usage
//!
//! ```sh
//! nrk_rettelser --store data/corrections.json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Load**: Read the existing correction records
//! 2. **Index**: Read candidate articles from the feed
//! 3. **Fetch**: Download each unseen article, one at a time, with a pause
//! 4. **Detect**: Scan the page for trigger phrases and isolate the notice
//! 5. **Persist**: Sort newest first and atomically rewrite the record file
//!
//! Runs are meant to be scheduled externally (cron, CI); overlapping runs
//! against the same record file are not supported.

use std::error::Error;

use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod error;
mod feed;
mod fetcher;
mod matcher;
mod models;
mod run;
mod store;
mod utils;

#[cfg(test)]
mod test_support;

use cli::Cli;
use config::Settings;
use feed::FeedReader;
use fetcher::{build_client, ArticleFetcher};
use matcher::PhraseMatcher;
use run::IngestionRun;

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
    info!(version = env!("CARGO_PKG_VERSION"), "nrk_rettelser starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = Settings::load(&args).inspect_err(|e| {
        error!(error = %e, "Invalid settings");
    })?;
    info!(
        feed_url = %settings.feed_url,
        store = %settings.store_path.display(),
        scan_depth = settings.scan_depth,
        "Settings resolved"
    );

    // One client for feed and articles: same identifier, same timeout.
    let client = build_client(&settings.user_agent, settings.request_timeout())?;
    let ingestion = IngestionRun::new(
        FeedReader::new(client.clone(), settings.feed_url()?),
        ArticleFetcher::new(client),
        PhraseMatcher::new(settings.matcher.clone()),
        settings.store_path.clone(),
        settings.scan_depth,
        settings.request_delay(),
        settings.category.clone(),
    );

    let report = match ingestion.execute().await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Run failed; record file left unchanged");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    println!(
        "Done. Total corrections: {} ({} new this run)",
        report.total, report.added
    );

    Ok(())
}
