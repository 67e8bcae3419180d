//! Command-line interface definitions for NRK Rettelser.
//!
//! Every option can also come from an environment variable, which is the
//! usual way to configure scheduled runs. Anything left unset falls back to
//! the YAML file given with `--config`, then to built-in defaults.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for one ingestion run.
///
/// # Examples
///
/// ```sh
/// # Default NRK feed, records in data/corrections.json
/// nrk_rettelser
///
/// # Custom store and a deeper scan
/// nrk_rettelser --store /var/lib/rettelser/corrections.json --scan-depth 60
///
/// # Settings from a file, feed overridden from the environment
/// NRK_RETTELSER_FEED_URL=https://www.nrk.no/toppsaker.rss nrk_rettelser -c rettelser.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML settings file
    #[arg(short, long, env = "NRK_RETTELSER_CONFIG")]
    pub config: Option<PathBuf>,

    /// RSS/Atom feed to scan for new articles
    #[arg(long, env = "NRK_RETTELSER_FEED_URL")]
    pub feed_url: Option<String>,

    /// JSON file holding recorded corrections
    #[arg(short, long, env = "NRK_RETTELSER_STORE")]
    pub store: Option<PathBuf>,

    /// Number of feed entries to check per run
    #[arg(short = 'n', long, env = "NRK_RETTELSER_SCAN_DEPTH")]
    pub scan_depth: Option<usize>,

    /// Pause between article requests, in milliseconds
    #[arg(long, env = "NRK_RETTELSER_DELAY_MS")]
    pub delay_ms: Option<u64>,

    /// Per-request timeout, in seconds
    #[arg(long, env = "NRK_RETTELSER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// User-Agent sent with every request
    #[arg(long, env = "NRK_RETTELSER_USER_AGENT")]
    pub user_agent: Option<String>,
}
