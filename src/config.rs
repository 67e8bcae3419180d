//! Run settings.
//!
//! Settings are layered: built-in defaults, then an optional YAML file,
//! then command-line flags and environment variables. Every knob the core
//! logic uses comes from here; nothing in the pipeline hardcodes a URL,
//! delay or phrase.
//!
//! # Example file
//!
//! ```yaml
//! feed_url: https://www.nrk.no/nyheter/siste.rss
//! store_path: data/corrections.json
//! scan_depth: 30
//! request_delay_ms: 1500
//! matcher:
//!   phrases:
//!     - NRK retter
//!     - I en tidligere versjon
//!   min_node_len: 30
//!   max_correction_len: 500
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::matcher::MatcherConfig;

pub const DEFAULT_FEED_URL: &str = "https://www.nrk.no/nyheter/siste.rss";
pub const DEFAULT_STORE_PATH: &str = "data/corrections.json";
pub const DEFAULT_USER_AGENT: &str =
    "NRK-Rettelser-Bot/1.0 (+https://github.com/nrk-rettelser/nrk-rettelser)";
pub const DEFAULT_CATEGORY: &str = "Feil i tidligere versjon (automatisk oppdaget)";

/// Everything one ingestion run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// RSS/Atom feed listing new articles.
    pub feed_url: String,
    /// JSON file holding every recorded correction.
    pub store_path: PathBuf,
    /// How many feed entries to consider per run.
    pub scan_depth: usize,
    /// Per-request timeout for feed and article fetches.
    pub request_timeout_secs: u64,
    /// Pause after every article fetch attempt.
    pub request_delay_ms: u64,
    /// Sent as `User-Agent` so the publisher can attribute the traffic.
    pub user_agent: String,
    /// Label stored on every auto-detected record.
    pub category: String,
    pub matcher: MatcherConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            scan_depth: 30,
            request_timeout_secs: 10,
            request_delay_ms: 1500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            matcher: MatcherConfig::default(),
        }
    }
}

impl Settings {
    /// Read settings from a YAML file. Missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded settings file");
        Ok(settings)
    }

    fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty or comment-only file deserializes to null.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<Option<Self>>(contents).map(Option::unwrap_or_default)
    }

    /// Resolve settings for a run: defaults, then `--config`, then flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_cli(cli);
        settings.validate()?;
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }

    /// Overlay any values given on the command line or via environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(feed_url) = &cli.feed_url {
            self.feed_url = feed_url.clone();
        }
        if let Some(store) = &cli.store {
            self.store_path = store.clone();
        }
        if let Some(depth) = cli.scan_depth {
            self.scan_depth = depth;
        }
        if let Some(delay) = cli.delay_ms {
            self.request_delay_ms = delay;
        }
        if let Some(timeout) = cli.timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(user_agent) = &cli.user_agent {
            self.user_agent = user_agent.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.feed_url()?;
        if self.scan_depth == 0 {
            return Err(ConfigError::Invalid("scan_depth must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user_agent cannot be empty".into()));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_path cannot be empty".into()));
        }
        if self.matcher.phrases.is_empty() {
            return Err(ConfigError::Invalid(
                "matcher.phrases needs at least one phrase".into(),
            ));
        }
        if self.matcher.phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "matcher.phrases cannot contain blank entries".into(),
            ));
        }
        if self.matcher.max_correction_len == 0 {
            return Err(ConfigError::Invalid(
                "matcher.max_correction_len must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn feed_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.feed_url)
            .map_err(|e| ConfigError::Invalid(format!("feed_url {:?}: {e}", self.feed_url)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}
