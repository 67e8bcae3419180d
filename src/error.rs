//! Error types for the correction pipeline.
//!
//! Errors are split by how the run treats them:
//! - [`FeedError`], [`StoreError`] and [`ConfigError`] are fatal.
//! - [`FetchError`] is recovered per article; the candidate is skipped.

use std::path::PathBuf;

use thiserror::Error;

/// The source feed could not be retrieved or understood.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("feed responded with HTTP {0}")]
    Status(u16),

    #[error("feed is not a readable RSS/Atom document: {0}")]
    Parse(String),
}

/// A single article page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("could not read response body: {0}")]
    Body(String),
}

impl FetchError {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Request(_) => "request",
            FetchError::Status(_) => "status",
            FetchError::Body(_) => "body",
        }
    }
}

/// Loading, appending to or writing the correction record file failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not a valid correction record file: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("a correction for {0} is already recorded")]
    Conflict(String),
}

/// Settings could not be loaded or are unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Fatal outcome of an ingestion run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
