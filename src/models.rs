//! Data models for feed candidates and detected corrections.
//!
//! - [`Candidate`]: one feed entry considered during a single run
//! - [`CorrectionRecord`]: one persisted correction
//!
//! Records are serialized with camelCase field names so the stored JSON
//! stays readable by the presentation layer that consumes it.

use serde::{Deserialize, Serialize};

/// A feed entry considered for processing in the current run.
///
/// Never persisted; discarded after the run whatever its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute article URL.
    pub url: String,
    /// Headline as given by the feed.
    pub title: String,
    /// Publication timestamp exactly as the feed wrote it, if any.
    pub published_at: Option<String>,
}

/// A detected correction as stored in the record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRecord {
    /// Microseconds since the Unix epoch, bumped to stay unique within a run.
    pub id: u64,
    /// Feed timestamp, or detection time when the feed omitted one.
    pub published_at: String,
    /// Trimmed article headline.
    pub title: String,
    /// Fixed label describing how the record came to be.
    #[serde(default)]
    pub category: String,
    /// Extracted correction notice, or a placeholder.
    #[serde(default)]
    pub correction_text: String,
    /// Article URL; unique across the store.
    pub url: String,
    /// `true` for every record produced by the pipeline.
    #[serde(default)]
    pub auto_detected: bool,
}

impl CorrectionRecord {
    /// Build an auto-detected record for `candidate`.
    ///
    /// `detected_at` is used when the feed carried no timestamp.
    pub fn detected(
        id: u64,
        candidate: &Candidate,
        category: &str,
        correction_text: String,
        detected_at: &str,
    ) -> Self {
        Self {
            id,
            published_at: candidate
                .published_at
                .clone()
                .unwrap_or_else(|| detected_at.to_string()),
            title: candidate.title.trim().to_string(),
            category: category.to_string(),
            correction_text,
            url: candidate.url.clone(),
            auto_detected: true,
        }
    }
}
