//! One ingestion run: feed -> fetch -> detect -> merge -> persist.
//!
//! # Flow
//!
//! 1. Load the record store (fatal if corrupt).
//! 2. Read feed candidates (fatal if the feed is unusable; nothing is written).
//! 3. For each candidate, in feed order and strictly one at a time:
//!    skip known URLs, fetch the page, detect a correction, append a record.
//!    A failed fetch is logged and skipped.
//! 4. Pause after every fetch attempt so the publisher sees a bounded rate.
//! 5. Persist once, at the end.
//!
//! Because the store is written only in step 5, a run killed part-way
//! leaves the previous file exactly as it was.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::error::RunError;
use crate::feed::FeedSource;
use crate::fetcher::{PageResult, PageSource};
use crate::matcher::PhraseMatcher;
use crate::models::CorrectionRecord;
use crate::store::CorrectionStore;
use crate::utils::{detection_timestamp, truncate_for_log};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Records in the store after the run.
    pub total: usize,
    /// Records added by this run.
    pub added: usize,
    /// Candidates whose page was fetched.
    pub checked: usize,
    /// Candidates skipped because their URL was already recorded.
    pub skipped: usize,
    /// Candidates whose page could not be fetched.
    pub failed: usize,
}

/// Wires the pipeline components together for a single pass.
pub struct IngestionRun<F, P> {
    feed: F,
    pages: P,
    matcher: PhraseMatcher,
    store_path: PathBuf,
    scan_depth: usize,
    request_delay: Duration,
    category: String,
}

impl<F, P> IngestionRun<F, P>
where
    F: FeedSource,
    P: PageSource,
{
    pub fn new(
        feed: F,
        pages: P,
        matcher: PhraseMatcher,
        store_path: impl Into<PathBuf>,
        scan_depth: usize,
        request_delay: Duration,
        category: impl Into<String>,
    ) -> Self {
        Self {
            feed,
            pages,
            matcher,
            store_path: store_path.into(),
            scan_depth,
            request_delay,
            category: category.into(),
        }
    }

    #[instrument(level = "info", skip_all, fields(store = %self.store_path.display()))]
    pub async fn execute(&self) -> Result<RunReport, RunError> {
        let mut store = CorrectionStore::load(&self.store_path).await?;
        let candidates = self.feed.fetch_candidates(self.scan_depth).await?;
        info!(candidates = candidates.len(), known = store.len(), "Starting scan");

        let mut report = RunReport::default();

        for candidate in &candidates {
            if store.contains(&candidate.url) {
                report.skipped += 1;
                continue;
            }

            info!(url = %candidate.url, "Checking article");
            let page = self.pages.fetch(&candidate.url).await;

            match page {
                PageResult::Failed(e) => {
                    report.failed += 1;
                    warn!(
                        url = %candidate.url,
                        kind = e.kind(),
                        error = %truncate_for_log(&e.to_string(), 200),
                        "Skipping article after fetch error"
                    );
                }
                PageResult::Ok(html) => {
                    report.checked += 1;
                    if let Some(correction_text) = self.matcher.detect(&html) {
                        let record = CorrectionRecord::detected(
                            store.next_id(),
                            candidate,
                            &self.category,
                            correction_text,
                            &detection_timestamp(),
                        );
                        let title = record.title.clone();
                        store.append(record)?;
                        info!(%title, url = %candidate.url, "Added correction");
                        report.added += 1;
                    }
                }
            }

            sleep(self.request_delay).await;
        }

        store.persist().await?;
        report.total = store.len();

        info!(
            total = report.total,
            new = report.added,
            checked = report.checked,
            skipped = report.skipped,
            failed = report.failed,
            "Run complete"
        );
        Ok(report)
    }
}
