//! Durable, append-only store of detected corrections.
//!
//! The store is a single pretty-printed JSON array on disk. A run loads it
//! once, appends in memory, and writes the whole array back exactly once at
//! the end.
//!
//! # Durability
//!
//! [`CorrectionStore::persist`] writes to a temporary file in the target
//! directory and renames it over the old file, so a run killed mid-write
//! leaves the previously persisted records untouched. The replacement keeps
//! the old file's permissions; a first write is created world-readable so
//! the site that publishes the records can read it.
//!
//! # Ordering
//!
//! Records are written sorted by `publishedAt`, descending, comparing the
//! stored strings lexically. The sort is stable: equal timestamps keep their
//! relative order.

use std::collections::HashSet;
use std::fs::Permissions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::models::CorrectionRecord;
use crate::utils::now_micros;

/// In-memory view of the record file for the duration of one run.
#[derive(Debug)]
pub struct CorrectionStore {
    path: PathBuf,
    records: Vec<CorrectionRecord>,
    urls: HashSet<String>,
    last_id: u64,
}

impl CorrectionStore {
    /// Load the record file at `path`.
    ///
    /// A missing file is an empty store. A file that exists but does not
    /// hold a JSON array of records with unique URLs is an error; history
    /// is never silently discarded.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let records: Vec<CorrectionRecord> = match fs::read_to_string(&path).await {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| StoreError::Malformed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No existing record file; starting empty");
                Vec::new()
            }
            Err(source) => return Err(StoreError::Load { path, source }),
        };

        let mut urls = HashSet::with_capacity(records.len());
        for record in &records {
            if !urls.insert(record.url.clone()) {
                return Err(StoreError::Malformed {
                    path,
                    reason: format!("duplicate url {}", record.url),
                });
            }
        }
        let last_id = records.iter().map(|r| r.id).max().unwrap_or(0);

        info!(count = records.len(), "Loaded correction records");
        Ok(Self {
            path,
            records,
            urls,
            last_id,
        })
    }

    /// Whether a record for `url` exists.
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Add a new record. Fails if its URL is already recorded.
    pub fn append(&mut self, record: CorrectionRecord) -> Result<(), StoreError> {
        if !self.urls.insert(record.url.clone()) {
            return Err(StoreError::Conflict(record.url));
        }
        self.last_id = self.last_id.max(record.id);
        debug!(url = %record.url, id = record.id, "Appended record");
        self.records.push(record);
        Ok(())
    }

    /// Issue a record id: the current time in microseconds, bumped past
    /// every id already in the store or handed out earlier.
    pub fn next_id(&mut self) -> u64 {
        self.last_id = now_micros().max(self.last_id.saturating_add(1));
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[cfg(test)]
    pub fn records(&self) -> &[CorrectionRecord] {
        &self.records
    }

    /// Sort newest first and atomically replace the record file.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = self.records.len()))]
    pub async fn persist(&mut self) -> Result<(), StoreError> {
        let staged = self.stage().await?;
        self.commit(staged)?;
        info!("Persisted correction records");
        Ok(())
    }

    fn write_error(&self, reason: impl ToString) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Write the sorted records to a synced temp file next to the target.
    async fn stage(&mut self) -> Result<NamedTempFile, StoreError> {
        // `sort_by` is stable, so equal timestamps keep insertion order.
        self.records.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        let mut json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| self.write_error(e))?;
        json.push('\n');

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| self.write_error(e))?;

        let permissions = match fs::metadata(&self.path).await {
            Ok(meta) => Some(meta.permissions()),
            Err(_) => new_file_permissions(),
        };

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.write_error(e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| self.write_error(e))?;
        if let Some(permissions) = permissions {
            tmp.as_file()
                .set_permissions(permissions)
                .map_err(|e| self.write_error(e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.write_error(e))?;
        Ok(tmp)
    }

    /// Rename a staged file over the target.
    fn commit(&self, staged: NamedTempFile) -> Result<(), StoreError> {
        staged
            .persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;
        Ok(())
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
