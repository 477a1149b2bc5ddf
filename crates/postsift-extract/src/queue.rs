//! Append-only queue of permanently failed posts

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use postsift_core::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One failed item awaiting retry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    /// Post URL the failure refers to
    pub url: String,

    /// Stage that failed: `extract` or `classify`
    pub stage: String,

    /// Reason recorded at failure time
    pub reason: String,

    /// When the failure happened
    pub failed_at: DateTime<Utc>,
}

impl FailedItem {
    /// Record a failure happening now
    pub fn new(
        url: impl Into<String>,
        stage: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            stage: stage.into(),
            reason: reason.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Append-only JSONL queue of failed posts.
///
/// The retry surface drains the queue, re-processes every item, and appends
/// the ones that fail again.
#[derive(Debug, Clone)]
pub struct FailureQueue {
    path: PathBuf,
}

impl FailureQueue {
    /// Open a queue at `path`; the file is created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the queue lives on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failed item
    pub fn append(&self, item: &FailedItem) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(item)?)?;
        Ok(())
    }

    /// Load every queued item, skipping lines that no longer parse
    pub fn load(&self) -> Result<Vec<FailedItem>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut items = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<FailedItem>(line) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping unreadable queue line: {}", e),
            }
        }
        Ok(items)
    }

    /// Take every queued item and truncate the queue
    pub fn drain(&self) -> Result<Vec<FailedItem>> {
        let items = self.load()?;
        if self.path.exists() {
            fs::write(&self.path, b"")?;
        }
        Ok(items)
    }

    /// Number of queued items
    pub fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }
}
