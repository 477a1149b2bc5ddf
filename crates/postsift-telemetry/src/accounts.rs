//! Flagged account store
//!
//! Keeps the accounts whose posts drew a harmful verdict, one JSON line per
//! account. The store is loaded whole at startup and kept in memory behind a
//! lock; recording appends to the backing file so restarts keep history.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One flagged account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account handle as scraped or submitted
    pub username: String,

    /// Normalized platform name
    pub platform: String,

    /// Profile or post URL that produced the flag, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// When the account was first flagged
    pub first_seen: DateTime<Utc>,
}

impl AccountRecord {
    /// Build a record with the platform normalized and first_seen set to now
    pub fn new(username: impl Into<String>, platform: &str, url: Option<String>) -> Self {
        Self {
            username: username.into(),
            platform: normalize_platform(platform, url.as_deref()),
            url,
            first_seen: Utc::now(),
        }
    }
}

/// Collapse platform spellings into one display name.
///
/// Twitter and X handles arrive under several spellings and sometimes only as
/// a URL; both collapse to "X (Twitter)" so the store dedupes across them.
pub fn normalize_platform(platform: &str, url: Option<&str>) -> String {
    let name = platform.trim();
    let lowered = name.to_lowercase();

    if lowered == "twitter" || lowered == "x" || lowered == "x (twitter)" {
        return "X (Twitter)".to_string();
    }

    if name.is_empty() {
        if let Some(url) = url {
            if url.contains("twitter.com") || url.contains("x.com") {
                return "X (Twitter)".to_string();
            }
        }
        return "Unknown".to_string();
    }

    name.to_string()
}

/// Persistent store of flagged accounts
pub struct AccountStore {
    path: PathBuf,
    records: RwLock<Vec<AccountRecord>>,
}

impl AccountStore {
    /// Open the store, loading any previously flagged accounts
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = Self::load(&path)?;

        if !records.is_empty() {
            info!("Loaded {} flagged accounts from {:?}", records.len(), path);
        }

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    fn load(path: &Path) -> std::io::Result<Vec<AccountRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<AccountRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping corrupt account record: {}", e),
            }
        }

        Ok(records)
    }

    /// Record an account if it is not already flagged.
    ///
    /// Dedup is case-insensitive on (username, platform); the first sighting
    /// wins and later reports of the same account are ignored. Returns true
    /// when the record was new.
    pub fn record(&self, record: AccountRecord) -> std::io::Result<bool> {
        let mut records = self.records.write();

        let duplicate = records.iter().any(|existing| {
            existing.username.eq_ignore_ascii_case(&record.username)
                && existing.platform == record.platform
        });
        if duplicate {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let json = serde_json::to_string(&record)?;
        writeln!(file, "{}", json)?;

        info!(
            "Flagged account {} on {}",
            record.username, record.platform
        );
        records.push(record);
        Ok(true)
    }

    /// All flagged accounts, oldest first
    pub fn list(&self) -> Vec<AccountRecord> {
        self.records.read().clone()
    }

    /// Number of flagged accounts
    pub fn count(&self) -> usize {
        self.records.read().len()
    }
}
