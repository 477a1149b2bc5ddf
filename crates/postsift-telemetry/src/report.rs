//! Classification report log
//!
//! Append-only persistence for classification verdicts with:
//! - JSON-lines format for append-only writes
//! - Size-based rotation (rotated files are kept, never pruned)
//! - Query and filter capabilities
//! - Export for offline review and the label-distribution summary

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use postsift_core::{Classification, ClassificationRequest};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Configuration for report persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory to store report files
    pub report_dir: PathBuf,

    /// Maximum file size before rotation (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Flush to disk after this many records
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("./reports"),
            max_file_size: default_max_file_size(),
            flush_interval: default_flush_interval(),
        }
    }
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_flush_interval() -> usize {
    10
}

/// One recorded classification verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Unique record ID
    pub id: String,

    /// When the verdict was recorded
    pub recorded_at: DateTime<Utc>,

    /// Canonical URL of the post, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Post text that was classified
    pub text: String,

    /// Posting account's handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Post timestamp as scraped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_time: Option<String>,

    /// Caller surface that produced the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Label assigned by the classifier service
    pub label: String,

    /// Optional explanation returned alongside the label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Endpoint that produced the verdict
    pub endpoint: String,

    /// Winning attempt latency (milliseconds)
    pub latency_ms: u64,

    /// Hash of the classified content, for duplicate detection
    pub text_sha256: String,
}

impl ReportRecord {
    /// Build a record from a request and the verdict it received
    pub fn new(request: &ClassificationRequest, verdict: &Classification) -> Self {
        Self {
            id: generate_record_id(),
            recorded_at: Utc::now(),
            url: request.url.clone(),
            text: request.text.clone().unwrap_or_default(),
            author: request.author.clone(),
            post_time: request.post_time.clone(),
            source: request.source.clone(),
            label: verdict.label.clone(),
            reason: verdict.reason.clone(),
            endpoint: verdict.endpoint.clone(),
            latency_ms: verdict.latency_ms,
            text_sha256: content_hash(request),
        }
    }
}

/// Generate a unique record ID using UUID v4
fn generate_record_id() -> String {
    format!("rpt_{}", uuid::Uuid::new_v4())
}

/// Hash the request's content identity: its text when present, else its URL
pub fn content_hash(request: &ClassificationRequest) -> String {
    let identity = request
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or(request.url.as_deref())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Report file writer with size-based rotation
pub struct ReportWriter {
    config: ReportConfig,
    current_file: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    current_size: u64,
    records_since_flush: usize,
}

impl ReportWriter {
    /// Create a new report writer
    pub fn new(config: ReportConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.report_dir)?;

        let mut writer = Self {
            config,
            current_file: None,
            current_path: None,
            current_size: 0,
            records_since_flush: 0,
        };

        writer.open_new_file()?;
        Ok(writer)
    }

    /// Append one record to the report log
    pub fn write_record(&mut self, record: &ReportRecord) -> std::io::Result<()> {
        if self.should_rotate() {
            self.rotate()?;
        }

        let json = serde_json::to_string(record)?;
        let line = format!("{}\n", json);
        let bytes = line.as_bytes();

        if let Some(ref mut writer) = self.current_file {
            writer.write_all(bytes)?;
            self.current_size += bytes.len() as u64;
            self.records_since_flush += 1;

            if self.records_since_flush >= self.config.flush_interval {
                writer.flush()?;
                self.records_since_flush = 0;
            }
        }

        Ok(())
    }

    /// Force flush to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
            self.records_since_flush = 0;
        }
        Ok(())
    }

    fn should_rotate(&self) -> bool {
        self.current_size >= self.config.max_file_size
    }

    /// Rotate to a new file; rotated files stay on disk as the system of record
    fn rotate(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;

        if let Some(ref current_path) = self.current_path {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();

            // Same-second rotations must not overwrite an earlier file.
            let mut rotated_path = self
                .config
                .report_dir
                .join(format!("reports_{}.jsonl", timestamp));
            let mut attempt = 1;
            while rotated_path.exists() {
                rotated_path = self
                    .config
                    .report_dir
                    .join(format!("reports_{}_{}.jsonl", timestamp, attempt));
                attempt += 1;
            }

            if let Err(e) = std::fs::rename(current_path, &rotated_path) {
                warn!("Failed to rotate report file: {}", e);
            } else {
                info!("Rotated report file to: {:?}", rotated_path);
            }
        }

        self.open_new_file()
    }

    fn open_new_file(&mut self) -> std::io::Result<()> {
        let path = self.config.report_dir.join("reports_current.jsonl");

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let metadata = file.metadata()?;
        self.current_size = metadata.len();
        self.current_file = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_since_flush = 0;

        Ok(())
    }
}

/// Query filter for report records
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    /// Filter by assigned label
    pub label: Option<String>,

    /// Filter by caller surface
    pub source: Option<String>,

    /// Filter by producing endpoint
    pub endpoint: Option<String>,

    /// Only records at or after this time
    pub since: Option<DateTime<Utc>>,

    /// Only records at or before this time
    pub until: Option<DateTime<Utc>>,

    /// Maximum results to return
    pub limit: Option<usize>,

    /// Offset for pagination
    pub offset: Option<usize>,
}

impl ReportQuery {
    /// Create a new empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by assigned label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Filter by caller surface
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Filter by producing endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set time window
    pub fn time_range(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    /// Set limit and offset
    pub fn paginate(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Set just limit (for convenience)
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Report reader for querying persisted records
pub struct ReportReader {
    config: ReportConfig,
}

impl ReportReader {
    /// Create a new report reader
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Query report records across current and rotated files
    pub fn query(&self, query: &ReportQuery) -> std::io::Result<Vec<ReportRecord>> {
        let mut results = Vec::new();
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(1000);
        let mut skipped = 0;

        for file_path in self.report_files()? {
            let file = File::open(&file_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.is_empty() {
                    continue;
                }

                match serde_json::from_str::<ReportRecord>(&line) {
                    Ok(record) => {
                        if self.matches_query(&record, query) {
                            if skipped < offset {
                                skipped += 1;
                                continue;
                            }

                            results.push(record);

                            if results.len() >= limit {
                                return Ok(results);
                            }
                        }
                    }
                    Err(e) => {
                        debug!("Failed to parse report record: {}", e);
                        continue;
                    }
                }
            }
        }

        Ok(results)
    }

    /// Count records matching the query
    pub fn count(&self, query: &ReportQuery) -> std::io::Result<usize> {
        let mut count = 0;

        for file_path in self.report_files()? {
            let file = File::open(&file_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.is_empty() {
                    continue;
                }

                if let Ok(record) = serde_json::from_str::<ReportRecord>(&line) {
                    if self.matches_query(&record, query) {
                        count += 1;
                    }
                }
            }
        }

        Ok(count)
    }

    /// Count records per label across the whole log, most frequent first
    pub fn label_distribution(&self) -> std::io::Result<Vec<(String, usize)>> {
        let mut counts = std::collections::HashMap::new();

        for record in self.query(&ReportQuery::new().limit(usize::MAX))? {
            *counts.entry(record.label).or_insert(0usize) += 1;
        }

        let mut distribution: Vec<(String, usize)> = counts.into_iter().collect();
        distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(distribution)
    }

    /// True when a record with the same content hash already exists
    pub fn is_duplicate(&self, request: &ClassificationRequest) -> std::io::Result<bool> {
        let hash = content_hash(request);

        for file_path in self.report_files()? {
            let file = File::open(&file_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.is_empty() {
                    continue;
                }
                if let Ok(record) = serde_json::from_str::<ReportRecord>(&line) {
                    if record.text_sha256 == hash {
                        return Ok(true);
                    }
                }
            }
        }

        Ok(false)
    }

    /// Export records to a file for offline review
    pub fn export_to_file(
        &self,
        query: &ReportQuery,
        output_path: &Path,
        format: ExportFormat,
    ) -> std::io::Result<usize> {
        let records = self.query(query)?;
        let count = records.len();

        let mut file = File::create(output_path)?;

        match format {
            ExportFormat::JsonLines => {
                for record in &records {
                    let json = serde_json::to_string(record)?;
                    writeln!(file, "{}", json)?;
                }
            }
            ExportFormat::Json => {
                let json = serde_json::to_string_pretty(&records)?;
                write!(file, "{}", json)?;
            }
            ExportFormat::Csv => {
                writeln!(
                    file,
                    "id,recorded_at,url,author,post_time,source,label,endpoint,latency_ms,text"
                )?;

                for record in &records {
                    writeln!(
                        file,
                        "{},{},{},{},{},{},{},{},{},{}",
                        record.id,
                        record.recorded_at.to_rfc3339(),
                        csv_field(record.url.as_deref().unwrap_or("")),
                        csv_field(record.author.as_deref().unwrap_or("")),
                        csv_field(record.post_time.as_deref().unwrap_or("")),
                        csv_field(record.source.as_deref().unwrap_or("")),
                        csv_field(&record.label),
                        csv_field(&record.endpoint),
                        record.latency_ms,
                        csv_field(&record.text)
                    )?;
                }
            }
        }

        Ok(count)
    }

    /// All report files, oldest first, current file last
    fn report_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.config.report_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "jsonl") {
                files.push(path);
            }
        }
        // Lexicographic order puts reports_<timestamp> before reports_current.
        files.sort();
        Ok(files)
    }

    fn matches_query(&self, record: &ReportRecord, query: &ReportQuery) -> bool {
        if let Some(ref label) = query.label {
            if &record.label != label {
                return false;
            }
        }

        if let Some(ref source) = query.source {
            if record.source.as_ref() != Some(source) {
                return false;
            }
        }

        if let Some(ref endpoint) = query.endpoint {
            if &record.endpoint != endpoint {
                return false;
            }
        }

        if let Some(since) = query.since {
            if record.recorded_at < since {
                return false;
            }
        }

        if let Some(until) = query.until {
            if record.recorded_at > until {
                return false;
            }
        }

        true
    }
}

/// Export format options
#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    /// JSON Lines format (one JSON object per line)
    JsonLines,
    /// Pretty-printed JSON array
    Json,
    /// CSV format
    Csv,
}

/// Quote a CSV field when it carries separators, quotes, or newlines
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
