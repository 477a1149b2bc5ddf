//! Shared application state

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use postsift_client::{ClassifierClient, Classify};
use postsift_extract::{FailureQueue, MirrorExtractor};
use postsift_telemetry::{AccountStore, ReportReader, ReportWriter, StatsCollector};
use tracing::info;

use crate::config::AgentConfig;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AgentConfig>,

    /// Sequential-fallback classification client
    pub classifier: Arc<dyn Classify>,

    /// Mirror-fallback post extractor
    pub extractor: Arc<MirrorExtractor>,

    /// Report log writer
    pub report_writer: Arc<Mutex<ReportWriter>>,

    /// Report log reader
    pub reports: Arc<ReportReader>,

    /// Flagged account store
    pub accounts: Arc<AccountStore>,

    /// Queue of posts that failed terminally
    pub queue: Arc<FailureQueue>,

    /// In-process counters backing /stats
    pub stats: StatsCollector,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Initialize application state from configuration
    pub fn new(config: AgentConfig, metrics_handle: PrometheusHandle) -> Result<Self> {
        let classifier = ClassifierClient::new(config.classifier.clone())
            .context("failed to build classifier client")?;
        info!(
            "Classifier client ready with {} endpoints",
            classifier.endpoints().len()
        );

        let extractor = MirrorExtractor::new(config.extract.clone())
            .context("failed to build mirror extractor")?;

        let report_writer =
            ReportWriter::new(config.report.clone()).context("failed to open report log")?;
        let reports = ReportReader::new(config.report.clone());

        let accounts =
            AccountStore::open(&config.accounts_path).context("failed to open account store")?;
        let queue = FailureQueue::new(config.queue_path.clone());

        Ok(Self {
            config: Arc::new(config),
            classifier: Arc::new(classifier),
            extractor: Arc::new(extractor),
            report_writer: Arc::new(Mutex::new(report_writer)),
            reports: Arc::new(reports),
            accounts: Arc::new(accounts),
            queue: Arc::new(queue),
            stats: StatsCollector::new(),
            metrics_handle,
        })
    }
}
