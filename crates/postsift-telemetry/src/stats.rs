//! In-process stats counters backing the stats surfaces

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Stats collector for the agent's classification activity
#[derive(Clone)]
pub struct StatsCollector {
    inner: Arc<StatsInner>,
}

struct StatsInner {
    classify_requests: AtomicU64,
    successes: AtomicU64,
    exhaustions: AtomicU64,
    absorbed_failures: AtomicU64,
    extract_failures: AtomicU64,
    reports_recorded: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl StatsCollector {
    /// Create a new stats collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner {
                classify_requests: AtomicU64::new(0),
                successes: AtomicU64::new(0),
                exhaustions: AtomicU64::new(0),
                absorbed_failures: AtomicU64::new(0),
                extract_failures: AtomicU64::new(0),
                reports_recorded: AtomicU64::new(0),
                total_latency_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Record an inbound classification request
    pub fn record_request(&self) {
        self.inner.classify_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a verdict, with the winning attempt's latency
    pub fn record_success(&self, latency_ms: u64) {
        self.inner.successes.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Record a full pass without a verdict, with the number of endpoints tried
    pub fn record_exhaustion(&self, attempts: u64) {
        self.inner.exhaustions.fetch_add(1, Ordering::Relaxed);
        self.inner
            .absorbed_failures
            .fetch_add(attempts, Ordering::Relaxed);
    }

    /// Record a post whose text could not be extracted
    pub fn record_extract_failure(&self) {
        self.inner.extract_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one report written to the report log
    pub fn record_report(&self) {
        self.inner.reports_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current stats snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            classify_requests: self.inner.classify_requests.load(Ordering::Relaxed),
            successes: self.inner.successes.load(Ordering::Relaxed),
            exhaustions: self.inner.exhaustions.load(Ordering::Relaxed),
            absorbed_failures: self.inner.absorbed_failures.load(Ordering::Relaxed),
            extract_failures: self.inner.extract_failures.load(Ordering::Relaxed),
            reports_recorded: self.inner.reports_recorded.load(Ordering::Relaxed),
            total_latency_ms: self.inner.total_latency_ms.load(Ordering::Relaxed),
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub classify_requests: u64,
    pub successes: u64,
    pub exhaustions: u64,
    pub absorbed_failures: u64,
    pub extract_failures: u64,
    pub reports_recorded: u64,
    pub total_latency_ms: u64,
}

impl StatsSnapshot {
    /// Average winning-attempt latency per successful request
    pub fn avg_latency_ms(&self) -> u64 {
        if self.successes == 0 {
            0
        } else {
            self.total_latency_ms / self.successes
        }
    }

    /// Share of requests that exhausted every endpoint
    pub fn exhaustion_rate(&self) -> f64 {
        if self.classify_requests == 0 {
            0.0
        } else {
            self.exhaustions as f64 / self.classify_requests as f64
        }
    }
}
