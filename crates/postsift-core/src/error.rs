//! Error types for Postsift

use serde::{Deserialize, Serialize};

/// Result type alias using Postsift's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Postsift operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request rejected before any network I/O
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every configured classifier endpoint failed.
    ///
    /// The display string is intentionally stable: caller surfaces show it
    /// verbatim, while the per-endpoint detail stays in the report for logs.
    #[error("classification unavailable")]
    Exhausted(ExhaustionReport),

    /// Post-content extraction errors
    #[error("extraction error: {0}")]
    Extract(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new invalid-request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new extraction error
    pub fn extract(msg: impl Into<String>) -> Self {
        Self::Extract(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True when every endpoint was tried and none produced a label
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
}

/// One absorbed endpoint failure, recorded during a fallback pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptFailure {
    /// Display name of the endpoint that failed
    pub endpoint: String,

    /// Failure category (`timeout`, `http`, `network`, `decode`, `service`, `contract`)
    pub kind: String,

    /// Human-readable reason, safe for logs but not shown to end users
    pub reason: String,
}

impl AttemptFailure {
    /// Record a failure for one endpoint
    pub fn new(
        endpoint: impl Into<String>,
        kind: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Aggregate of every absorbed failure, produced when the endpoint list
/// is exhausted without a verdict
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExhaustionReport {
    /// Failures in attempt order, one per endpoint tried
    pub failures: Vec<AttemptFailure>,
}

impl ExhaustionReport {
    /// Empty report, used when there were no endpoints to try
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of endpoints that were attempted
    pub fn attempt_count(&self) -> usize {
        self.failures.len()
    }

    /// Append one endpoint's failure
    pub fn record(&mut self, failure: AttemptFailure) {
        self.failures.push(failure);
    }

    /// One-line summary for logs: `render: timeout; railway: http status 500`
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            return "no endpoints configured".to_string();
        }
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.endpoint, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_display_is_stable_and_leak_free() {
        let mut report = ExhaustionReport::empty();
        report.record(AttemptFailure::new(
            "render",
            "network",
            "connect error: dns failure (os error 11001)",
        ));
        let err = Error::Exhausted(report);

        // Caller surfaces print this verbatim; socket detail must not appear.
        assert_eq!(err.to_string(), "classification unavailable");
        assert!(err.is_exhausted());
    }

    #[test]
    fn report_summary_lists_failures_in_order() {
        let mut report = ExhaustionReport::empty();
        report.record(AttemptFailure::new("render", "timeout", "timed out after 30000 ms"));
        report.record(AttemptFailure::new("railway", "http", "http status 500"));

        assert_eq!(report.attempt_count(), 2);
        assert_eq!(
            report.summary(),
            "render: timed out after 30000 ms; railway: http status 500"
        );
    }

    #[test]
    fn empty_report_summary_names_the_cause() {
        assert_eq!(ExhaustionReport::empty().summary(), "no endpoints configured");
    }
}
