//! Single-attempt HTTP transport for classifier endpoints

use std::time::Duration;

use postsift_core::{ClassificationRequest, Error, Result};
use serde::Deserialize;

/// Default hard deadline for one classification attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Failure modes of a single HTTP attempt
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The deadline expired and the in-flight request was aborted
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The endpoint answered with a non-success status; the body is ignored
    #[error("http status {0}")]
    Http(u16),

    /// Connect, DNS, TLS, or mid-body failure
    #[error("network error: {0}")]
    Network(String),

    /// A success status arrived but the body was not valid JSON
    #[error("decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Short category tag used in metrics labels and failure records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Http(_) => "http",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
        }
    }
}

/// Decoded JSON reply from a classifier endpoint.
///
/// Both `label` and `error` are optional so the client can tell a contract
/// violation (neither present) apart from a decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointReply {
    /// Assigned label on success
    #[serde(default)]
    pub label: Option<String>,

    /// Optional explanation accompanying the label
    #[serde(default)]
    pub reason: Option<String>,

    /// Application-level failure reported by the service
    #[serde(default)]
    pub error: Option<String>,
}

/// Issues exactly one POST per call, with a hard deadline covering connect,
/// request write, response headers, and body read. On expiry the request is
/// aborted rather than left running in the background.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    timeout: Duration,
}

impl Transport {
    /// Build a transport with the given per-attempt deadline
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build http client: {e}")))?;
        Ok(Self { http, timeout })
    }

    /// Build a transport with the default 30 s deadline
    pub fn with_default_timeout() -> Result<Self> {
        Self::new(DEFAULT_ATTEMPT_TIMEOUT)
    }

    /// The configured per-attempt deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One bounded POST of `request` to `url`.
    ///
    /// A success status is required before the body is decoded; non-2xx
    /// replies surface as [`TransportError::Http`] without interpretation.
    pub async fn attempt(
        &self,
        url: &str,
        request: &ClassificationRequest,
    ) -> std::result::Result<EndpointReply, TransportError> {
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http(status.as_u16()));
        }

        response
            .json::<EndpointReply>()
            .await
            .map_err(|e| self.map_error(e))
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout.as_millis() as u64)
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(TransportError::Timeout(30_000).kind(), "timeout");
        assert_eq!(TransportError::Http(503).kind(), "http");
        assert_eq!(TransportError::Network("reset".into()).kind(), "network");
        assert_eq!(TransportError::Decode("bad json".into()).kind(), "decode");
    }

    #[test]
    fn reply_decodes_success_error_and_empty_shapes() {
        let reply: EndpointReply = serde_json::from_str(r#"{"label":"Neutral"}"#).unwrap();
        assert_eq!(reply.label.as_deref(), Some("Neutral"));
        assert!(reply.error.is_none());

        let reply: EndpointReply =
            serde_json::from_str(r#"{"label":"Hate","reason":"slur in text"}"#).unwrap();
        assert_eq!(reply.reason.as_deref(), Some("slur in text"));

        let reply: EndpointReply = serde_json::from_str(r#"{"error":"model overloaded"}"#).unwrap();
        assert_eq!(reply.error.as_deref(), Some("model overloaded"));

        let reply: EndpointReply = serde_json::from_str("{}").unwrap();
        assert!(reply.label.is_none() && reply.error.is_none());
    }

    #[test]
    fn timeout_display_names_the_deadline() {
        assert_eq!(
            TransportError::Timeout(30_000).to_string(),
            "timed out after 30000 ms"
        );
    }
}
