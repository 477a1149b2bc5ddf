//! Sequential-fallback classification client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use postsift_core::{
    AttemptFailure, Classification, ClassificationRequest, Endpoint, Error, ExhaustionReport,
    Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::transport::{EndpointReply, Transport, TransportError};

/// Configuration for a [`ClassifierClient`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoints in priority order; element 0 is tried first
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    /// Hard per-attempt deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration from an ordered endpoint list
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints,
            ..Self::default()
        }
    }

    /// Override the per-attempt deadline
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Anything that can resolve a classification request into a verdict.
///
/// The production implementation is [`ClassifierClient`]; tests substitute
/// scripted stand-ins.
#[async_trait]
pub trait Classify: Send + Sync {
    /// Classify one request
    async fn classify(&self, request: &ClassificationRequest) -> Result<Classification>;
}

/// Why one endpoint failed to produce a usable verdict
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Success status with an application-level `error` field
    #[error("service error: {0}")]
    Service(String),

    /// Success status with neither `label` nor `error`
    #[error("malformed reply: neither label nor error present")]
    MissingLabel,
}

impl AttemptError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Transport(t) => t.kind(),
            Self::Service(_) => "service",
            Self::MissingLabel => "contract",
        }
    }
}

/// Strict sequential-fallback client over an ordered endpoint list.
///
/// Endpoints are tried one at a time in configured order, never in parallel.
/// The first well-formed label wins and later endpoints are not contacted.
/// Every per-endpoint failure (timeout, non-2xx, network, decode, reported
/// service error, malformed reply) is absorbed into an exhaustion report;
/// only a full pass without a verdict surfaces an error to the caller.
#[derive(Debug, Clone)]
pub struct ClassifierClient {
    endpoints: Vec<Endpoint>,
    transport: Transport,
}

impl ClassifierClient {
    /// Build a client from configuration, validating endpoint URLs up front
    pub fn new(config: ClientConfig) -> Result<Self> {
        for endpoint in &config.endpoints {
            url::Url::parse(&endpoint.url)
                .map_err(|e| Error::config(format!("invalid endpoint url {}: {e}", endpoint.url)))?;
        }
        let transport = Transport::new(Duration::from_millis(config.timeout_ms))?;
        Ok(Self {
            endpoints: config.endpoints,
            transport,
        })
    }

    /// Endpoints in priority order
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// The per-attempt deadline applied to every endpoint
    pub fn attempt_timeout(&self) -> Duration {
        self.transport.timeout()
    }

    async fn try_endpoint(
        &self,
        endpoint: &Endpoint,
        request: &ClassificationRequest,
    ) -> std::result::Result<(String, Option<String>), AttemptError> {
        let reply = self.transport.attempt(&endpoint.url, request).await?;
        interpret_reply(reply)
    }
}

#[async_trait]
impl Classify for ClassifierClient {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Classification> {
        request.validate()?;
        metrics::counter!("postsift_classify_requests_total").increment(1);

        let mut report = ExhaustionReport::empty();
        for endpoint in &self.endpoints {
            let name = endpoint.display_name();
            debug!("Attempting classifier endpoint {}", name);

            let start = Instant::now();
            match self.try_endpoint(endpoint, request).await {
                Ok((label, reason)) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    info!("Endpoint {} returned label '{}' in {} ms", name, label, latency_ms);
                    metrics::counter!("postsift_attempts_total", "endpoint" => name.clone(), "outcome" => "success")
                        .increment(1);
                    return Ok(Classification {
                        label,
                        reason,
                        endpoint: name,
                        latency_ms,
                    });
                }
                Err(failure) => {
                    warn!("Endpoint {} failed: {}, falling back", name, failure);
                    metrics::counter!("postsift_attempts_total", "endpoint" => name.clone(), "outcome" => failure.kind())
                        .increment(1);
                    report.record(AttemptFailure::new(name, failure.kind(), failure.to_string()));
                }
            }
        }

        error!(
            "All classifier endpoints exhausted after {} attempts: {}",
            report.attempt_count(),
            report.summary()
        );
        metrics::counter!("postsift_exhaustions_total").increment(1);
        Err(Error::Exhausted(report))
    }
}

fn interpret_reply(
    reply: EndpointReply,
) -> std::result::Result<(String, Option<String>), AttemptError> {
    // A reported error takes precedence over any label in the same body.
    if let Some(error) = reply.error {
        return Err(AttemptError::Service(error));
    }
    match reply.label {
        Some(label) if !label.trim().is_empty() => Ok((label, reply.reason)),
        _ => Err(AttemptError::MissingLabel),
    }
}
