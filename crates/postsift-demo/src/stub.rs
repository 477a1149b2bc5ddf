//! Stub classifier service
//!
//! Speaks the classifier wire contract: POST /classify with a request body,
//! answer `{label, reason}` or `{error}`. Fault flags reproduce each failure
//! mode a real endpoint shows, for fallback drills against a live client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use postsift_core::ClassificationRequest;
use rand::prelude::*;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::labeler::KeywordLabeler;

/// Fault injection settings
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultConfig {
    /// Probability of an application-level `{error}` body
    pub error_rate: f64,

    /// Probability of a plain HTTP 500
    pub http_error_rate: f64,

    /// Fixed delay before every answer, for timeout drills
    pub delay_ms: u64,
}

/// Shared stub state
pub struct StubState {
    name: String,
    labeler: KeywordLabeler,
    faults: FaultConfig,
    rng: Mutex<StdRng>,
}

impl StubState {
    pub fn new(name: impl Into<String>, faults: FaultConfig) -> Self {
        Self {
            name: name.into(),
            labeler: KeywordLabeler::new(),
            faults,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for tests
    pub fn with_seed(name: impl Into<String>, faults: FaultConfig, seed: u64) -> Self {
        Self {
            name: name.into(),
            labeler: KeywordLabeler::new(),
            faults,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn roll(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }
}

pub fn stub_router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/classify", post(classify))
        .route("/health", get(health))
        .with_state(state)
}

/// Run one stub until the process is stopped
pub async fn run_stub(addr: SocketAddr, name: String, faults: FaultConfig) -> anyhow::Result<()> {
    let state = Arc::new(StubState::new(name.clone(), faults));
    let app = stub_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Stub classifier '{}' listening on http://{}", name, addr);
    info!(
        "Faults: error_rate={}, http_error_rate={}, delay_ms={}",
        faults.error_rate, faults.http_error_rate, faults.delay_ms
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Start a stub on an ephemeral port; returns its /classify URL
pub async fn spawn_stub(name: &str, faults: FaultConfig) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(StubState::new(name, faults));
    let app = stub_router(state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Stub server stopped: {}", e);
        }
    });

    Ok(format!("http://{}/classify", addr))
}

async fn health() -> &'static str {
    "OK"
}

async fn classify(
    State(state): State<Arc<StubState>>,
    Json(request): Json<ClassificationRequest>,
) -> Response {
    if state.faults.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(state.faults.delay_ms)).await;
    }

    if state.roll() < state.faults.http_error_rate {
        debug!("Stub '{}' injecting an http failure", state.name);
        return (StatusCode::INTERNAL_SERVER_ERROR, "stub overload").into_response();
    }

    if state.roll() < state.faults.error_rate {
        debug!("Stub '{}' injecting a service error", state.name);
        return Json(json!({ "error": "stub model unavailable" })).into_response();
    }

    let text = request.text.as_deref().unwrap_or("").trim();
    let url = request.url.as_deref().unwrap_or("").trim();
    if text.is_empty() && url.is_empty() {
        return Json(json!({ "error": "neither text nor url provided" })).into_response();
    }

    let content = if text.is_empty() { url } else { text };
    let (label, reason) = state.labeler.label(content);
    debug!("Stub '{}' answering '{}'", state.name, label);
    Json(json!({ "label": label, "reason": reason })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn state_with(faults: FaultConfig) -> Arc<StubState> {
        Arc::new(StubState::with_seed("test", faults, 7))
    }

    #[tokio::test]
    async fn healthy_stub_labels_text() {
        let state = state_with(FaultConfig::default());
        let request = ClassificationRequest::from_text("parliament votes on the budget");

        let response = classify(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = read_json(response).await;
        assert_eq!(value["label"], "Politically Charged but Not Harmful");
        assert!(value["reason"].as_str().unwrap().contains("matched"));
    }

    #[tokio::test]
    async fn error_rate_one_always_reports_a_service_error() {
        let state = state_with(FaultConfig {
            error_rate: 1.0,
            ..Default::default()
        });
        let request = ClassificationRequest::from_text("anything");

        let response = classify(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "stub model unavailable" })
        );
    }

    #[tokio::test]
    async fn http_error_rate_one_always_answers_500() {
        let state = state_with(FaultConfig {
            http_error_rate: 1.0,
            ..Default::default()
        });
        let request = ClassificationRequest::from_text("anything");

        let response = classify(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn empty_requests_get_an_error_body() {
        let state = state_with(FaultConfig::default());
        let request = ClassificationRequest::from_text("   ");

        let response = classify(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "neither text nor url provided" })
        );
    }

    #[tokio::test]
    async fn url_only_requests_are_still_labeled() {
        let state = state_with(FaultConfig::default());
        let request = ClassificationRequest::from_url("https://x.com/someone/status/42");

        let response = classify(State(state), Json(request)).await;
        let value = read_json(response).await;
        assert_eq!(value["label"], "Neutral");
    }
}
