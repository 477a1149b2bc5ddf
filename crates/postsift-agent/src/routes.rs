//! HTTP routes and handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use postsift_client::Classify;
use postsift_core::{Classification, ClassificationRequest, Error};
use postsift_extract::FailedItem;
use postsift_telemetry::{AccountRecord, ReportQuery, ReportRecord, StatsSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/classify", post(classify))
        .route("/accounts", get(list_accounts).post(record_account))
        .route("/stats", get(stats))
        .route("/reports", get(reports))
        .fallback(fallback)
        // Browser extension surfaces call from their own origins.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// Main classification handler.
///
/// A request carrying only a post URL is resolved through the mirrors first;
/// the verdict is persisted to the report log and, for flagged labels, the
/// posting account is recorded. Exhaustion of every classifier endpoint maps
/// to a stable 503 body.
async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassificationRequest>,
) -> Result<Response, AppError> {
    debug!("Received classify request");
    state.stats.record_request();

    let request = resolve_request(&state, body).await?;

    match state.classifier.classify(&request).await {
        Ok(verdict) => {
            state.stats.record_success(verdict.latency_ms);
            metrics::histogram!("postsift_classify_latency_ms").record(verdict.latency_ms as f64);
            record_success(&state, &request, &verdict);
            Ok(Json(verdict).into_response())
        }
        Err(Error::Exhausted(report)) => {
            state.stats.record_exhaustion(report.attempt_count() as u64);
            if let Some(url) = &request.url {
                queue_failure(&state, url, "classify", report.summary());
            }
            Err(AppError::Unavailable)
        }
        Err(other) => Err(other.into()),
    }
}

/// Trim inbound fields and pull the post body through the mirrors when only a
/// post URL was submitted
async fn resolve_request(
    state: &AppState,
    body: ClassificationRequest,
) -> Result<ClassificationRequest, AppError> {
    let mut request = trim_request(body);

    let post_url = match (&request.text, &request.url) {
        (None, Some(url)) if state.extractor.is_post_url(url) => url.clone(),
        _ => {
            request.validate()?;
            request.source.get_or_insert_with(|| "api".to_string());
            return Ok(request);
        }
    };

    debug!("Request carries only a post URL, extracting {}", post_url);
    match state.extractor.extract(&post_url).await {
        Ok(extracted) => {
            let source = request.source.clone().unwrap_or_else(|| "api".to_string());
            let mut resolved = extracted.into_request(&source);
            // Caller-provided metadata wins over scraped fields.
            if request.author.is_some() {
                resolved.author = request.author;
            }
            if request.post_time.is_some() {
                resolved.post_time = request.post_time;
            }
            Ok(resolved)
        }
        Err(e) => {
            warn!("Extraction failed for {}: {}", post_url, e);
            state.stats.record_extract_failure();
            queue_failure(state, &post_url, "extract", e.to_string());
            Err(AppError::Upstream(e.to_string()))
        }
    }
}

/// Drop surrounding whitespace and treat blank fields as absent
fn trim_request(body: ClassificationRequest) -> ClassificationRequest {
    ClassificationRequest {
        text: clean_field(body.text),
        url: clean_field(body.url),
        author: clean_field(body.author),
        post_time: clean_field(body.post_time),
        source: clean_field(body.source),
    }
}

fn clean_field(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Persist the verdict; persistence trouble is logged, never surfaced
fn record_success(state: &AppState, request: &ClassificationRequest, verdict: &Classification) {
    let record = ReportRecord::new(request, verdict);
    if let Err(e) = state.report_writer.lock().write_record(&record) {
        warn!("Failed to write report record: {}", e);
    } else {
        state.stats.record_report();
    }

    if state.config.flag_labels.iter().any(|l| l == &verdict.label) {
        if let Some(author) = &request.author {
            let account = AccountRecord::new(author.clone(), "", request.url.clone());
            match state.accounts.record(account) {
                Ok(true) => {
                    info!("Account {} flagged after '{}' verdict", author, verdict.label)
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to record flagged account: {}", e),
            }
        }
    }
}

fn queue_failure(state: &AppState, url: &str, stage: &str, reason: String) {
    if let Err(e) = state.queue.append(&FailedItem::new(url, stage, reason)) {
        warn!("Failed to queue {} for retry: {}", url, e);
    }
}

/// Body for account sighting submissions
#[derive(Debug, Deserialize)]
struct AccountSighting {
    username: String,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

async fn record_account(
    State(state): State<AppState>,
    Json(body): Json<AccountSighting>,
) -> Result<Response, AppError> {
    let username = body.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::InvalidRequest(
            "username must be non-empty".to_string(),
        ));
    }

    let record = AccountRecord::new(username, body.platform.as_deref().unwrap_or(""), body.url);
    let recorded = state
        .accounts
        .record(record)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "recorded": recorded })).into_response())
}

async fn list_accounts(State(state): State<AppState>) -> Json<Vec<AccountRecord>> {
    Json(state.accounts.list())
}

#[derive(Debug, Serialize)]
struct LabelCount {
    label: String,
    count: usize,
}

#[derive(Debug, Serialize)]
struct StatsReply {
    #[serde(flatten)]
    counters: StatsSnapshot,
    avg_latency_ms: u64,
    exhaustion_rate: f64,
    labels: Vec<LabelCount>,
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsReply>, AppError> {
    let snapshot = state.stats.snapshot();
    let labels = state
        .reports
        .label_distribution()
        .map_err(|e| AppError::Internal(e.to_string()))?
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();

    Ok(Json(StatsReply {
        avg_latency_ms: snapshot.avg_latency_ms(),
        exhaustion_rate: snapshot.exhaustion_rate(),
        counters: snapshot,
        labels,
    }))
}

/// Query string for GET /reports
#[derive(Debug, Deserialize)]
struct ReportsParams {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn reports(
    State(state): State<AppState>,
    Query(params): Query<ReportsParams>,
) -> Result<Json<Vec<ReportRecord>>, AppError> {
    let mut query = ReportQuery::new().limit(params.limit.unwrap_or(20));
    if let Some(label) = params.label {
        query = query.label(label);
    }
    if let Some(source) = params.source {
        query = query.source(source);
    }

    let records = state
        .reports
        .query(&query)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(records))
}

async fn fallback() -> &'static str {
    "Not found"
}

/// Error handling
#[derive(Debug)]
enum AppError {
    InvalidRequest(String),
    Unavailable,
    Upstream(String),
    Internal(String),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidRequest(msg) => AppError::InvalidRequest(msg),
            Error::Exhausted(_) => AppError::Unavailable,
            Error::Extract(msg) => AppError::Upstream(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            // The body is part of the caller contract; detail stays in logs.
            AppError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "classification unavailable".to_string(),
            ),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use async_trait::async_trait;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use postsift_core::{AttemptFailure, ExhaustionReport, Result as CoreResult};
    use postsift_telemetry::ReportConfig;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MIRROR_PAGE: &str = r#"<html><head>
<meta property="og:description" content="fallback text" />
</head><body>
<a class="fullname" href="/someone">Someone Real</a>
<div class="tweet-content">mirror text here</div>
<span class="tweet-date"><a href="/someone/status/42" title="Jan 1, 2025 10:00 AM UTC">Jan 1</a></span>
</body></html>"#;

    enum ScriptedOutcome {
        Label(&'static str),
        Exhausted,
    }

    struct ScriptedClassifier {
        calls: AtomicU32,
        seen: Mutex<Vec<ClassificationRequest>>,
        outcome: ScriptedOutcome,
    }

    impl ScriptedClassifier {
        fn new(outcome: ScriptedOutcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
                outcome,
            })
        }

        fn last_request(&self) -> ClassificationRequest {
            self.seen
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("classifier was never called")
        }
    }

    #[async_trait]
    impl Classify for ScriptedClassifier {
        async fn classify(&self, request: &ClassificationRequest) -> CoreResult<Classification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            request.validate()?;

            match self.outcome {
                ScriptedOutcome::Label(label) => Ok(Classification {
                    label: label.to_string(),
                    reason: Some("scripted".to_string()),
                    endpoint: "mock".to_string(),
                    latency_ms: 5,
                }),
                ScriptedOutcome::Exhausted => {
                    let mut report = ExhaustionReport::empty();
                    report.record(AttemptFailure::new("mock", "http", "http status 500"));
                    Err(Error::Exhausted(report))
                }
            }
        }
    }

    fn base_config(dir: &Path) -> AgentConfig {
        AgentConfig {
            report: ReportConfig {
                report_dir: dir.join("reports"),
                ..Default::default()
            },
            queue_path: dir.join("failed.jsonl"),
            accounts_path: dir.join("accounts.jsonl"),
            ..Default::default()
        }
    }

    fn scripted_state(
        config: AgentConfig,
        outcome: ScriptedOutcome,
    ) -> (AppState, Arc<ScriptedClassifier>) {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let mut state = AppState::new(config, handle).unwrap();
        let classifier = ScriptedClassifier::new(outcome);
        state.classifier = classifier.clone();
        (state, classifier)
    }

    async fn read_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn classify_success_returns_the_verdict_and_records_it() {
        let dir = TempDir::new().unwrap();
        let (state, classifier) =
            scripted_state(base_config(dir.path()), ScriptedOutcome::Label("Neutral"));

        let body = ClassificationRequest::from_text("  hello world  ").with_author("alice");
        let response = classify(State(state.clone()), Json(body))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let value = read_json(response).await;
        assert_eq!(value["label"], "Neutral");
        assert_eq!(value["endpoint"], "mock");
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);

        // Whitespace trimmed and source defaulted before classification.
        let seen = classifier.last_request();
        assert_eq!(seen.text.as_deref(), Some("hello world"));
        assert_eq!(seen.source.as_deref(), Some("api"));

        // The verdict landed in the report log.
        state.report_writer.lock().flush().unwrap();
        let records = state.reports.query(&ReportQuery::new()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "hello world");
        assert_eq!(records[0].label, "Neutral");

        // A non-flagged label records no account.
        assert_eq!(state.accounts.count(), 0);
    }

    #[tokio::test]
    async fn classify_rejects_blank_requests_without_classifier_io() {
        let dir = TempDir::new().unwrap();
        let (state, classifier) =
            scripted_state(base_config(dir.path()), ScriptedOutcome::Label("Neutral"));

        let body = ClassificationRequest::from_text("   \n ");
        let response = classify(State(state), Json(body)).await.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhaustion_maps_to_a_stable_503_and_queues_the_post() {
        let dir = TempDir::new().unwrap();
        let (state, _) = scripted_state(base_config(dir.path()), ScriptedOutcome::Exhausted);

        let body =
            ClassificationRequest::from_text("hello").with_url("https://x.com/a/status/1");
        let response = classify(State(state.clone()), Json(body))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let value = read_json(response).await;
        assert_eq!(value, json!({ "error": "classification unavailable" }));

        assert_eq!(state.stats.snapshot().exhaustions, 1);
        let queued = state.queue.load().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].stage, "classify");
        assert_eq!(queued[0].url, "https://x.com/a/status/1");
    }

    #[tokio::test]
    async fn url_only_requests_are_extracted_before_classification() {
        let dir = TempDir::new().unwrap();
        let mirror = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/someone/status/42"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MIRROR_PAGE))
            .expect(1)
            .mount(&mirror)
            .await;

        let mut config = base_config(dir.path());
        config.extract.mirrors = vec![mirror.uri()];
        let (state, classifier) = scripted_state(config, ScriptedOutcome::Label("Neutral"));

        let body = ClassificationRequest::from_url("https://x.com/someone/status/42");
        let response = classify(State(state.clone()), Json(body))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = classifier.last_request();
        assert_eq!(seen.text.as_deref(), Some("mirror text here"));
        assert_eq!(seen.author.as_deref(), Some("Someone Real"));
        assert_eq!(seen.url.as_deref(), Some("https://x.com/someone/status/42"));
        assert_eq!(seen.source.as_deref(), Some("api"));
    }

    #[tokio::test]
    async fn extraction_failure_is_a_502_and_queued_for_retry() {
        let dir = TempDir::new().unwrap();
        let mirror = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mirror)
            .await;

        let mut config = base_config(dir.path());
        config.extract.mirrors = vec![mirror.uri()];
        let (state, classifier) = scripted_state(config, ScriptedOutcome::Label("Neutral"));

        let body = ClassificationRequest::from_url("https://x.com/gone/status/7");
        let response = classify(State(state.clone()), Json(body))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.stats.snapshot().extract_failures, 1);

        let queued = state.queue.load().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].stage, "extract");
    }

    #[tokio::test]
    async fn flagged_labels_record_the_posting_account() {
        let dir = TempDir::new().unwrap();
        let (state, _) = scripted_state(
            base_config(dir.path()),
            ScriptedOutcome::Label("Call for Violence"),
        );

        let body = ClassificationRequest::from_text("menacing post")
            .with_author("despot")
            .with_url("https://x.com/despot/status/9");
        let response = classify(State(state.clone()), Json(body))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let accounts = state.accounts.list();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].username, "despot");
        assert_eq!(accounts[0].platform, "X (Twitter)");
    }

    #[tokio::test]
    async fn accounts_round_trip_with_dedup() {
        let dir = TempDir::new().unwrap();
        let (state, _) =
            scripted_state(base_config(dir.path()), ScriptedOutcome::Label("Neutral"));

        let body = AccountSighting {
            username: "alice".to_string(),
            platform: Some("twitter".to_string()),
            url: None,
        };
        let response = record_account(State(state.clone()), Json(body))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "recorded": true }));

        // Same handle, different spelling: acknowledged but not re-recorded.
        let body = AccountSighting {
            username: "ALICE".to_string(),
            platform: Some("x".to_string()),
            url: None,
        };
        let response = record_account(State(state.clone()), Json(body))
            .await
            .into_response();
        assert_eq!(read_json(response).await, json!({ "recorded": false }));

        let Json(listed) = list_accounts(State(state)).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].platform, "X (Twitter)");
    }

    #[tokio::test]
    async fn blank_usernames_are_rejected() {
        let dir = TempDir::new().unwrap();
        let (state, _) =
            scripted_state(base_config(dir.path()), ScriptedOutcome::Label("Neutral"));

        let body = AccountSighting {
            username: "   ".to_string(),
            platform: None,
            url: None,
        };
        let response = record_account(State(state), Json(body))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_carries_counters_and_label_distribution() {
        let dir = TempDir::new().unwrap();
        let (state, _) = scripted_state(
            base_config(dir.path()),
            ScriptedOutcome::Label("Sectarian Incitement"),
        );

        let body = ClassificationRequest::from_text("divisive post").with_author("agitator");
        classify(State(state.clone()), Json(body)).await.unwrap();
        state.report_writer.lock().flush().unwrap();

        let reply = stats(State(state)).await.unwrap();
        let value = serde_json::to_value(&reply.0).unwrap();

        assert_eq!(value["classify_requests"], 1);
        assert_eq!(value["successes"], 1);
        assert_eq!(value["exhaustions"], 0);
        assert_eq!(value["labels"][0]["label"], "Sectarian Incitement");
        assert_eq!(value["labels"][0]["count"], 1);
    }

    #[tokio::test]
    async fn reports_endpoint_filters_by_label() {
        let dir = TempDir::new().unwrap();
        let (state, _) =
            scripted_state(base_config(dir.path()), ScriptedOutcome::Label("Neutral"));

        {
            let mut writer = state.report_writer.lock();
            for label in ["Neutral", "Other", "Neutral"] {
                let request = ClassificationRequest::from_text(format!("post about {label}"));
                let verdict = Classification {
                    label: label.to_string(),
                    reason: None,
                    endpoint: "primary".to_string(),
                    latency_ms: 3,
                };
                writer.write_record(&ReportRecord::new(&request, &verdict)).unwrap();
            }
            writer.flush().unwrap();
        }

        let params = ReportsParams {
            label: Some("Neutral".to_string()),
            source: None,
            limit: None,
        };
        let Json(records) = reports(State(state), Query(params)).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.label == "Neutral"));
    }
}
