//! Route table and status handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tower_http::{
    catch_panic::CatchPanicLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::{forward, middleware};
use sentinel_core::{LoadBalancer, MetricsCollector, ProxyConfig};

/// Extra headroom on the inbound timeout so an upstream timeout surfaces as
/// a 502 from the forwarder rather than a 408 from the middleware.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Shared state handed to every handler.
pub struct AppState {
    pub cfg: Arc<ProxyConfig>,
    pub lb: Arc<LoadBalancer>,
    pub metrics: Arc<MetricsCollector>,
    pub http: reqwest::Client,
    started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(cfg: Arc<ProxyConfig>, lb: Arc<LoadBalancer>, metrics: Arc<MetricsCollector>) -> Self {
        Self { cfg, lb, metrics, http: reqwest::Client::new(), started_at: Instant::now() }
    }

    fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Builds the complete application router.
///
/// Layers, outermost first: request-id set/propagate, access tracing, panic
/// recovery (500 instead of a dropped connection), inbound timeout.
pub fn create_app(state: Arc<AppState>) -> Router {
    let (set_request_id, propagate_request_id) = middleware::request_id_layers();
    let timeout = state.cfg.request_timeout() + REQUEST_TIMEOUT_MARGIN;

    Router::new()
        .route("/", post(forward::forward_any))
        .route("/archiver", post(forward::forward_archiver))
        .route("/pruned", post(forward::forward_pruned))
        .route("/health", get(handle_health))
        .route("/ready", get(handle_ready))
        .route("/metrics", get(handle_metrics))
        .nest_service("/dashboard", ServeDir::new("public"))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            let request_id = request
                .headers()
                .get(&middleware::X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(propagate_request_id)
        .layer(set_request_id)
}

/// `GET /health` — aggregate status plus a full backend snapshot.
#[allow(clippy::cast_precision_loss)]
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backends = state.lb.backends();
    let healthy_count = backends.iter().filter(|b| b.healthy).count();

    let total_requests: u64 = backends.iter().map(|b| b.requests.total_requests).sum();
    let total_errors: u64 = backends.iter().map(|b| b.requests.total_errors).sum();
    let error_rate = if total_requests == 0 {
        0.0
    } else {
        total_errors as f64 / total_requests as f64
    };

    Json(serde_json::json!({
        "status": if healthy_count > 0 { "healthy" } else { "unhealthy" },
        "uptime": state.uptime_seconds(),
        "backends": backends,
        "metrics": {
            "totalRequests": total_requests,
            "totalErrors": total_errors,
            "errorRate": error_rate,
        },
    }))
}

/// `GET /ready` — whether the proxy has any backend configured at all.
pub async fn handle_ready(State(state): State<Arc<AppState>>) -> Response {
    if state.lb.backends().is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "Not Ready").into_response()
    } else {
        "READY".into_response()
    }
}

/// `GET /metrics` — Prometheus exposition.
pub async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
}
