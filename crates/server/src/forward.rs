//! Reverse-proxy path: one inbound request, one selected backend, verbatim
//! relay.
//!
//! No retries, no failover, no body inspection. An upstream error status is
//! a completed exchange from the proxy's point of view; only a transport
//! failure between proxy and backend counts against the backend's error
//! counter.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::{sync::Arc, time::Instant};
use tracing::error;

use crate::router::AppState;
use sentinel_core::Backend;

/// Which selection pool an endpoint draws from.
#[derive(Debug, Clone, Copy)]
enum RouteKind {
    Any,
    Archiver,
    Pruned,
}

impl RouteKind {
    fn select(self, state: &AppState) -> Option<Backend> {
        match self {
            Self::Any => state.lb.select_any(),
            Self::Archiver => state.lb.select_archiver(),
            Self::Pruned => state.lb.select_pruned(),
        }
    }

    fn no_backend_body(self) -> &'static str {
        match self {
            Self::Any => "No healthy backends available",
            Self::Archiver => "No healthy archiver backends available",
            Self::Pruned => "No healthy pruned backends available",
        }
    }
}

/// `POST /` — forward to any healthy backend.
pub async fn forward_any(State(state): State<Arc<AppState>>, request: Request) -> Response {
    forward(&state, RouteKind::Any, request).await
}

/// `POST /archiver` — forward to a healthy archiver; the backend sees `/`.
pub async fn forward_archiver(State(state): State<Arc<AppState>>, request: Request) -> Response {
    forward(&state, RouteKind::Archiver, request).await
}

/// `POST /pruned` — forward to a healthy pruned node; the backend sees `/`.
pub async fn forward_pruned(State(state): State<Arc<AppState>>, request: Request) -> Response {
    forward(&state, RouteKind::Pruned, request).await
}

async fn forward(state: &AppState, kind: RouteKind, request: Request) -> Response {
    let Some(backend) = kind.select(state) else {
        state.metrics.record_request("proxy", "503", "none");
        return (StatusCode::SERVICE_UNAVAILABLE, kind.no_backend_body()).into_response();
    };

    let start = Instant::now();

    // Path is always rewritten to `/`; the query string survives.
    let mut target = backend.url.trim_end_matches('/').to_string();
    target.push('/');
    if let Some(query) = request.uri().query() {
        target.push('?');
        target.push_str(query);
    }

    let (parts, body) = request.into_parts();
    let Ok(body_bytes) = axum::body::to_bytes(body, usize::MAX).await else {
        return (StatusCode::BAD_REQUEST, "Invalid request body").into_response();
    };

    let mut outbound = state
        .http
        .post(&target)
        .body(body_bytes)
        .timeout(state.cfg.request_timeout());
    for (name, value) in &parts.headers {
        // reqwest derives Host and Content-Length from the target URL and
        // body, which is exactly the rewrite the backend expects.
        if *name == header::HOST || *name == header::CONTENT_LENGTH || is_hop_by_hop(name) {
            continue;
        }
        outbound = outbound.header(name, value);
    }

    let upstream_response = match outbound.send().await {
        Ok(response) => response,
        Err(e) => return bad_gateway(state, &backend.url, &e),
    };

    let status = upstream_response.status();
    let response_headers = upstream_response.headers().clone();
    let response_body = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return bad_gateway(state, &backend.url, &e),
    };

    let elapsed = start.elapsed();
    state
        .metrics
        .observe_request_duration("proxy", &backend.url, elapsed.as_secs_f64());
    state.lb.record_success(&backend.url, status.as_u16(), elapsed);

    relay(status, &response_headers, response_body)
}

fn bad_gateway(state: &AppState, backend_url: &str, err: &reqwest::Error) -> Response {
    state.lb.record_error(backend_url);
    error!(target = %backend_url, error = %err, "proxy transport failure");
    (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
}

/// Rebuilds the upstream response for the client, dropping hop-by-hop
/// headers.
fn relay(status: StatusCode, headers: &HeaderMap, body: bytes::Bytes) -> Response {
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            builder = builder.header(name, value);
        }
    }

    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}

/// RFC 7230 §6.1 connection-scoped headers that must not be relayed.
fn is_hop_by_hop(name: &header::HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection" |
            "keep-alive" |
            "proxy-authenticate" |
            "proxy-authorization" |
            "te" |
            "trailer" |
            "transfer-encoding" |
            "upgrade"
    )
}
