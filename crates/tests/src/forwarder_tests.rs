//! End-to-end forwarding tests: router → selection → relay → accounting.

use crate::mock_infrastructure::{test_state, SentinelMockBuilder};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sentinel_core::NodeType;
use server::create_app;
use std::time::Duration;
use tower::ServiceExt;

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(r#"{"jsonrpc":"2.0","method":"node_getBlockNumber","params":[],"id":1}"#))
        .unwrap()
}

#[tokio::test]
async fn test_forward_to_single_healthy_backend() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_proxy_response("backend response");

    let state = test_state(&node.url());
    let app = create_app(state.clone());

    let response = app.oneshot(post("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"backend response");

    let backends = state.lb.backends();
    let stats = &backends[0].requests;
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.total_errors, 0);
}

#[tokio::test]
async fn test_specialized_routing_hits_matching_node_type() {
    let mut archiver = SentinelMockBuilder::new().await;
    archiver.mock_proxy_response("archiver");
    let mut pruned = SentinelMockBuilder::new().await;
    pruned.mock_proxy_response("pruned");

    let state = test_state(&format!("{},{}", archiver.url(), pruned.url()));
    state.lb.update(&archiver.url(), |b| b.node_type = NodeType::Archiver);
    state.lb.update(&pruned.url(), |b| b.node_type = NodeType::Pruned);
    let app = create_app(state);

    // The mocks only answer `POST /`, so a hit also proves the path was
    // rewritten before forwarding.
    let response = app.clone().oneshot(post("/archiver")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"archiver");

    let response = app.oneshot(post("/pruned")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"pruned");
}

#[tokio::test]
async fn test_no_healthy_backend_returns_503_and_counts_it() {
    let state = test_state("http://127.0.0.1:9");
    state.lb.update_health("http://127.0.0.1:9", false, 0, Duration::ZERO);
    let app = create_app(state.clone());

    let response = app.oneshot(post("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_bytes(response.into_body()).await, b"No healthy backends available");

    let exposition = state.metrics.render();
    assert!(exposition.contains("sentinel_proxy_requests_total"));
    assert!(exposition.contains(r#"backend="none""#));
}

#[tokio::test]
async fn test_transport_failure_returns_502_and_records_error() {
    // Nothing listens on port 9 (discard); the connect fails immediately.
    let url = "http://127.0.0.1:9";
    let state = test_state(url);
    let app = create_app(state.clone());

    let response = app.oneshot(post("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_bytes(response.into_body()).await, b"Bad Gateway");

    let backends = state.lb.backends();
    let stats = &backends[0].requests;
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.total_errors, 1);
}

#[tokio::test]
async fn test_upstream_error_status_is_relayed_not_counted_as_error() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_http_status(500);

    let state = test_state(&node.url());
    let app = create_app(state.clone());

    let response = app.oneshot(post("/")).await.unwrap();

    // 5xx from the backend is a completed exchange; the error counter is
    // reserved for connectivity failures between proxy and backend.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(response.into_body()).await, b"upstream says no");

    let backends = state.lb.backends();
    let stats = &backends[0].requests;
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.total_errors, 0);
}

#[tokio::test]
async fn test_forwarding_distributes_over_healthy_backends() {
    let mut node1 = SentinelMockBuilder::new().await;
    node1.mock_proxy_response("one");
    let mut node2 = SentinelMockBuilder::new().await;
    node2.mock_proxy_response("two");

    let state = test_state(&format!("{},{}", node1.url(), node2.url()));
    let app = create_app(state.clone());

    for _ in 0..40 {
        let response = app.clone().oneshot(post("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let backends = state.lb.backends();
    let total: u64 = backends.iter().map(|b| b.requests.total_requests).sum();
    assert_eq!(total, 40);
    // Equal priorities: both backends must have seen traffic.
    assert!(backends.iter().all(|b| b.requests.total_requests > 0));
}
