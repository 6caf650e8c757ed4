//! Shared helpers for integration tests.

use sentinel_core::{LoadBalancer, MetricsCollector, ProxyConfig};
use server::AppState;
use std::{sync::Arc, time::Duration};

/// A [`ProxyConfig`] pointing at the given comma-separated backend list,
/// with short timeouts suitable for tests.
#[must_use]
pub fn test_config(backends: &str) -> ProxyConfig {
    ProxyConfig {
        sentinel_backends: backends.to_string(),
        proxy_port: 8080,
        log_level: "info".to_string(),
        request_timeout_ms: 2_000,
        health_check_interval_ms: 30_000,
        integrity_check_interval_ms: 60_000,
        integrity_check_epochs: 10,
        integrity_score_threshold: 95,
        slots_per_epoch: 32,
        expected_validators: 24,
        archiver_threshold_epochs: 100,
    }
}

/// Builds the full shared state (config, registry, metrics) for router tests.
#[must_use]
pub fn test_state(backends: &str) -> Arc<AppState> {
    let cfg = Arc::new(test_config(backends));
    let metrics = Arc::new(MetricsCollector::new());
    let lb = Arc::new(LoadBalancer::new(&cfg, metrics.clone()));
    Arc::new(AppState::new(cfg, lb, metrics))
}

/// Polls `predicate` until it holds or the timeout elapses.
///
/// The readiness prober fans out fire-and-forget tasks, so tests observe its
/// effects by waiting on the registry rather than joining tasks.
pub async fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    predicate()
}
