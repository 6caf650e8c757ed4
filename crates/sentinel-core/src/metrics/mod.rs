//! Prometheus metrics for the proxy.
//!
//! Five metric families, all labeled so operators can slice per backend:
//!
//! - `sentinel_proxy_requests_total{method,status,backend}` — counter
//! - `sentinel_proxy_request_duration_seconds{method,backend}` — histogram
//! - `sentinel_proxy_backend_health{url}` — gauge (0/1)
//! - `sentinel_proxy_backend_integrity_score{url}` — gauge (0–100)
//! - `sentinel_proxy_backend_block_number{url}` — gauge
//!
//! The recorder is installed once per process. Tests construct many
//! collectors in one process, so a second initialization falls back to a
//! detached recorder instead of failing.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Classic Prometheus default histogram buckets, in seconds.
const DURATION_BUCKETS: &[f64] =
    &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

const REQUEST_DURATION_METRIC: &str = "sentinel_proxy_request_duration_seconds";

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new()
                .set_buckets_for_metric(
                    Matcher::Full(REQUEST_DURATION_METRIC.to_string()),
                    DURATION_BUCKETS,
                )
                .unwrap_or_else(|_| PrometheusBuilder::new());

            match builder.install_recorder() {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "prometheus recorder already installed, using detached recorder"
                    );
                    PrometheusBuilder::new().build_recorder().handle()
                }
            }
        })
        .clone()
}

/// Owns the Prometheus handle and exposes typed record/set helpers.
///
/// All recording goes through the lock-free `metrics` facade; the collector
/// itself is only needed to render the exposition text.
pub struct MetricsCollector {
    prometheus_handle: PrometheusHandle,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self { prometheus_handle: init_prometheus_recorder() }
    }

    /// Increments the request counter for one proxied exchange.
    pub fn record_request(&self, method: &str, status: &str, backend: &str) {
        counter!(
            "sentinel_proxy_requests_total",
            "method" => method.to_string(),
            "status" => status.to_string(),
            "backend" => backend.to_string()
        )
        .increment(1);
    }

    /// Observes the wall-clock duration of one proxied exchange.
    pub fn observe_request_duration(&self, method: &str, backend: &str, seconds: f64) {
        histogram!(
            REQUEST_DURATION_METRIC,
            "method" => method.to_string(),
            "backend" => backend.to_string()
        )
        .record(seconds);
    }

    /// Publishes a backend's health as a 0/1 gauge.
    pub fn set_backend_health(&self, url: &str, healthy: bool) {
        let value = if healthy { 1.0 } else { 0.0 };
        gauge!("sentinel_proxy_backend_health", "url" => url.to_string()).set(value);
    }

    /// Publishes a backend's integrity score.
    pub fn set_backend_integrity(&self, url: &str, score: i32) {
        gauge!("sentinel_proxy_backend_integrity_score", "url" => url.to_string())
            .set(f64::from(score));
    }

    /// Publishes a backend's latest observed block number.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_backend_block_number(&self, url: &str, block_number: i64) {
        gauge!("sentinel_proxy_backend_block_number", "url" => url.to_string())
            .set(block_number as f64);
    }

    /// Renders the Prometheus exposition text for `GET /metrics`.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }
}
