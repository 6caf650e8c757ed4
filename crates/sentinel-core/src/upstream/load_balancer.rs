//! The backend registry: single point of mutation and selection.
//!
//! One reader/writer lock protects the whole registry. Selection takes the
//! write lock: the shared PRNG lives inside the locked state, and computing
//! the minimum priority must be atomic with the subsequent draw. Status
//! endpoints copy snapshots under the read lock.

use parking_lot::RwLock;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{sync::Arc, time::Duration};

use crate::{
    config::ProxyConfig,
    metrics::MetricsCollector,
    upstream::backend::{Backend, NodeType},
};

/// Flat weight added to every candidate so even the worst healthy backend
/// keeps a non-negligible share of traffic.
const SELECTION_BASE_WEIGHT: f64 = 10.0;

struct Inner {
    backends: Vec<Backend>,
    rng: SmallRng,
}

/// Authoritative store of backend state with priority-weighted selection.
pub struct LoadBalancer {
    inner: RwLock<Inner>,
    metrics: Arc<MetricsCollector>,
}

impl LoadBalancer {
    /// Builds one [`Backend`] per configured URL, all initially healthy.
    #[must_use]
    pub fn new(cfg: &ProxyConfig, metrics: Arc<MetricsCollector>) -> Self {
        let backends = cfg.backend_urls().into_iter().map(Backend::new).collect();
        Self {
            inner: RwLock::new(Inner { backends, rng: SmallRng::from_entropy() }),
            metrics,
        }
    }

    /// Read-consistent snapshot of all backends.
    ///
    /// Callers receive copies; mutation only happens through the registry.
    #[must_use]
    pub fn backends(&self) -> Vec<Backend> {
        self.inner.read().backends.clone()
    }

    /// Applies `mutate` to the backend with the given URL, then recomputes
    /// its priority and republishes its gauges. No-op for unknown URLs.
    pub fn update<F: FnOnce(&mut Backend)>(&self, url: &str, mutate: F) {
        let mut inner = self.inner.write();
        if let Some(backend) = inner.backends.iter_mut().find(|b| b.url == url) {
            mutate(backend);
            compute_priority(backend);
            self.publish_gauges(backend);
        }
    }

    /// Records the outcome of a readiness probe.
    ///
    /// The elapsed probe time is fed into the latency window even on
    /// failure, so a slow-then-dead backend keeps a truthful average.
    pub fn update_health(&self, url: &str, healthy: bool, block_number: i64, latency: Duration) {
        self.update(url, |b| {
            b.healthy = healthy;
            b.block_number = block_number;
            b.last_checked = chrono::Utc::now();
            b.requests.record_latency(latency);

            if !healthy {
                tracing::warn!(url = %b.url, "backend marked unhealthy");
            }
        });
    }

    /// Records the outcome of an integrity probe.
    pub fn update_integrity(&self, url: &str, score: i32, missing: Vec<i64>, inconsistent: Vec<i64>) {
        self.update(url, |b| {
            b.integrity.score = score;
            b.integrity.missing_epochs = missing;
            b.integrity.inconsistent_epochs = inconsistent;
        });
    }

    /// Counts a completed proxied exchange (any upstream status).
    pub fn record_success(&self, url: &str, status: u16, latency: Duration) {
        let mut inner = self.inner.write();
        if let Some(backend) = inner.backends.iter_mut().find(|b| b.url == url) {
            backend.requests.total_requests += 1;
            backend.requests.record_latency(latency);
        }
        drop(inner);
        self.metrics.record_request("proxy", &status.to_string(), url);
    }

    /// Counts a proxied exchange that failed at the transport level.
    pub fn record_error(&self, url: &str) {
        let mut inner = self.inner.write();
        if let Some(backend) = inner.backends.iter_mut().find(|b| b.url == url) {
            backend.requests.total_requests += 1;
            backend.requests.total_errors += 1;
        }
        drop(inner);
        self.metrics.record_request("proxy", "502", url);
    }

    /// Picks a healthy backend, weighted by priority.
    #[must_use]
    pub fn select_any(&self) -> Option<Backend> {
        self.select_where(|b| b.healthy)
    }

    /// Picks a healthy archiver backend, weighted by priority.
    #[must_use]
    pub fn select_archiver(&self) -> Option<Backend> {
        self.select_where(|b| b.healthy && b.node_type == NodeType::Archiver)
    }

    /// Picks a healthy pruned backend, weighted by priority.
    #[must_use]
    pub fn select_pruned(&self) -> Option<Backend> {
        self.select_where(|b| b.healthy && b.node_type == NodeType::Pruned)
    }

    fn select_where(&self, filter: impl Fn(&Backend) -> bool) -> Option<Backend> {
        let mut inner = self.inner.write();
        let Inner { backends, rng } = &mut *inner;

        let candidates: Vec<usize> = backends
            .iter()
            .enumerate()
            .filter(|&(_, b)| filter(b))
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            return None;
        }

        Some(select_weighted(backends, rng, &candidates).clone())
    }

    fn publish_gauges(&self, backend: &Backend) {
        self.metrics.set_backend_health(&backend.url, backend.healthy);
        self.metrics.set_backend_block_number(&backend.url, backend.block_number);
        self.metrics.set_backend_integrity(&backend.url, backend.integrity.score);
    }
}

/// Weighted draw over the candidate indices. Ties break by input order.
fn select_weighted<'a>(
    backends: &'a [Backend],
    rng: &mut SmallRng,
    candidates: &[usize],
) -> &'a Backend {
    if candidates.len() == 1 {
        return &backends[candidates[0]];
    }

    let min_priority = candidates
        .iter()
        .map(|&i| backends[i].integrity.priority)
        .fold(f64::INFINITY, f64::min);

    let weights: Vec<f64> = candidates
        .iter()
        .map(|&i| (backends[i].integrity.priority - min_priority + SELECTION_BASE_WEIGHT).max(1.0))
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let r = rng.gen::<f64>() * total_weight;

    let mut cumulative = 0.0;
    for (&index, &weight) in candidates.iter().zip(&weights) {
        cumulative += weight;
        if r < cumulative {
            return &backends[index];
        }
    }

    &backends[candidates[0]]
}

/// Derives a backend's selection priority from its current state.
///
/// No lower clamp here; the draw's `max(1, …)` handles negatives.
#[allow(clippy::cast_precision_loss)]
fn compute_priority(backend: &mut Backend) {
    let mut priority = 100.0;

    priority -= backend.integrity.missing_epochs.len() as f64 * 10.0;
    priority -= backend.integrity.inconsistent_epochs.len() as f64 * 5.0;

    let avg_ms = backend.requests.avg_latency.as_millis();
    if avg_ms > 0 {
        if avg_ms < 100 {
            priority += 10.0;
        } else if avg_ms < 500 {
            priority += 5.0;
        }
    }

    if backend.healthy {
        priority += 20.0;
    }

    backend.integrity.priority = priority;
}
