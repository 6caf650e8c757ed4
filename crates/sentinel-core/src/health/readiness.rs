//! Readiness prober: the fast health check loop.

use std::{sync::Arc, time::Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::{
    config::ProxyConfig,
    rpc::{NodeRpc, RpcClient},
    upstream::LoadBalancer,
};

/// Periodically verifies that each backend is reachable and serving blocks.
///
/// Every tick fans out one task per backend; each task calls `node_isReady`
/// and, if ready, `node_getBlockNumber`. Any failure marks the backend
/// unhealthy with block number 0. The elapsed probe time is recorded as a
/// latency sample either way.
pub struct ReadinessProber {
    cfg: Arc<ProxyConfig>,
    lb: Arc<LoadBalancer>,
    http: reqwest::Client,
}

impl ReadinessProber {
    #[must_use]
    pub fn new(cfg: Arc<ProxyConfig>, lb: Arc<LoadBalancer>) -> Self {
        Self { cfg, lb, http: reqwest::Client::new() }
    }

    /// Spawns the probe loop. The first pass runs immediately; the loop ends
    /// when the shutdown channel fires.
    #[must_use]
    pub fn start_with_shutdown(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let cfg = self.cfg.clone();
        let lb = self.lb.clone();
        let http = self.http.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cfg.health_check_interval());

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        Self::check_all(&cfg, &lb, &http);
                    }
                    _ = shutdown_rx.recv() => {
                        info!("readiness prober shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Fans out one fire-and-forget probe task per backend.
    pub fn check_all(cfg: &Arc<ProxyConfig>, lb: &Arc<LoadBalancer>, http: &reqwest::Client) {
        for backend in lb.backends() {
            let lb = lb.clone();
            let client = RpcClient::new(backend.url.clone(), http.clone(), cfg.request_timeout());
            tokio::spawn(async move {
                Self::check_backend(&lb, &client, &backend.url).await;
            });
        }
    }

    async fn check_backend(lb: &LoadBalancer, client: &RpcClient, url: &str) {
        let start = Instant::now();

        match client.is_ready().await {
            Ok(true) => {}
            Ok(false) => {
                lb.update_health(url, false, 0, start.elapsed());
                return;
            }
            Err(e) => {
                error!(url = %url, error = %e, "readiness probe failed");
                lb.update_health(url, false, 0, start.elapsed());
                return;
            }
        }

        match client.get_block_number().await {
            Ok(block_number) => {
                let elapsed = start.elapsed();
                lb.update_health(url, true, block_number, elapsed);
                debug!(
                    url = %url,
                    block = block_number,
                    latency_ms = elapsed.as_millis() as u64,
                    "readiness probe passed"
                );
            }
            Err(e) => {
                error!(url = %url, error = %e, "block number probe failed");
                lb.update_health(url, false, 0, start.elapsed());
            }
        }
    }
}
