//! Integrity prober: the slow validator-participation check loop.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::{
    config::ProxyConfig,
    integrity::{analyze_epoch, EpochAnalysisInput, SlotRecord},
    rpc::{NodeRpcFactory, RpcClient, ValidatorsStatsResponse},
    upstream::{IntegrityStatus, LoadBalancer, NodeType},
};

/// Periodically scores every healthy backend's epoch history.
///
/// Each tick fans out one task per healthy backend and awaits all of them
/// before the next tick. A failed stats fetch leaves the backend's last
/// integrity record untouched — stale is better than wrong.
///
/// The RPC client is an injectable factory so tests can supply fakes.
pub struct IntegrityProber {
    cfg: Arc<ProxyConfig>,
    lb: Arc<LoadBalancer>,
    client_factory: NodeRpcFactory,
}

impl IntegrityProber {
    #[must_use]
    pub fn new(cfg: Arc<ProxyConfig>, lb: Arc<LoadBalancer>) -> Self {
        let http = reqwest::Client::new();
        let timeout = cfg.request_timeout();
        let client_factory: NodeRpcFactory = Arc::new(move |url: &str| {
            Arc::new(RpcClient::new(url, http.clone(), timeout)) as Arc<dyn crate::rpc::NodeRpc>
        });

        Self { cfg, lb, client_factory }
    }

    /// Replaces the RPC client factory. Used by tests to inject fakes.
    #[must_use]
    pub fn with_client_factory(mut self, factory: NodeRpcFactory) -> Self {
        self.client_factory = factory;
        self
    }

    /// Spawns the probe loop. The first pass runs immediately; the loop ends
    /// when the shutdown channel fires.
    #[must_use]
    pub fn start_with_shutdown(
        self: Arc<Self>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.cfg.integrity_check_interval());

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.check_all().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("integrity prober shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Runs one integrity pass over all currently healthy backends and
    /// awaits every per-backend task.
    pub async fn check_all(&self) {
        let tasks: Vec<_> = self
            .lb
            .backends()
            .into_iter()
            .filter(|b| b.healthy)
            .map(|b| self.check_backend_integrity(b.url))
            .collect();

        futures::future::join_all(tasks).await;
    }

    async fn check_backend_integrity(&self, url: String) {
        let client = (self.client_factory)(&url);

        let stats = match client.get_validators_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                error!(url = %url, error = %e, "failed to fetch validator stats");
                return;
            }
        };

        let (epoch_records, oldest_slot) = self.process_stats(&stats);
        let total_epochs = epoch_records.len();
        if total_epochs == 0 {
            return;
        }

        // Analyze only the trailing check window.
        let mut epochs: Vec<i64> = epoch_records.keys().copied().collect();
        let check_count = self.cfg.integrity_check_epochs;
        if total_epochs > check_count {
            epochs = epochs.split_off(total_epochs - check_count);
        }

        let min_epoch = epochs[0];
        let max_epoch = epochs[epochs.len() - 1];
        let observed: HashSet<i64> = epochs.iter().copied().collect();

        let mut missing_epochs = Vec::new();
        for epoch in min_epoch..=max_epoch {
            if !observed.contains(&epoch) {
                missing_epochs.push(epoch);
            }
        }

        let last_processed_slot: i64 = stats.last_processed_slot.parse().unwrap_or(0);
        let current_epoch = last_processed_slot / self.cfg.slots_per_epoch;

        let mut inconsistent_epochs = Vec::new();
        let mut total_score = 0i64;
        let mut scored_epochs = 0i64;
        let mut avg_score = 100i32;

        for &epoch in &epochs {
            // The head epoch is still filling; scoring it would punish
            // every backend once per epoch boundary.
            if epoch >= current_epoch {
                continue;
            }

            // When the whole history fits in the window, the oldest epoch is
            // likely truncated at the lower edge as well. This intentionally
            // ends the pass rather than skipping one epoch.
            if total_epochs <= check_count && epoch == min_epoch {
                break;
            }

            let report = analyze_epoch(&EpochAnalysisInput {
                epoch_number: epoch,
                records: &epoch_records[&epoch],
                expected_validators: self.cfg.expected_validators,
                slots_per_epoch: self.cfg.slots_per_epoch,
            });

            if report.score < 100 {
                inconsistent_epochs.push(epoch);
            }

            total_score += i64::from(report.score);
            scored_epochs += 1;
            #[allow(clippy::cast_possible_truncation)]
            {
                avg_score = (total_score / scored_epochs) as i32;
            }
        }

        let missing_count = missing_epochs.len();
        let inconsistent_count = inconsistent_epochs.len();
        let threshold = self.cfg.integrity_score_threshold;
        let archiver_threshold = self.cfg.archiver_threshold_epochs;

        self.lb.update(&url, move |b| {
            b.integrity.score = avg_score;
            b.integrity.missing_epochs = missing_epochs;
            b.integrity.inconsistent_epochs = inconsistent_epochs;
            b.integrity.status = if avg_score == 100 {
                IntegrityStatus::Perfect
            } else if avg_score > threshold {
                IntegrityStatus::Good
            } else {
                IntegrityStatus::Bad
            };

            b.epochs.total_epochs = total_epochs;
            b.epochs.current_epoch = current_epoch;
            b.epochs.last_processed_slot = last_processed_slot;
            b.epochs.oldest_slot = oldest_slot;

            b.node_type = if total_epochs > archiver_threshold {
                NodeType::Archiver
            } else {
                NodeType::Pruned
            };
        });

        info!(
            url = %url,
            score = avg_score,
            missing = missing_count,
            inconsistent = inconsistent_count,
            "integrity check completed"
        );
    }

    /// Groups the raw stats into per-epoch slot records.
    ///
    /// Returns the (sorted) epoch map and the oldest slot seen, seeded from
    /// `lastProcessedSlot`. Unparseable slot strings degrade to 0.
    fn process_stats(
        &self,
        stats: &ValidatorsStatsResponse,
    ) -> (BTreeMap<i64, Vec<SlotRecord>>, i64) {
        let slots_per_epoch = self.cfg.slots_per_epoch;
        let mut oldest_slot: i64 = stats.last_processed_slot.parse().unwrap_or(0);
        let mut epoch_records: BTreeMap<i64, Vec<SlotRecord>> = BTreeMap::new();

        for (address, validator) in &stats.stats {
            for item in &validator.history {
                let slot: i64 = item.slot.parse().unwrap_or(0);
                let epoch = slot / slots_per_epoch;
                oldest_slot = oldest_slot.min(slot);

                epoch_records.entry(epoch).or_default().push(SlotRecord {
                    slot: item.slot.clone(),
                    status: item.status.clone(),
                    validator: address.clone(),
                });
            }
        }

        (epoch_records, oldest_slot)
    }
}
