//! Per-backend state records.
//!
//! A [`Backend`] is created per configured URL at startup and never
//! destroyed; everything in it is mutated through the registry. Snapshots of
//! these records are serialized directly into the `/health` response, so the
//! serde names here are the operator-facing field names.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::VecDeque, time::Duration};

/// Bounded size of the per-backend latency sample window.
///
/// Small on purpose: prober samples dominate and the signal should react
/// within minutes.
pub const LATENCY_WINDOW_SIZE: usize = 100;

/// How a backend is classified by its observed epoch history.
///
/// `Unknown` until the first successful integrity probe; the readiness probe
/// never touches this, so a freshly recovered backend is not routable via
/// `/archiver` or `/pruned` until a full integrity cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Unknown,
    Pruned,
    Archiver,
}

/// Operator-facing label for a backend's integrity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityStatus {
    Unknown,
    Perfect,
    Good,
    Bad,
}

/// Integrity state written by the integrity prober, read by selection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityStats {
    #[serde(rename = "integrityScore")]
    pub score: i32,
    #[serde(rename = "integrityStatus")]
    pub status: IntegrityStatus,
    pub missing_epochs: Vec<i64>,
    pub inconsistent_epochs: Vec<i64>,
    pub priority: f64,
}

impl Default for IntegrityStats {
    fn default() -> Self {
        Self {
            score: 100,
            status: IntegrityStatus::Unknown,
            missing_epochs: Vec::new(),
            inconsistent_epochs: Vec::new(),
            priority: 100.0,
        }
    }
}

/// Epoch-coverage bookkeeping from the last integrity probe.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochStats {
    pub current_epoch: i64,
    pub total_epochs: usize,
    pub oldest_slot: i64,
    pub last_processed_slot: i64,
}

/// Request counters plus the bounded latency window.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    #[serde(serialize_with = "serialize_duration_ms", rename = "avgLatencyMs")]
    pub avg_latency: Duration,
    #[serde(serialize_with = "serialize_duration_ms", rename = "maxLatencyMs")]
    pub max_latency: Duration,
    #[serde(serialize_with = "serialize_duration_ms", rename = "minLatencyMs")]
    pub min_latency: Duration,
    pub total_requests: u64,
    pub total_errors: u64,
    #[serde(skip)]
    pub latency_history: VecDeque<Duration>,
}

#[allow(clippy::cast_possible_truncation)]
fn serialize_duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl RequestStats {
    /// Appends a latency sample, dropping the oldest when the window is
    /// full, and recomputes avg/min/max from the current window.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record_latency(&mut self, latency: Duration) {
        if self.latency_history.len() == LATENCY_WINDOW_SIZE {
            self.latency_history.pop_front();
        }
        self.latency_history.push_back(latency);

        let mut total = Duration::ZERO;
        let mut min = latency;
        let mut max = latency;
        for &sample in &self.latency_history {
            total += sample;
            min = min.min(sample);
            max = max.max(sample);
        }

        self.avg_latency = total / self.latency_history.len() as u32;
        self.min_latency = min;
        self.max_latency = max;
    }
}

/// All live state for one configured backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub url: String,
    pub healthy: bool,
    pub block_number: i64,
    #[serde(rename = "lastCheck")]
    pub last_checked: DateTime<Utc>,
    pub node_type: NodeType,
    #[serde(rename = "integrityStats")]
    pub integrity: IntegrityStats,
    #[serde(rename = "epochStats")]
    pub epochs: EpochStats,
    #[serde(rename = "requestStats")]
    pub requests: RequestStats,
}

impl Backend {
    /// A new backend starts healthy so the proxy can serve during the first
    /// probe cycle.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            healthy: true,
            block_number: 0,
            last_checked: Utc::now(),
            node_type: NodeType::Unknown,
            integrity: IntegrityStats::default(),
            epochs: EpochStats::default(),
            requests: RequestStats::default(),
        }
    }
}
