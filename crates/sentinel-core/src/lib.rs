//! # Sentinel Core
//!
//! Core library for the Aztec sentinel-proxy, an integrity-verifying reverse
//! proxy in front of a fleet of sentinel RPC nodes.
//!
//! The crate provides:
//!
//! - **[`upstream`]**: the backend registry / load balancer — authoritative
//!   per-backend state (health, block number, node type, integrity, latency
//!   window, request counters) with priority-weighted selection.
//!
//! - **[`health`]**: the two periodic probers. The readiness prober checks
//!   `node_isReady` + `node_getBlockNumber` on a fast interval; the integrity
//!   prober fetches validator statistics on a slow interval and scores each
//!   backend's epoch history.
//!
//! - **[`integrity`]**: the pure epoch analyzer that turns one epoch's slot
//!   records into a 0–100 integrity score.
//!
//! - **[`rpc`]**: the narrow JSON-RPC capability used by the probers,
//!   injectable for tests.
//!
//! - **[`metrics`]**: Prometheus metrics collection.
//!
//! - **[`config`]**: environment-driven configuration.
//!
//! ## Data Flow
//!
//! ```text
//!  readiness prober ──┐
//!                     ├──► LoadBalancer (registry) ◄── forwarder (crates/server)
//!  integrity prober ──┘           │
//!                                 ▼
//!                          Prometheus gauges
//! ```

pub mod config;
pub mod health;
pub mod integrity;
pub mod metrics;
pub mod rpc;
pub mod upstream;

pub use config::ProxyConfig;
pub use metrics::MetricsCollector;
pub use upstream::{Backend, LoadBalancer, NodeType};
