//! JSON-RPC capability for talking to sentinel nodes.
//!
//! The probers only ever need three node methods, so the surface is a narrow
//! trait rather than a general client. The [`NodeRpc`] trait is the injection
//! seam: production code uses [`RpcClient`] over a shared reqwest transport,
//! tests supply fakes through a [`NodeRpcFactory`].

pub mod client;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use client::RpcClient;
pub use types::{ValidatorHistoryItem, ValidatorStats, ValidatorsStatsResponse};

/// Errors from a sentinel node RPC exchange.
///
/// The probers treat every variant identically (probe failed); the variants
/// exist so logs can say what actually happened.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Network-level failure from the underlying HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with a non-200 HTTP status.
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),

    /// The node returned a JSON-RPC error object.
    #[error("rpc error: {message} (code {code})")]
    Rpc { code: i64, message: String },

    /// The result payload did not decode into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

/// The three node operations the probers rely on.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// `node_isReady` — whether the node considers itself serviceable.
    async fn is_ready(&self) -> Result<bool, RpcError>;

    /// `node_getBlockNumber` — latest block the node has processed.
    async fn get_block_number(&self) -> Result<i64, RpcError>;

    /// `node_getValidatorsStats` — per-validator participation history.
    async fn get_validators_stats(&self) -> Result<ValidatorsStatsResponse, RpcError>;
}

/// Factory producing a [`NodeRpc`] for a backend URL.
///
/// The integrity prober takes one of these so tests can swap in fakes.
pub type NodeRpcFactory = Arc<dyn Fn(&str) -> Arc<dyn NodeRpc> + Send + Sync>;
