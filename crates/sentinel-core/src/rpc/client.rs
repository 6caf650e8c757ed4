//! Default [`NodeRpc`] implementation over a shared reqwest transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::rpc::{types::ValidatorsStatsResponse, NodeRpc, RpcError};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client for one sentinel node.
///
/// Cheap to construct: the reqwest client is a handle onto a shared
/// connection pool, so probers create one `RpcClient` per backend per pass
/// without leaking connections.
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl RpcClient {
    #[must_use]
    pub fn new(url: impl Into<String>, http: reqwest::Client, timeout: Duration) -> Self {
        Self { url: url.into(), http, timeout }
    }

    /// Performs one JSON-RPC call and returns the raw `result` value.
    ///
    /// Transport failures, non-200 statuses and JSON-RPC `error` objects all
    /// surface as [`RpcError`]; callers never see a partial response.
    async fn call(&self, method: &str) -> Result<Value, RpcError> {
        let body = JsonRpcRequest { jsonrpc: "2.0", method, params: Vec::new(), id: 1 };

        let response = self
            .http
            .post(&self.url)
            .header("content-type", "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(RpcError::HttpStatus(response.status().as_u16()));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("invalid json-rpc envelope: {e}")))?;

        if let Some(err) = rpc_response.error {
            return Err(RpcError::Rpc { code: err.code, message: err.message });
        }

        Ok(rpc_response.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl NodeRpc for RpcClient {
    async fn is_ready(&self) -> Result<bool, RpcError> {
        let result = self.call("node_isReady").await?;
        result
            .as_bool()
            .ok_or_else(|| RpcError::Decode(format!("isReady is not a boolean: {result}")))
    }

    async fn get_block_number(&self) -> Result<i64, RpcError> {
        let result = self.call("node_getBlockNumber").await?;

        if let Some(n) = result.as_i64() {
            return Ok(n);
        }

        // Some node versions return the block number as a decimal string.
        if let Some(s) = result.as_str() {
            return s
                .parse::<i64>()
                .map_err(|e| RpcError::Decode(format!("block number string: {e}")));
        }

        Err(RpcError::Decode(format!("block number is neither int nor string: {result}")))
    }

    async fn get_validators_stats(&self) -> Result<ValidatorsStatsResponse, RpcError> {
        let result = self.call("node_getValidatorsStats").await?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::Decode(format!("validators stats: {e}")))
    }
}
