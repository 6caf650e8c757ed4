//! Mockito wrapper simulating a sentinel node.
//!
//! Provides responders for the three node RPC methods the probers call and
//! for arbitrary proxied traffic. All RPC responders match on the JSON-RPC
//! `method` field, so one mock server can answer a mixed probe sequence.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Builder for a mock sentinel node.
pub struct SentinelMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl SentinelMockBuilder {
    /// Starts a fresh mock server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// URL clients and the registry should use for this node.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    fn mock_rpc_result(&mut self, method: &str, result: Value) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .expect_at_least(0)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Answers `node_isReady` with the given flag.
    pub fn mock_is_ready(&mut self, ready: bool) -> &mut Self {
        self.mock_rpc_result("node_isReady", json!(ready))
    }

    /// Answers `node_getBlockNumber` with a numeric result.
    pub fn mock_block_number(&mut self, block_number: i64) -> &mut Self {
        self.mock_rpc_result("node_getBlockNumber", json!(block_number))
    }

    /// Answers `node_getBlockNumber` with a decimal-string result, the way
    /// some node versions encode it.
    pub fn mock_block_number_string(&mut self, block_number: i64) -> &mut Self {
        self.mock_rpc_result("node_getBlockNumber", json!(block_number.to_string()))
    }

    /// Answers `node_getValidatorsStats` with the given payload.
    pub fn mock_validators_stats(&mut self, stats: &Value) -> &mut Self {
        self.mock_rpc_result("node_getValidatorsStats", stats.clone())
    }

    /// Answers the given method with a JSON-RPC error object.
    pub fn mock_rpc_error(&mut self, method: &str, code: i64, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": { "code": code, "message": message }
                })
                .to_string(),
            )
            .expect_at_least(0)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Answers any `POST /` with the given HTTP status and no JSON envelope.
    pub fn mock_http_status(&mut self, status: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(status)
            .with_body("upstream says no")
            .expect_at_least(0)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Answers any `POST /` with a 200 and the given body.
    ///
    /// Matches only the root path, so a request whose path was not rewritten
    /// to `/` falls through to mockito's 501 and fails the test loudly.
    pub fn mock_proxy_response(&mut self, body: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect_at_least(0)
            .create();

        self.mocks.push(mock);
        self
    }
}
