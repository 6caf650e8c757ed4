//! JSON-RPC client behavior against a mock node.

use crate::mock_infrastructure::SentinelMockBuilder;
use sentinel_core::rpc::{NodeRpc, RpcClient, RpcError};
use serde_json::json;
use std::time::Duration;

fn client_for(url: String) -> RpcClient {
    RpcClient::new(url, reqwest::Client::new(), Duration::from_secs(2))
}

#[tokio::test]
async fn test_is_ready_decodes_boolean() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_is_ready(true);

    let client = client_for(node.url());
    assert!(client.is_ready().await.unwrap());
}

#[tokio::test]
async fn test_block_number_decodes_integer() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_block_number(12_345);

    let client = client_for(node.url());
    assert_eq!(client.get_block_number().await.unwrap(), 12_345);
}

#[tokio::test]
async fn test_block_number_falls_back_to_decimal_string() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_block_number_string(678);

    let client = client_for(node.url());
    assert_eq!(client.get_block_number().await.unwrap(), 678);
}

#[tokio::test]
async fn test_rpc_error_object_surfaces_as_error() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_rpc_error("node_getBlockNumber", -32601, "method not found");

    let client = client_for(node.url());
    match client.get_block_number().await {
        Err(RpcError::Rpc { code, message }) => {
            assert_eq!(code, -32601);
            assert_eq!(message, "method not found");
        }
        other => panic!("expected RpcError::Rpc, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_200_status_surfaces_as_error() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_http_status(503);

    let client = client_for(node.url());
    match client.is_ready().await {
        Err(RpcError::HttpStatus(503)) => {}
        other => panic!("expected RpcError::HttpStatus(503), got {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_failure_surfaces_as_error() {
    let client = client_for("http://127.0.0.1:9".to_string());
    assert!(matches!(client.is_ready().await, Err(RpcError::Transport(_))));
}

#[tokio::test]
async fn test_validators_stats_decode() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_validators_stats(&json!({
        "lastProcessedSlot": "3300",
        "stats": {
            "0xabc": {
                "history": [
                    { "slot": "3200", "status": "block-mined" },
                    { "slot": "3201", "status": "attestation-sent" }
                ]
            }
        }
    }));

    let client = client_for(node.url());
    let stats = client.get_validators_stats().await.unwrap();

    assert_eq!(stats.last_processed_slot, "3300");
    let validator = &stats.stats["0xabc"];
    assert_eq!(validator.history.len(), 2);
    assert_eq!(validator.history[0].slot, "3200");
    assert_eq!(validator.history[0].status, "block-mined");
}

#[tokio::test]
async fn test_malformed_stats_payload_is_a_decode_error() {
    let mut node = SentinelMockBuilder::new().await;
    node.mock_validators_stats(&json!({ "lastProcessedSlot": 17 }));

    let client = client_for(node.url());
    assert!(matches!(client.get_validators_stats().await, Err(RpcError::Decode(_))));
}
