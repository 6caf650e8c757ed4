//! Mock infrastructure for testing the proxy without real sentinel nodes.
//!
//! - [`SentinelMockBuilder`]: wraps mockito with responders for the three
//!   node RPC methods and for plain proxy traffic.
//! - [`test_helpers`]: shared configuration builders and polling helpers.

pub mod rpc_mock;
pub mod test_helpers;

pub use rpc_mock::SentinelMockBuilder;
pub use test_helpers::*;
