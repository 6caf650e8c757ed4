//! Integration and end-to-end tests for the sentinel-proxy workspace.
//!
//! Test modules:
//!
//! - `forwarder_tests`: full router tests — request forwarding, specialized
//!   routing with path rewrite, 503/502 handling, outcome accounting.
//! - `readiness_tests`: readiness prober against mock sentinel nodes.
//! - `rpc_client_tests`: JSON-RPC client decode behavior and error surface.
//! - `mock_infrastructure`: reusable mockito wrappers simulating sentinel
//!   nodes, plus shared test helpers.
//!
//! Everything runs in-process: backends are mockito servers and the router
//! is driven with `tower::ServiceExt::oneshot`, so no test needs a running
//! proxy or a live network.

#[cfg(test)]
mod forwarder_tests;


#[cfg(test)]
mod rpc_client_tests;

/// Mock infrastructure for testing.
pub mod mock_infrastructure;
