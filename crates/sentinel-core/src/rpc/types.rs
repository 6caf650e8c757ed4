//! Wire types for the `node_getValidatorsStats` response.
//!
//! Sentinel nodes encode slots as decimal strings; parsing to integers
//! happens in the integrity prober, not here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response payload of `node_getValidatorsStats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorsStatsResponse {
    /// Latest slot the node has processed, as a decimal string.
    #[serde(rename = "lastProcessedSlot")]
    pub last_processed_slot: String,

    /// Participation history keyed by validator address.
    pub stats: HashMap<String, ValidatorStats>,
}

/// One validator's slice of the stats response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorStats {
    pub history: Vec<ValidatorHistoryItem>,
}

/// A single participation record: what the validator did at a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorHistoryItem {
    /// Slot number as a decimal string.
    pub slot: String,

    /// Participation status, e.g. `block-mined` or `attestation-sent`.
    pub status: String,
}
