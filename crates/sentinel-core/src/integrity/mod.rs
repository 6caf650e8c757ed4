//! Pure epoch integrity analysis.
//!
//! [`analyze_epoch`] maps one epoch's slot records to a 0–100 score plus a
//! list of detected issues. It performs no I/O and holds no state, which is
//! what lets the integrity prober fan out one analysis per epoch without any
//! coordination.
//!
//! Scoring starts at 100 and applies cumulative penalties:
//!
//! 1. more unique validators than the committee size: −40
//! 2. block-record count differing from slots-per-epoch: up to −30,
//!    proportional to the gap
//! 3. attestation count differing from the expected
//!    `slots_with_blocks × (validators − 1)`: up to −25
//! 4. absent validators in an epoch with no missed blocks: up to −20
//!
//! The final score is clamped at 0 and rounded to an integer.

use serde::Serialize;

/// One validator participation record inside an epoch.
#[derive(Debug, Clone, Serialize)]
pub struct SlotRecord {
    pub slot: String,
    pub status: String,
    pub validator: String,
}

/// Input to [`analyze_epoch`].
#[derive(Debug)]
pub struct EpochAnalysisInput<'a> {
    pub epoch_number: i64,
    pub records: &'a [SlotRecord],
    pub expected_validators: i64,
    pub slots_per_epoch: i64,
}

/// Health label derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EpochStatus {
    Valid,
    Warning,
    Partial,
    Invalid,
}

impl EpochStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Warning => "WARNING",
            Self::Partial => "PARTIAL",
            Self::Invalid => "INVALID",
        }
    }

    fn from_score(score: i32) -> Self {
        if score == 100 {
            Self::Valid
        } else if score >= 90 {
            Self::Warning
        } else if score >= 50 {
            Self::Partial
        } else {
            Self::Invalid
        }
    }
}

/// Result of analyzing one epoch.
#[derive(Debug, Clone, Serialize)]
pub struct EpochIntegrityReport {
    pub epoch_number: i64,
    pub total_validators: i64,
    pub block_mined: i64,
    pub block_proposed: i64,
    pub block_missed: i64,
    pub attestation_sent: i64,
    pub attestation_missed: i64,
    pub empty_validators: i64,
    pub issues: Vec<String>,
    pub score: i32,
    pub status: EpochStatus,
}

/// Scores one epoch's participation records.
///
/// Deterministic: identical inputs always produce identical reports.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn analyze_epoch(input: &EpochAnalysisInput<'_>) -> EpochIntegrityReport {
    let mut validators = std::collections::HashSet::new();
    for record in input.records {
        if !record.validator.is_empty() {
            validators.insert(record.validator.as_str());
        }
    }
    let total_validators = validators.len() as i64;

    let mut block_mined = 0i64;
    let mut block_proposed = 0i64;
    let mut block_missed = 0i64;
    let mut attestation_sent = 0i64;
    let mut attestation_missed = 0i64;
    for record in input.records {
        match record.status.as_str() {
            "block-mined" => block_mined += 1,
            "block-proposed" => block_proposed += 1,
            "block-missed" => block_missed += 1,
            "attestation-sent" => attestation_sent += 1,
            "attestation-missed" => attestation_missed += 1,
            _ => {}
        }
    }

    let empty_validators = (input.expected_validators - total_validators).max(0);

    let mut issues = Vec::new();
    let mut score = 100.0f64;

    if total_validators > input.expected_validators {
        issues.push("Has too many unique validators".to_string());
        score -= 40.0;
    }

    let total_block_records = block_mined + block_proposed + block_missed;
    if total_block_records != input.slots_per_epoch {
        let diff = (total_block_records - input.slots_per_epoch).abs() as f64;
        issues.push("Block record count mismatch".to_string());
        score -= diff / input.slots_per_epoch as f64 * 30.0;
    }

    let total_attestations = attestation_sent + attestation_missed;
    let slots_with_blocks = block_mined + block_proposed;
    let expected_attestations = slots_with_blocks * (input.expected_validators - 1);
    if total_attestations != expected_attestations && expected_attestations > 0 {
        let diff = (total_attestations - expected_attestations).abs() as f64;
        let max_diff = (input.slots_per_epoch * input.expected_validators) as f64;
        issues.push("Attestation count mismatch".to_string());
        score -= diff / max_diff * 25.0;
    }

    if block_missed == 0 && empty_validators > 0 {
        issues.push("Has empty validators with no block-missed".to_string());
        score -= empty_validators as f64 / input.expected_validators as f64 * 20.0;
    }

    let final_score = score.max(0.0).round() as i32;

    EpochIntegrityReport {
        epoch_number: input.epoch_number,
        total_validators,
        block_mined,
        block_proposed,
        block_missed,
        attestation_sent,
        attestation_missed,
        empty_validators,
        issues,
        score: final_score,
        status: EpochStatus::from_score(final_score),
    }
}
