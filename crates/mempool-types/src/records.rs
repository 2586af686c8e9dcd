//! Persisted records: snapshots, replacement edges and transaction details.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::json::truncate_chars;

/// Maximum characters of an error body kept in `tx_details.error`.
pub const MAX_DETAIL_ERROR_CHARS: usize = 1000;

/// Current time as ISO-8601 UTC with microseconds and `+00:00` offset.
pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Outcome of one fetch: either a payload with its latency, or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotOutcome {
    Success { latency_ms: u64, payload: Value },
    Failure { error: String },
}

/// One observation of one endpoint at one instant (append-only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub observed_at: String,
    pub endpoint: Endpoint,
    pub outcome: SnapshotOutcome,
}

impl Snapshot {
    pub fn success(observed_at: &str, endpoint: Endpoint, latency_ms: u64, payload: Value) -> Self {
        Self {
            observed_at: observed_at.to_string(),
            endpoint,
            outcome: SnapshotOutcome::Success {
                latency_ms,
                payload,
            },
        }
    }

    pub fn failure(observed_at: &str, endpoint: Endpoint, error: impl Into<String>) -> Self {
        Self {
            observed_at: observed_at.to_string(),
            endpoint,
            outcome: SnapshotOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SnapshotOutcome::Success { .. })
    }

    pub fn latency_ms(&self) -> Option<u64> {
        match &self.outcome {
            SnapshotOutcome::Success { latency_ms, .. } => Some(*latency_ms),
            SnapshotOutcome::Failure { .. } => None,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            SnapshotOutcome::Success { payload, .. } => Some(payload),
            SnapshotOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            SnapshotOutcome::Success { .. } => None,
            SnapshotOutcome::Failure { error } => Some(error),
        }
    }
}

/// A single fee-bump relationship: `old_txid` was replaced by `new_txid`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplacementEdge {
    pub observed_at: String,
    /// Epoch seconds of the newer transaction.
    pub event_time: Option<i64>,
    pub old_txid: String,
    pub new_txid: String,
    pub old_fee_sat: Option<f64>,
    pub old_feerate: Option<f64>,
    pub old_vsize: Option<f64>,
    pub new_fee_sat: Option<f64>,
    pub new_feerate: Option<f64>,
    pub new_vsize: Option<f64>,
    pub interval_seconds: Option<i64>,
    pub full_rbf: Option<bool>,
    pub mined: Option<bool>,
}

/// Latest fetched detail for one transaction (upserted by `txid`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub txid: String,
    pub fetched_at: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub payload: Option<Value>,
}

impl TransactionDetail {
    /// A successful fetch (recorded with status 200).
    pub fn fetched(txid: &str, fetched_at: &str, payload: Value) -> Self {
        Self {
            txid: txid.to_string(),
            fetched_at: fetched_at.to_string(),
            success: true,
            status_code: Some(200),
            error: None,
            payload: Some(payload),
        }
    }

    /// A failed fetch; `error` is truncated to [`MAX_DETAIL_ERROR_CHARS`].
    pub fn failed(txid: &str, fetched_at: &str, status_code: Option<u16>, error: &str) -> Self {
        Self {
            txid: txid.to_string(),
            fetched_at: fetched_at.to_string(),
            success: false,
            status_code,
            error: Some(truncate_chars(error, MAX_DETAIL_ERROR_CHARS)),
            payload: None,
        }
    }
}
