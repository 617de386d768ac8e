//! Common types used throughout the tracker

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a transfer's on-chain execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Execution metadata reported no error
    Success,
    /// Execution metadata reported an error
    Failure,
}

/// One stored row per matched transfer instruction.
///
/// A transaction may legally contain several transfers to the tracked
/// wallet; those records share a signature but differ in amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    /// Unique record id, assigned at insert
    pub id: Uuid,

    /// Signature of the transaction this transfer belongs to
    pub signature: String,

    /// First account key (fee payer) of the transaction
    pub sender: String,

    /// Transfer amount in SOL
    pub amount: f64,

    /// Success or Failure, from the execution metadata
    pub status: TransferStatus,

    /// Opaque execution metadata, stored for audit
    pub meta: Option<serde_json::Value>,
}

impl TransferRecord {
    pub fn new(
        signature: impl Into<String>,
        sender: impl Into<String>,
        amount: f64,
        status: TransferStatus,
        meta: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            signature: signature.into(),
            sender: sender.into(),
            amount,
            status,
            meta,
        }
    }
}

/// Singleton cursor row: the newest fully-persisted signature.
///
/// An empty `last_processed_signature` means no history has been
/// processed yet. Created lazily on first access, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorState {
    pub id: Uuid,
    pub last_processed_signature: String,
}

impl CursorState {
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            last_processed_signature: String::new(),
        }
    }
}

/// Signature metadata as returned by the remote feed, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signature: String,

    pub slot: u64,

    /// Unix timestamp of the containing block, when known
    pub block_time: Option<i64>,

    /// Execution error string, if the transaction failed
    pub err: Option<String>,
}
