//! Error types for the payment tracker

use thiserror::Error;

/// Errors produced by the indexing engine and its collaborators
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Tracked wallet address failed validation; fatal at construction
    #[error("invalid wallet address {address:?}: encoded length {length}, expected 44")]
    InvalidAddress { address: String, length: usize },

    /// A cursor or CLI argument is not a parseable signature
    #[error("invalid signature {0:?}")]
    InvalidSignature(String),

    /// Remote feed failure; transient during polling, fatal during backfill
    #[error("rpc error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    /// Local storage failure
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Stored document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backfill paged past the defensive cap without seeing an empty page
    #[error("backfill exceeded {0} pages without exhausting the feed")]
    BackfillCapExceeded(usize),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
