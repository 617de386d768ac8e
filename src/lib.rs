//! solpay-tracker - incoming SOL payment indexer
//!
//! Discovers and records payments sent to a single tracked wallet,
//! turning the RPC node's signature feed into a locally queryable,
//! deduplicated record of transfers.

pub mod config;
pub mod errors;
pub mod feed;
pub mod filter;
pub mod handlers;
pub mod retry;
pub mod storage;
pub mod tracker;
pub mod types;

pub use errors::{Result, TrackerError};
