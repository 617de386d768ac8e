//! Remote signature feed over Solana JSON-RPC
//!
//! The paginator fetches pages of signature metadata for the tracked
//! wallet, newest first, bounded by an optional cursor. It performs no
//! filtering; exhaustion is signalled by an empty page.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_request::RpcRequest;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransactionWithStatusMeta,
};

use crate::errors::{Result, TrackerError};
use crate::types::SignatureRecord;

/// Read-only boundary to the ledger's transaction feed.
///
/// Both calls mirror the RPC node's semantics: `before` bounds a page to
/// strictly older signatures, `until` to strictly newer ones, and a
/// missing transaction body is data (None), not an error.
#[async_trait]
pub trait LedgerFeed: Send + Sync {
    /// One page of signature metadata for the tracked wallet, newest first
    async fn list_signatures(
        &self,
        limit: usize,
        before: Option<&str>,
        until: Option<&str>,
    ) -> Result<Vec<SignatureRecord>>;

    /// Parsed transaction bodies for `signatures`, as a parallel list.
    /// Entries are None for not-yet-available or pruned transactions.
    async fn fetch_parsed_batch(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<EncodedTransactionWithStatusMeta>>>;
}

/// Production feed backed by a nonblocking RPC client
pub struct RpcFeed {
    client: Arc<RpcClient>,
    account: Pubkey,
}

impl RpcFeed {
    pub fn new(url: &str, timeout_secs: u64, account: Pubkey) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            url.to_string(),
            Duration::from_secs(timeout_secs),
            CommitmentConfig::confirmed(),
        );
        Self {
            client: Arc::new(client),
            account,
        }
    }

    /// The underlying RPC client, for one-shot boundary calls
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    pub fn account(&self) -> &Pubkey {
        &self.account
    }
}

fn parse_signature(raw: &str) -> Result<Signature> {
    Signature::from_str(raw).map_err(|_| TrackerError::InvalidSignature(raw.to_string()))
}

#[async_trait]
impl LedgerFeed for RpcFeed {
    async fn list_signatures(
        &self,
        limit: usize,
        before: Option<&str>,
        until: Option<&str>,
    ) -> Result<Vec<SignatureRecord>> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before: before.map(parse_signature).transpose()?,
            until: until.map(parse_signature).transpose()?,
            limit: Some(limit),
            commitment: Some(CommitmentConfig::confirmed()),
        };
        let statuses = self
            .client
            .get_signatures_for_address_with_config(&self.account, config)
            .await?;
        Ok(statuses
            .into_iter()
            .map(|status| SignatureRecord {
                signature: status.signature,
                slot: status.slot,
                block_time: status.block_time,
                err: status.err.map(|err| err.to_string()),
            })
            .collect())
    }

    async fn fetch_parsed_batch(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<EncodedTransactionWithStatusMeta>>> {
        let mut bodies = Vec::with_capacity(signatures.len());
        for signature in signatures {
            // Raw request so a null result decodes to None instead of a
            // client-side deserialization error.
            let response: Option<EncodedConfirmedTransactionWithStatusMeta> = self
                .client
                .send(
                    RpcRequest::GetTransaction,
                    json!([signature, {
                        "encoding": "jsonParsed",
                        "commitment": "confirmed",
                        "maxSupportedTransactionVersion": 0,
                    }]),
                )
                .await?;
            bodies.push(response.map(|confirmed| confirmed.transaction));
        }
        Ok(bodies)
    }
}
