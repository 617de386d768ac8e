//! One-shot boundary operations behind the CLI verbs
//!
//! These are thin pass-throughs with no retry or state logic: inspection
//! of the signature feed and a single outbound test payment.

use anyhow::{Context, Result};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::native_token::sol_to_lamports;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use tracing::info;

use crate::feed::LedgerFeed;
use crate::types::SignatureRecord;

/// Which side of the cursor a raw signature page is fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBound {
    /// Strictly older than the cursor
    Before,
    /// Strictly newer than the cursor
    Until,
}

/// Recent confirmed signatures for the tracked wallet
pub async fn confirmed_signatures<F: LedgerFeed>(feed: &F) -> Result<Vec<String>> {
    let page = feed.list_signatures(100, None, None).await?;
    if page.is_empty() {
        info!("no confirmed transactions found");
        return Ok(Vec::new());
    }
    info!(count = page.len(), "found confirmed transactions");
    Ok(page.into_iter().map(|record| record.signature).collect())
}

/// One raw signature page relative to a cursor
pub async fn signatures_page<F: LedgerFeed>(
    feed: &F,
    bound: PageBound,
    signature: &str,
) -> Result<Vec<SignatureRecord>> {
    let page = match bound {
        PageBound::Before => feed.list_signatures(1_000, Some(signature), None).await?,
        PageBound::Until => feed.list_signatures(1_000, None, Some(signature)).await?,
    };
    Ok(page)
}

/// Decode the outbound sender keypair from the environment
pub fn sender_keypair_from_env() -> Result<Keypair> {
    let raw = std::env::var("SOL_PAY_SENDER_PRIV_KEY")
        .context("SOL_PAY_SENDER_PRIV_KEY not found")?;
    let bytes = bs58::decode(raw.trim())
        .into_vec()
        .context("sender key is not valid base58")?;
    Keypair::try_from(bytes.as_slice()).context("sender key is not a valid keypair")
}

/// Build, sign, submit and confirm a single SOL transfer
pub async fn send_payment(
    client: &RpcClient,
    sender: &Keypair,
    receiver: &Pubkey,
    amount_sol: f64,
) -> Result<Signature> {
    let instruction =
        system_instruction::transfer(&sender.pubkey(), receiver, sol_to_lamports(amount_sol));
    let blockhash = client
        .get_latest_blockhash()
        .await
        .context("failed to fetch a recent blockhash")?;
    let tx = Transaction::new_signed_with_payer(
        &[instruction],
        Some(&sender.pubkey()),
        &[sender],
        blockhash,
    );

    info!(amount_sol, receiver = %receiver, "sending payment");
    let signature = client
        .send_and_confirm_transaction(&tx)
        .await
        .context("transaction failed")?;
    info!(signature = %signature, "transaction confirmed");
    Ok(signature)
}
