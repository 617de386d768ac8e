//! The indexing engine: historical backfill, incremental polling,
//! dedup and batch persistence
//!
//! One engine instance tracks one wallet. A single logical control flow
//! runs backfill to completion first, then polls forever; remote and
//! storage calls are the only suspension points, and nothing runs
//! concurrently with a cycle.

use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error, info};

use crate::config::TrackerSettings;
use crate::errors::{Result, TrackerError};
use crate::feed::LedgerFeed;
use crate::filter::extract_transfers;
use crate::retry::RetryPolicy;
use crate::storage::TransferStore;
use crate::types::SignatureRecord;

/// Incoming-payment indexing engine for a single tracked wallet
pub struct PaymentTracker<F: LedgerFeed> {
    feed: F,
    store: TransferStore,
    receiver: Pubkey,
    settings: TrackerSettings,
}

impl<F: LedgerFeed> PaymentTracker<F> {
    /// Construct the engine, refusing to start on an invalid address
    pub fn new(feed: F, store: TransferStore, settings: TrackerSettings) -> Result<Self> {
        let receiver = validate_receiver(&settings.receiver)?;
        info!(wallet = %receiver, "using wallet address");
        Ok(Self {
            feed,
            store,
            receiver,
            settings,
        })
    }

    pub fn receiver(&self) -> &Pubkey {
        &self.receiver
    }

    pub fn store(&self) -> &TransferStore {
        &self.store
    }

    /// Backfill once, then poll forever.
    ///
    /// Backfill failure propagates and is fatal to the run; poll-cycle
    /// failures are logged and absorbed by the retry controller.
    pub async fn run(&self) -> Result<()> {
        info!("starting payment tracker");
        self.sync().await?;
        info!("historical transactions synced");

        let mut retry = RetryPolicy::new(
            self.settings.poll_interval_ms,
            self.settings.max_retries,
            self.settings.backoff_factor,
        );
        loop {
            match self.poll().await {
                Ok(()) => retry.on_success(),
                Err(err) => {
                    error!(error = %err, "error in polling");
                    retry.on_failure();
                }
            }
            tokio::time::sleep(Duration::from_millis(retry.interval_ms())).await;
        }
    }

    /// Historical backfill: page backwards until the feed is exhausted,
    /// then persist everything in one batch.
    pub async fn sync(&self) -> Result<()> {
        let mut all: Vec<SignatureRecord> = Vec::new();
        let mut oldest: Option<String> = None;
        let mut pages = 0usize;
        loop {
            if pages >= self.settings.max_backfill_pages {
                return Err(TrackerError::BackfillCapExceeded(pages));
            }
            let page = self
                .feed
                .list_signatures(self.settings.page_limit, oldest.as_deref(), None)
                .await?;
            if page.is_empty() {
                break;
            }
            pages += 1;
            info!(count = page.len(), "found txns to sync");
            oldest = page.last().map(|record| record.signature.clone());
            all.extend(page);
        }
        info!(total = all.len(), "found total txns to sync");

        // backward pagination yields chronologically mixed pages
        sort_newest_first(&mut all);
        let signatures: Vec<String> = all.iter().map(|record| record.signature.clone()).collect();

        let inserted = self.process_batch(&signatures).await?;
        if inserted < 1 {
            info!("no new txns found");
            return Ok(());
        }

        if let Some(newest) = all.first() {
            let state = self.store.cursor_state()?;
            self.store.update_cursor(&state, &newest.signature)?;
            info!(signature = %newest.signature, "cursor set after backfill");
        }
        Ok(())
    }

    /// One incremental poll cycle: a single page newer than the cursor
    pub async fn poll(&self) -> Result<()> {
        let state = self.store.cursor_state()?;
        info!(cursor = %state.last_processed_signature, "polling txns");

        let until = (!state.last_processed_signature.is_empty())
            .then(|| state.last_processed_signature.as_str());
        let mut page = self
            .feed
            .list_signatures(self.settings.page_limit, None, until)
            .await?;
        if page.is_empty() {
            info!("no new txns found");
            return Ok(());
        }
        info!(count = page.len(), "found new txns");

        sort_newest_first(&mut page);
        let signatures: Vec<String> = page.iter().map(|record| record.signature.clone()).collect();

        let inserted = self.process_batch(&signatures).await?;
        if inserted < 1 {
            info!("no new txns stored");
            return Ok(());
        }

        // the cursor moves to this page's own newest signature
        self.store.update_cursor(&state, &signatures[0])?;
        info!(signature = %signatures[0], "last signature updated");
        Ok(())
    }

    /// Dedup against storage, fetch only the remainder, filter and
    /// bulk-insert. Returns the number of newly stored records; never
    /// touches the cursor.
    pub async fn process_batch(&self, signatures: &[String]) -> Result<usize> {
        let existing = self.store.existing_signatures(signatures)?;
        let new_signatures: Vec<String> = signatures
            .iter()
            .filter(|signature| !existing.contains(signature.as_str()))
            .cloned()
            .collect();
        if new_signatures.is_empty() {
            // nothing to fetch
            return Ok(0);
        }

        let bodies = self.feed.fetch_parsed_batch(&new_signatures).await?;

        let mut records = Vec::new();
        for (signature, body) in new_signatures.iter().zip(bodies.iter()) {
            let Some(tx) = body else {
                // pruned or not yet available
                continue;
            };
            records.extend(extract_transfers(signature, tx, &self.receiver));
        }
        if records.is_empty() {
            return Ok(0);
        }

        let inserted = self.store.insert_batch(&records)?;
        debug!(inserted, "stored new transfer records");
        Ok(inserted)
    }
}

fn sort_newest_first(records: &mut [SignatureRecord]) {
    records.sort_by(|a, b| b.block_time.unwrap_or(0).cmp(&a.block_time.unwrap_or(0)));
}

fn validate_receiver(address: &str) -> Result<Pubkey> {
    let pubkey = Pubkey::from_str(address).map_err(|_| TrackerError::InvalidAddress {
        address: address.to_string(),
        length: address.len(),
    })?;
    let canonical = pubkey.to_string();
    if canonical.len() != 44 {
        return Err(TrackerError::InvalidAddress {
            length: canonical.len(),
            address: canonical,
        });
    }
    Ok(pubkey)
}
