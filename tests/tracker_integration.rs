//! Engine scenarios against a scripted in-memory feed

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use solana_transaction_status::EncodedTransactionWithStatusMeta;

use solpay_tracker::config::TrackerSettings;
use solpay_tracker::feed::LedgerFeed;
use solpay_tracker::storage::TransferStore;
use solpay_tracker::tracker::PaymentTracker;
use solpay_tracker::types::SignatureRecord;

const RECEIVER: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const SENDER: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";
const OTHER_WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

fn settings() -> TrackerSettings {
    TrackerSettings {
        receiver: RECEIVER.to_string(),
        poll_interval_ms: 10,
        max_retries: 5,
        backoff_factor: 2,
        page_limit: 1_000,
        max_backfill_pages: 50,
    }
}

fn sig_record(signature: &str, block_time: i64) -> SignatureRecord {
    SignatureRecord {
        signature: signature.to_string(),
        slot: block_time as u64,
        block_time: Some(block_time),
        err: None,
    }
}

/// jsonParsed transaction with one system transfer to `destination`
fn transfer_tx(destination: &str, lamports: u64) -> EncodedTransactionWithStatusMeta {
    serde_json::from_value(json!({
        "transaction": {
            "signatures": ["5j7s6NiJS3JAkvgkoc18WVAsiSaci2pxB2A6ueCJP4tprA2TFg9wSyTLeYouxPBJEMzJinENTkpA52YStRW5Dia7"],
            "message": {
                "accountKeys": [
                    { "pubkey": SENDER, "writable": true, "signer": true, "source": "transaction" }
                ],
                "recentBlockhash": "9zb7PHBhzA3nNoqyZVXCDNB7A5PTwfVEKUbqfQehQJw9",
                "instructions": [{
                    "program": "system",
                    "programId": "11111111111111111111111111111111",
                    "parsed": {
                        "type": "transfer",
                        "info": {
                            "source": SENDER,
                            "destination": destination,
                            "lamports": lamports
                        }
                    },
                    "stackHeight": null
                }],
                "addressTableLookups": null
            }
        },
        "meta": {
            "err": null,
            "status": { "Ok": null },
            "fee": 5000,
            "preBalances": [],
            "postBalances": []
        },
        "version": "legacy"
    }))
    .expect("valid transaction fixture")
}

/// Scripted feed: pops one signature page per list call, serves parsed
/// bodies from a map, and records which signatures were fetched.
#[derive(Clone, Default)]
struct MockFeed {
    inner: Arc<MockFeedInner>,
}

#[derive(Default)]
struct MockFeedInner {
    pages: Mutex<VecDeque<Vec<SignatureRecord>>>,
    parsed: Mutex<HashMap<String, EncodedTransactionWithStatusMeta>>,
    fetched: Mutex<Vec<String>>,
}

impl MockFeed {
    fn push_page(&self, page: Vec<SignatureRecord>) {
        self.inner.pages.lock().unwrap().push_back(page);
    }

    fn add_parsed(&self, signature: &str, tx: EncodedTransactionWithStatusMeta) {
        self.inner
            .parsed
            .lock()
            .unwrap()
            .insert(signature.to_string(), tx);
    }

    fn fetched_count(&self) -> usize {
        self.inner.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerFeed for MockFeed {
    async fn list_signatures(
        &self,
        _limit: usize,
        _before: Option<&str>,
        _until: Option<&str>,
    ) -> solpay_tracker::Result<Vec<SignatureRecord>> {
        Ok(self
            .inner
            .pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn fetch_parsed_batch(
        &self,
        signatures: &[String],
    ) -> solpay_tracker::Result<Vec<Option<EncodedTransactionWithStatusMeta>>> {
        let mut fetched = self.inner.fetched.lock().unwrap();
        fetched.extend(signatures.iter().cloned());
        let parsed = self.inner.parsed.lock().unwrap();
        Ok(signatures
            .iter()
            .map(|signature| parsed.get(signature).cloned())
            .collect())
    }
}

fn tracker_with(feed: MockFeed) -> (tempfile::TempDir, PaymentTracker<MockFeed>) {
    let dir = tempfile::tempdir().unwrap();
    let store = TransferStore::open(dir.path()).unwrap();
    let tracker = PaymentTracker::new(feed, store, settings()).unwrap();
    (dir, tracker)
}

#[tokio::test]
async fn backfill_stores_matching_transfer_and_sets_cursor() {
    let feed = MockFeed::default();
    // one page of three signatures, only s1 is a payment to the wallet;
    // the page arrives chronologically mixed
    feed.push_page(vec![
        sig_record("s1", 100),
        sig_record("s2", 300),
        sig_record("s3", 200),
    ]);
    feed.add_parsed("s1", transfer_tx(RECEIVER, 1_500_000_000));
    feed.add_parsed("s2", transfer_tx(OTHER_WALLET, 2_000_000_000));
    feed.add_parsed("s3", transfer_tx(OTHER_WALLET, 3_000_000_000));

    let (_dir, tracker) = tracker_with(feed);
    tracker.sync().await.unwrap();

    let records = tracker.store().dump_tree("transfers").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["signature"], "s1");
    assert_eq!(records[0]["sender"], SENDER);
    assert_eq!(records[0]["amount"], 1.5);
    assert_eq!(records[0]["status"], "Success");

    // cursor points at the chronologically newest signature of the set
    let cursor = tracker.store().cursor_state().unwrap();
    assert_eq!(cursor.last_processed_signature, "s2");
}

#[tokio::test]
async fn backfill_with_no_matches_leaves_cursor_untouched() {
    let feed = MockFeed::default();
    feed.push_page(vec![sig_record("s1", 100)]);
    feed.add_parsed("s1", transfer_tx(OTHER_WALLET, 1_000_000_000));

    let (_dir, tracker) = tracker_with(feed);
    tracker.sync().await.unwrap();

    assert!(tracker.store().dump_tree("transfers").unwrap().is_empty());
    let cursor = tracker.store().cursor_state().unwrap();
    assert_eq!(cursor.last_processed_signature, "");
}

#[tokio::test]
async fn process_batch_is_idempotent_and_skips_refetch() {
    let feed = MockFeed::default();
    feed.add_parsed("s1", transfer_tx(RECEIVER, 2_500_000_000));
    let handle = feed.clone();

    let (_dir, tracker) = tracker_with(feed);
    let signatures = vec!["s1".to_string()];

    assert_eq!(tracker.process_batch(&signatures).await.unwrap(), 1);
    assert_eq!(handle.fetched_count(), 1);

    // second run: already stored, nothing fetched, nothing inserted
    assert_eq!(tracker.process_batch(&signatures).await.unwrap(), 0);
    assert_eq!(handle.fetched_count(), 1);
}

#[tokio::test]
async fn pruned_transaction_bodies_are_skipped_silently() {
    let feed = MockFeed::default();
    // s2 has no parsed body available
    feed.add_parsed("s1", transfer_tx(RECEIVER, 1_000_000_000));

    let (_dir, tracker) = tracker_with(feed);
    let signatures = vec!["s1".to_string(), "s2".to_string()];
    assert_eq!(tracker.process_batch(&signatures).await.unwrap(), 1);
}

#[tokio::test]
async fn poll_advances_cursor_only_when_records_stored() {
    let feed = MockFeed::default();
    feed.add_parsed("s1", transfer_tx(RECEIVER, 1_000_000_000));
    feed.add_parsed("s4", transfer_tx(OTHER_WALLET, 1_000_000_000));
    let handle = feed.clone();

    let (_dir, tracker) = tracker_with(feed);

    // cycle 1: one matching payment, cursor moves to the page's newest
    handle.push_page(vec![sig_record("s1", 100)]);
    tracker.poll().await.unwrap();
    let cursor = tracker.store().cursor_state().unwrap();
    assert_eq!(cursor.last_processed_signature, "s1");

    // cycle 2: page with no matching transfers, cursor holds
    handle.push_page(vec![sig_record("s4", 500)]);
    tracker.poll().await.unwrap();
    let cursor = tracker.store().cursor_state().unwrap();
    assert_eq!(cursor.last_processed_signature, "s1");

    // cycle 3: empty page, cursor holds
    tracker.poll().await.unwrap();
    let cursor = tracker.store().cursor_state().unwrap();
    assert_eq!(cursor.last_processed_signature, "s1");
}

#[tokio::test]
async fn backfill_aborts_at_page_cap() {
    let feed = MockFeed::default();
    // more non-empty pages than the configured cap
    for i in 0..60 {
        feed.push_page(vec![sig_record(&format!("s{i}"), i)]);
    }

    let (_dir, tracker) = tracker_with(feed);
    let err = tracker.sync().await.unwrap_err();
    assert!(matches!(
        err,
        solpay_tracker::TrackerError::BackfillCapExceeded(50)
    ));
}
