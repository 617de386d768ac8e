//! Local persistence for transfer records and the poll cursor
//!
//! Two trees in one embedded database: `transfers` holds one JSON
//! document per matched transfer instruction, keyed by signature plus a
//! per-instruction index; `cursor` holds the single cursor document.
//!
//! The store assumes exactly one active engine instance per tracked
//! account; concurrent instances would race on cursor updates.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::errors::Result;
use crate::types::{CursorState, TransferRecord};

const TRANSFERS_TREE: &str = "transfers";
const CURSOR_TREE: &str = "cursor";
const CURSOR_KEY: &[u8] = b"state";

/// Storage owned exclusively by the indexing engine
pub struct TransferStore {
    db: sled::Db,
    transfers: sled::Tree,
    cursor: sled::Tree,
}

impl TransferStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        let transfers = db.open_tree(TRANSFERS_TREE)?;
        let cursor = db.open_tree(CURSOR_TREE)?;
        Ok(Self {
            db,
            transfers,
            cursor,
        })
    }

    /// Which of `signatures` already have at least one stored record.
    ///
    /// Signatures are base58, so `:` cannot occur inside one and is a
    /// safe key delimiter for the prefix probe.
    pub fn existing_signatures(&self, signatures: &[String]) -> Result<HashSet<String>> {
        let mut existing = HashSet::new();
        for signature in signatures {
            let prefix = format!("{signature}:");
            if let Some(entry) = self.transfers.scan_prefix(prefix.as_bytes()).next() {
                entry?;
                existing.insert(signature.clone());
            }
        }
        Ok(existing)
    }

    /// Insert all records in one batch; returns the inserted count.
    ///
    /// Records sharing a signature (multiple matching instructions in one
    /// transaction) get consecutive per-signature indices.
    pub fn insert_batch(&self, records: &[TransferRecord]) -> Result<usize> {
        let mut batch = sled::Batch::default();
        let mut next_index: HashMap<&str, u32> = HashMap::new();
        for record in records {
            let index = next_index.entry(record.signature.as_str()).or_insert(0);
            let key = format!("{}:{:04}", record.signature, index);
            *index += 1;
            batch.insert(key.into_bytes(), serde_json::to_vec(record)?);
        }
        self.transfers.apply_batch(batch)?;
        self.transfers.flush()?;
        Ok(records.len())
    }

    /// Read the cursor, creating the empty singleton on first access
    pub fn cursor_state(&self) -> Result<CursorState> {
        match self.cursor.get(CURSOR_KEY)? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => {
                let state = CursorState::empty();
                self.cursor.insert(CURSOR_KEY, serde_json::to_vec(&state)?)?;
                Ok(state)
            }
        }
    }

    /// Advance the cursor to `signature`, keeping the document id
    pub fn update_cursor(&self, state: &CursorState, signature: &str) -> Result<()> {
        let updated = CursorState {
            id: state.id,
            last_processed_signature: signature.to_string(),
        };
        self.cursor.insert(CURSOR_KEY, serde_json::to_vec(&updated)?)?;
        self.cursor.flush()?;
        Ok(())
    }

    /// Names of all user trees, for the collections subcommand
    pub fn tree_names(&self) -> Vec<String> {
        self.db
            .tree_names()
            .into_iter()
            .map(|name| String::from_utf8_lossy(&name).into_owned())
            .filter(|name| !name.starts_with("__sled__"))
            .collect()
    }

    /// All documents in one tree, decoded as JSON
    pub fn dump_tree(&self, name: &str) -> Result<Vec<serde_json::Value>> {
        let tree = self.db.open_tree(name)?;
        let mut documents = Vec::new();
        for entry in tree.iter() {
            let (_, value) = entry?;
            documents.push(serde_json::from_slice(&value)?);
        }
        Ok(documents)
    }
}
