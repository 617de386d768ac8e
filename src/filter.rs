//! Transfer filter: parsed transaction -> normalized transfer records
//!
//! An instruction is a candidate iff it belongs to the native system
//! program, its parsed type is "transfer" and its destination is the
//! tracked wallet. Everything else, including raw and partially-decoded
//! instruction shapes, is ignored.

use solana_sdk::native_token::lamports_to_sol;
use solana_sdk::pubkey::Pubkey;
use solana_transaction_status::{
    EncodedTransaction, EncodedTransactionWithStatusMeta, UiInstruction, UiMessage,
    UiParsedInstruction,
};

use crate::types::{TransferRecord, TransferStatus};

/// The instruction shapes the filter distinguishes
enum InstructionKind {
    /// Parsed system-program transfer
    SystemTransfer { destination: String, lamports: u64 },
    /// Anything else: other programs, other operation types, raw shapes
    Other,
}

fn classify(instruction: &UiInstruction) -> InstructionKind {
    let UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) = instruction else {
        return InstructionKind::Other;
    };
    if parsed.program != "system"
        || parsed.parsed.get("type").and_then(|v| v.as_str()) != Some("transfer")
    {
        return InstructionKind::Other;
    }
    let Some(info) = parsed.parsed.get("info") else {
        return InstructionKind::Other;
    };
    let Some(destination) = info.get("destination").and_then(|v| v.as_str()) else {
        return InstructionKind::Other;
    };
    let Some(lamports) = info.get("lamports").and_then(|v| v.as_u64()) else {
        return InstructionKind::Other;
    };
    InstructionKind::SystemTransfer {
        destination: destination.to_string(),
        lamports,
    }
}

/// Extract all transfers to `tracked` from one parsed transaction.
///
/// Returns no candidates when execution metadata is absent. The sender is
/// the transaction's first account key (the fee payer), not the
/// instruction's source field; this matches the stored-record convention
/// downstream consumers rely on.
pub fn extract_transfers(
    signature: &str,
    tx: &EncodedTransactionWithStatusMeta,
    tracked: &Pubkey,
) -> Vec<TransferRecord> {
    let Some(meta) = tx.meta.as_ref() else {
        return Vec::new();
    };
    let EncodedTransaction::Json(ui_tx) = &tx.transaction else {
        return Vec::new();
    };
    let UiMessage::Parsed(message) = &ui_tx.message else {
        return Vec::new();
    };
    let Some(fee_payer) = message.account_keys.first() else {
        return Vec::new();
    };

    let tracked = tracked.to_string();
    let status = if meta.err.is_some() {
        TransferStatus::Failure
    } else {
        TransferStatus::Success
    };
    let meta_json = serde_json::to_value(meta).ok();

    let mut records = Vec::new();
    for instruction in &message.instructions {
        if let InstructionKind::SystemTransfer {
            destination,
            lamports,
        } = classify(instruction)
        {
            if destination != tracked {
                continue;
            }
            records.push(TransferRecord::new(
                signature,
                fee_payer.pubkey.clone(),
                lamports_to_sol(lamports),
                status,
                meta_json.clone(),
            ));
        }
    }
    records
}
