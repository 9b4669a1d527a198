//! Tamper-evident linking of the ledger event log.
//!
//! `event_hash = sha256(canonical JSON of the entry || previous_hash)`.
//! Struct field order fixes the JSON layout.

use super::errors::{ProcessorError, ProcessorResult};
use super::events::{ContractEvent, EventKind};
use super::records::{HashChainReport, LedgerEvent};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared_types::{BlockHeight, Timestamp};

#[derive(Serialize)]
struct HashInput<'a> {
    kind: EventKind,
    tx_id: &'a str,
    transition: &'a str,
    event_index: u32,
    rfq_id: &'a str,
    block_height: BlockHeight,
    block_hash: &'a str,
    event_version: u32,
    processed_at: Timestamp,
    event: &'a ContractEvent,
    previous_hash: Option<&'a str>,
}

/// Hash of `event` chained onto `previous_hash`. Ignores the stored hashes.
pub fn compute_event_hash(
    event: &LedgerEvent,
    previous_hash: Option<&str>,
) -> ProcessorResult<String> {
    let input = HashInput {
        kind: event.kind,
        tx_id: &event.key.tx_id,
        transition: &event.key.transition,
        event_index: event.key.event_index,
        rfq_id: &event.rfq_id,
        block_height: event.block_height,
        block_hash: &event.block_hash,
        event_version: event.event_version,
        processed_at: event.processed_at,
        event: &event.event,
        previous_hash,
    };
    let bytes = serde_json::to_vec(&input).map_err(|e| ProcessorError::Encoding {
        reason: e.to_string(),
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Set `previous_hash` and `event_hash` of `event`.
pub fn link(event: &mut LedgerEvent, previous_hash: Option<String>) -> ProcessorResult<()> {
    event.event_hash = compute_event_hash(event, previous_hash.as_deref())?;
    event.previous_hash = previous_hash;
    Ok(())
}

/// Verify `events`, given in sequence order.
pub fn verify(events: &[LedgerEvent]) -> HashChainReport {
    let mut invalid_events = Vec::new();
    let mut previous: Option<&str> = None;

    for event in events {
        let link_ok = event.previous_hash.as_deref() == previous;
        let hash_ok = compute_event_hash(event, previous)
            .map(|expected| expected == event.event_hash)
            .unwrap_or(false);
        if !(link_ok && hash_ok) {
            invalid_events.push(event.key.to_string());
        }
        previous = Some(event.event_hash.as_str());
    }

    HashChainReport {
        valid: invalid_events.is_empty(),
        total_events: events.len(),
        invalid_events,
    }
}
