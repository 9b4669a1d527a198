//! Business aggregates derived from confirmed events.

use serde::{Deserialize, Serialize};
use shared_types::BlockHeight;
use std::collections::BTreeMap;

/// RFQ lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RfqStatus {
    #[default]
    None,
    Open,
    Closed,
    WinnerSelected,
    EscrowFunded,
    Completed,
}

/// Request for quotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rfq {
    pub id: String,
    pub buyer: String,
    pub bidding_deadline: u64,
    pub reveal_deadline: u64,
    pub min_bid: u64,
    pub status: RfqStatus,
    pub winning_bid_id: Option<String>,
    pub winning_vendor: Option<String>,
    pub winning_amount: Option<u64>,
    pub created_block: BlockHeight,
    pub created_tx_id: String,
    pub created_event_index: u32,
    pub event_version: u32,
}

/// Sealed bid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: String,
    pub rfq_id: String,
    pub vendor: String,
    pub commitment_hash: String,
    pub stake: u64,
    pub revealed_amount: Option<u64>,
    pub is_revealed: bool,
    pub revealed_block: Option<BlockHeight>,
    pub is_winner: bool,
    pub is_slashed: bool,
    pub created_block: BlockHeight,
    pub created_tx_id: String,
    pub created_event_index: u32,
    pub event_version: u32,
}

/// Funds locked for an RFQ.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub rfq_id: String,
    pub total_amount: u64,
    pub released_amount: u64,
    pub is_final: bool,
    pub funded_block: BlockHeight,
    pub funded_tx_id: String,
    pub funded_event_index: u32,
    pub event_version: u32,
}

/// One released payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub rfq_id: String,
    pub recipient: String,
    pub amount: u64,
    pub is_final: bool,
    pub released_block: BlockHeight,
    pub released_tx_id: String,
    pub released_event_index: u32,
    pub event_version: u32,
}

/// Read/write access to business aggregates.
///
/// Implemented by store transactions and by [`RfqSnapshot`], so the same
/// projection code drives live ingestion, rollback replay and audit
/// reconstruction.
pub trait BusinessState {
    fn rfq(&self, id: &str) -> Option<Rfq>;
    fn put_rfq(&mut self, rfq: Rfq);
    fn bid(&self, id: &str) -> Option<Bid>;
    fn put_bid(&mut self, bid: Bid);
    fn escrow(&self, rfq_id: &str) -> Option<Escrow>;
    fn put_escrow(&mut self, escrow: Escrow);
    fn push_payment(&mut self, payment: Payment);
}

/// State of one RFQ rebuilt from the event log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqSnapshot {
    pub rfq: Option<Rfq>,
    pub bids: BTreeMap<String, Bid>,
    pub escrow: Option<Escrow>,
    pub payments: Vec<Payment>,
    /// Events replayed to build this snapshot.
    pub events_applied: usize,
}

impl RfqSnapshot {
    pub fn status(&self) -> RfqStatus {
        self.rfq.as_ref().map(|r| r.status).unwrap_or_default()
    }

    pub fn total_released(&self) -> u64 {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

impl BusinessState for RfqSnapshot {
    fn rfq(&self, id: &str) -> Option<Rfq> {
        self.rfq.as_ref().filter(|r| r.id == id).cloned()
    }

    fn put_rfq(&mut self, rfq: Rfq) {
        self.rfq = Some(rfq);
    }

    fn bid(&self, id: &str) -> Option<Bid> {
        self.bids.get(id).cloned()
    }

    fn put_bid(&mut self, bid: Bid) {
        self.bids.insert(bid.id.clone(), bid);
    }

    fn escrow(&self, rfq_id: &str) -> Option<Escrow> {
        self.escrow.as_ref().filter(|e| e.rfq_id == rfq_id).cloned()
    }

    fn put_escrow(&mut self, escrow: Escrow) {
        self.escrow = Some(escrow);
    }

    fn push_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }
}
