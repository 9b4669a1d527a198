//! Contract events and their ingestion envelope.
//!
//! The event kind is chosen from the transition name, never from the
//! fields present in the payload.

use super::errors::{ProcessorError, ProcessorResult};
use serde::{Deserialize, Serialize};
use shared_types::BlockHeight;
use std::fmt;

/// Kind of business event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    RfqCreated,
    BidCommitted,
    BiddingClosed,
    BidRevealed,
    WinnerSelected,
    StakeSlashed,
    EscrowFunded,
    PaymentReleased,
}

impl EventKind {
    /// Kind emitted by a contract transition.
    pub fn from_transition(transition: &str) -> Option<Self> {
        let kind = match transition {
            "create_rfq" => EventKind::RfqCreated,
            "submit_bid_commit" => EventKind::BidCommitted,
            "close_bidding" => EventKind::BiddingClosed,
            "reveal_bid" => EventKind::BidRevealed,
            "select_winner" => EventKind::WinnerSelected,
            "slash_non_revealer" => EventKind::StakeSlashed,
            "fund_escrow" => EventKind::EscrowFunded,
            "release_partial_payment" | "release_final_payment" => EventKind::PaymentReleased,
            _ => return None,
        };
        Some(kind)
    }

    /// Tag used in the serialized [`ContractEvent`].
    fn tag(&self) -> &'static str {
        match self {
            EventKind::RfqCreated => "RfqCreated",
            EventKind::BidCommitted => "BidCommitted",
            EventKind::BiddingClosed => "BiddingClosed",
            EventKind::BidRevealed => "BidRevealed",
            EventKind::WinnerSelected => "WinnerSelected",
            EventKind::StakeSlashed => "StakeSlashed",
            EventKind::EscrowFunded => "EscrowFunded",
            EventKind::PaymentReleased => "PaymentReleased",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RfqCreated => "RFQ_CREATED",
            EventKind::BidCommitted => "BID_COMMITTED",
            EventKind::BiddingClosed => "BIDDING_CLOSED",
            EventKind::BidRevealed => "BID_REVEALED",
            EventKind::WinnerSelected => "WINNER_SELECTED",
            EventKind::StakeSlashed => "STAKE_SLASHED",
            EventKind::EscrowFunded => "ESCROW_FUNDED",
            EventKind::PaymentReleased => "PAYMENT_RELEASED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded contract event. Every kind names its RFQ.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ContractEvent {
    RfqCreated {
        rfq_id: String,
        buyer: String,
        bidding_deadline: u64,
        reveal_deadline: u64,
        min_bid: u64,
    },
    BidCommitted {
        rfq_id: String,
        bid_id: String,
        vendor: String,
        commitment_hash: String,
        stake: u64,
    },
    BiddingClosed {
        rfq_id: String,
        buyer: String,
    },
    BidRevealed {
        rfq_id: String,
        bid_id: String,
        vendor: String,
        revealed_amount: u64,
    },
    WinnerSelected {
        rfq_id: String,
        winning_bid_id: String,
        winning_amount: u64,
        vendor: String,
    },
    StakeSlashed {
        rfq_id: String,
        bid_id: String,
        slashed_vendor: String,
        stake_amount: u64,
    },
    EscrowFunded {
        rfq_id: String,
        buyer: String,
        amount: u64,
    },
    PaymentReleased {
        rfq_id: String,
        recipient: String,
        amount: u64,
        #[serde(default)]
        is_final: bool,
    },
}

impl ContractEvent {
    /// Decode `payload` as the event emitted by `transition`.
    ///
    /// `release_final_payment` is always final regardless of the payload flag.
    pub fn decode(transition: &str, payload: &serde_json::Value) -> ProcessorResult<Self> {
        let kind = EventKind::from_transition(transition).ok_or_else(|| {
            ProcessorError::UnknownTransition {
                transition: transition.to_string(),
            }
        })?;
        let decode_err = |reason: String| ProcessorError::Decode {
            transition: transition.to_string(),
            reason,
        };

        let mut tagged = match payload {
            serde_json::Value::Object(map) => map.clone(),
            other => return Err(decode_err(format!("expected object, got {other}"))),
        };
        tagged.insert("kind".to_string(), serde_json::Value::from(kind.tag()));

        let mut event: ContractEvent = serde_json::from_value(serde_json::Value::Object(tagged))
            .map_err(|e| decode_err(e.to_string()))?;
        if transition == "release_final_payment" {
            if let ContractEvent::PaymentReleased { is_final, .. } = &mut event {
                *is_final = true;
            }
        }
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ContractEvent::RfqCreated { .. } => EventKind::RfqCreated,
            ContractEvent::BidCommitted { .. } => EventKind::BidCommitted,
            ContractEvent::BiddingClosed { .. } => EventKind::BiddingClosed,
            ContractEvent::BidRevealed { .. } => EventKind::BidRevealed,
            ContractEvent::WinnerSelected { .. } => EventKind::WinnerSelected,
            ContractEvent::StakeSlashed { .. } => EventKind::StakeSlashed,
            ContractEvent::EscrowFunded { .. } => EventKind::EscrowFunded,
            ContractEvent::PaymentReleased { .. } => EventKind::PaymentReleased,
        }
    }

    pub fn rfq_id(&self) -> &str {
        match self {
            ContractEvent::RfqCreated { rfq_id, .. }
            | ContractEvent::BidCommitted { rfq_id, .. }
            | ContractEvent::BiddingClosed { rfq_id, .. }
            | ContractEvent::BidRevealed { rfq_id, .. }
            | ContractEvent::WinnerSelected { rfq_id, .. }
            | ContractEvent::StakeSlashed { rfq_id, .. }
            | ContractEvent::EscrowFunded { rfq_id, .. }
            | ContractEvent::PaymentReleased { rfq_id, .. } => rfq_id,
        }
    }
}

/// Idempotency key of an event: `(tx_id, transition, event_index)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    pub tx_id: String,
    pub transition: String,
    pub event_index: u32,
}

impl EventKey {
    pub fn new(tx_id: impl Into<String>, transition: impl Into<String>, event_index: u32) -> Self {
        Self {
            tx_id: tx_id.into(),
            transition: transition.into(),
            event_index,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tx_id, self.transition, self.event_index)
    }
}

/// An event as delivered by the ledger event source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncomingEvent {
    pub tx_id: String,
    pub transition: String,
    pub event_index: u32,
    pub block_height: BlockHeight,
    pub block_hash: String,
    /// Raw event payload.
    pub payload: serde_json::Value,
    /// Seen in the mempool only, not yet in a block.
    pub is_pending: bool,
}

impl IncomingEvent {
    pub fn key(&self) -> EventKey {
        EventKey::new(self.tx_id.clone(), self.transition.clone(), self.event_index)
    }
}
