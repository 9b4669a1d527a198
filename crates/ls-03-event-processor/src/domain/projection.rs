//! Business-state mutation, one rule per event kind.

use super::aggregates::{Bid, BusinessState, Escrow, Payment, Rfq, RfqStatus};
use super::errors::{ProcessorError, ProcessorResult};
use super::events::ContractEvent;
use shared_types::BlockHeight;

/// Provenance of the event being applied.
#[derive(Clone, Copy, Debug)]
pub struct EventMeta<'a> {
    pub tx_id: &'a str,
    pub event_index: u32,
    pub block_height: BlockHeight,
    pub event_version: u32,
}

fn missing(kind: &'static str, id: &str) -> ProcessorError {
    ProcessorError::MissingAggregate {
        kind,
        id: id.to_string(),
    }
}

fn load_rfq<S: BusinessState + ?Sized>(state: &S, id: &str) -> ProcessorResult<Rfq> {
    state.rfq(id).ok_or_else(|| missing("rfq", id))
}

fn load_bid<S: BusinessState + ?Sized>(state: &S, id: &str) -> ProcessorResult<Bid> {
    state.bid(id).ok_or_else(|| missing("bid", id))
}

fn set_rfq_status<S: BusinessState + ?Sized>(
    state: &mut S,
    id: &str,
    status: RfqStatus,
) -> ProcessorResult<Rfq> {
    let mut rfq = load_rfq(state, id)?;
    rfq.status = status;
    state.put_rfq(rfq.clone());
    Ok(rfq)
}

/// Apply exactly one business mutation for `event`.
///
/// Validates before writing, so an error leaves `state` untouched.
pub fn apply<S: BusinessState + ?Sized>(
    state: &mut S,
    event: &ContractEvent,
    meta: EventMeta<'_>,
) -> ProcessorResult<()> {
    match event {
        ContractEvent::RfqCreated {
            rfq_id,
            buyer,
            bidding_deadline,
            reveal_deadline,
            min_bid,
        } => {
            if state.rfq(rfq_id).is_some() {
                return Err(ProcessorError::AggregateExists {
                    kind: "rfq",
                    id: rfq_id.clone(),
                });
            }
            state.put_rfq(Rfq {
                id: rfq_id.clone(),
                buyer: buyer.clone(),
                bidding_deadline: *bidding_deadline,
                reveal_deadline: *reveal_deadline,
                min_bid: *min_bid,
                status: RfqStatus::Open,
                winning_bid_id: None,
                winning_vendor: None,
                winning_amount: None,
                created_block: meta.block_height,
                created_tx_id: meta.tx_id.to_string(),
                created_event_index: meta.event_index,
                event_version: meta.event_version,
            });
        }

        ContractEvent::BidCommitted {
            rfq_id,
            bid_id,
            vendor,
            commitment_hash,
            stake,
        } => {
            load_rfq(state, rfq_id)?;
            if state.bid(bid_id).is_some() {
                return Err(ProcessorError::AggregateExists {
                    kind: "bid",
                    id: bid_id.clone(),
                });
            }
            state.put_bid(Bid {
                id: bid_id.clone(),
                rfq_id: rfq_id.clone(),
                vendor: vendor.clone(),
                commitment_hash: commitment_hash.clone(),
                stake: *stake,
                revealed_amount: None,
                is_revealed: false,
                revealed_block: None,
                is_winner: false,
                is_slashed: false,
                created_block: meta.block_height,
                created_tx_id: meta.tx_id.to_string(),
                created_event_index: meta.event_index,
                event_version: meta.event_version,
            });
        }

        ContractEvent::BiddingClosed { rfq_id, .. } => {
            set_rfq_status(state, rfq_id, RfqStatus::Closed)?;
        }

        ContractEvent::BidRevealed {
            bid_id,
            revealed_amount,
            ..
        } => {
            let mut bid = load_bid(state, bid_id)?;
            bid.revealed_amount = Some(*revealed_amount);
            bid.is_revealed = true;
            bid.revealed_block = Some(meta.block_height);
            state.put_bid(bid);
        }

        ContractEvent::WinnerSelected {
            rfq_id,
            winning_bid_id,
            winning_amount,
            vendor,
        } => {
            let mut bid = load_bid(state, winning_bid_id)?;
            let mut rfq = load_rfq(state, rfq_id)?;
            bid.is_winner = true;
            rfq.status = RfqStatus::WinnerSelected;
            rfq.winning_bid_id = Some(winning_bid_id.clone());
            rfq.winning_vendor = Some(vendor.clone());
            rfq.winning_amount = Some(*winning_amount);
            state.put_bid(bid);
            state.put_rfq(rfq);
        }

        ContractEvent::StakeSlashed { bid_id, .. } => {
            let mut bid = load_bid(state, bid_id)?;
            bid.is_slashed = true;
            state.put_bid(bid);
        }

        ContractEvent::EscrowFunded { rfq_id, amount, .. } => {
            let mut rfq = load_rfq(state, rfq_id)?;
            if state.escrow(rfq_id).is_some() {
                return Err(ProcessorError::AggregateExists {
                    kind: "escrow",
                    id: rfq_id.clone(),
                });
            }
            rfq.status = RfqStatus::EscrowFunded;
            state.put_escrow(Escrow {
                rfq_id: rfq_id.clone(),
                total_amount: *amount,
                released_amount: 0,
                is_final: false,
                funded_block: meta.block_height,
                funded_tx_id: meta.tx_id.to_string(),
                funded_event_index: meta.event_index,
                event_version: meta.event_version,
            });
            state.put_rfq(rfq);
        }

        ContractEvent::PaymentReleased {
            rfq_id,
            recipient,
            amount,
            is_final,
        } => {
            let mut escrow = state.escrow(rfq_id).ok_or_else(|| missing("escrow", rfq_id))?;
            let rfq = if *is_final {
                Some(load_rfq(state, rfq_id)?)
            } else {
                None
            };

            escrow.released_amount = escrow.released_amount.saturating_add(*amount);
            escrow.is_final = *is_final;
            state.put_escrow(escrow);
            state.push_payment(Payment {
                rfq_id: rfq_id.clone(),
                recipient: recipient.clone(),
                amount: *amount,
                is_final: *is_final,
                released_block: meta.block_height,
                released_tx_id: meta.tx_id.to_string(),
                released_event_index: meta.event_index,
                event_version: meta.event_version,
            });
            if let Some(mut rfq) = rfq {
                rfq.status = RfqStatus::Completed;
                state.put_rfq(rfq);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RfqSnapshot;

    fn meta(height: BlockHeight) -> EventMeta<'static> {
        EventMeta {
            tx_id: "at1tx",
            event_index: 0,
            block_height: height,
            event_version: 1,
        }
    }

    fn created() -> ContractEvent {
        ContractEvent::RfqCreated {
            rfq_id: "r1".into(),
            buyer: "buyer".into(),
            bidding_deadline: 10,
            reveal_deadline: 20,
            min_bid: 5,
        }
    }

    fn committed(bid: &str) -> ContractEvent {
        ContractEvent::BidCommitted {
            rfq_id: "r1".into(),
            bid_id: bid.into(),
            vendor: format!("vendor-{bid}"),
            commitment_hash: "h".into(),
            stake: 3,
        }
    }

    #[test]
    fn test_full_auction_lifecycle() {
        let mut s = RfqSnapshot::default();
        apply(&mut s, &created(), meta(1)).unwrap();
        apply(&mut s, &committed("b1"), meta(2)).unwrap();
        apply(&mut s, &committed("b2"), meta(2)).unwrap();
        apply(&mut s, &ContractEvent::BiddingClosed { rfq_id: "r1".into(), buyer: "buyer".into() }, meta(3)).unwrap();
        apply(
            &mut s,
            &ContractEvent::BidRevealed { rfq_id: "r1".into(), bid_id: "b1".into(), vendor: "vendor-b1".into(), revealed_amount: 40 },
            meta(4),
        )
        .unwrap();
        apply(
            &mut s,
            &ContractEvent::StakeSlashed { rfq_id: "r1".into(), bid_id: "b2".into(), slashed_vendor: "vendor-b2".into(), stake_amount: 3 },
            meta(5),
        )
        .unwrap();
        apply(
            &mut s,
            &ContractEvent::WinnerSelected { rfq_id: "r1".into(), winning_bid_id: "b1".into(), winning_amount: 40, vendor: "vendor-b1".into() },
            meta(6),
        )
        .unwrap();
        apply(&mut s, &ContractEvent::EscrowFunded { rfq_id: "r1".into(), buyer: "buyer".into(), amount: 40 }, meta(7)).unwrap();
        assert_eq!(s.status(), RfqStatus::EscrowFunded);

        apply(
            &mut s,
            &ContractEvent::PaymentReleased { rfq_id: "r1".into(), recipient: "vendor-b1".into(), amount: 15, is_final: false },
            meta(8),
        )
        .unwrap();
        assert_eq!(s.status(), RfqStatus::EscrowFunded);
        apply(
            &mut s,
            &ContractEvent::PaymentReleased { rfq_id: "r1".into(), recipient: "vendor-b1".into(), amount: 25, is_final: true },
            meta(9),
        )
        .unwrap();

        assert_eq!(s.status(), RfqStatus::Completed);
        let escrow = s.escrow.clone().unwrap();
        assert_eq!(escrow.released_amount, 40);
        assert!(escrow.is_final);
        assert_eq!(s.total_released(), 40);

        let b1 = &s.bids["b1"];
        assert!(b1.is_revealed && b1.is_winner);
        assert_eq!(b1.revealed_block, Some(4));
        assert!(s.bids["b2"].is_slashed);
        assert_eq!(s.rfq.as_ref().unwrap().winning_amount, Some(40));
    }

    #[test]
    fn test_duplicate_creation_rejected() {
        let mut s = RfqSnapshot::default();
        apply(&mut s, &created(), meta(1)).unwrap();
        let err = apply(&mut s, &created(), meta(2)).unwrap_err();
        assert!(matches!(err, ProcessorError::AggregateExists { kind: "rfq", .. }));
        assert_eq!(s.rfq.unwrap().created_block, 1);
    }

    #[test]
    fn test_event_for_missing_aggregate() {
        let mut s = RfqSnapshot::default();
        let err = apply(&mut s, &committed("b1"), meta(1)).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingAggregate { kind: "rfq", .. }));
        assert!(s.bids.is_empty());
    }

    #[test]
    fn test_payment_without_escrow_writes_nothing() {
        let mut s = RfqSnapshot::default();
        apply(&mut s, &created(), meta(1)).unwrap();
        let before = s.clone();
        let err = apply(
            &mut s,
            &ContractEvent::PaymentReleased { rfq_id: "r1".into(), recipient: "v".into(), amount: 1, is_final: true },
            meta(2),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessorError::MissingAggregate { kind: "escrow", .. }));
        assert_eq!(s, before);
    }
}
