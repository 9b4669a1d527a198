//! In-memory event store.
//!
//! A transaction writes straight into the shared state through a journal
//! that records the inverse of every write; an error replays the journal
//! newest-first. The mutex is held for the whole closure, so transactions
//! are serialized.

use crate::domain::{
    Bid, BusinessState, Checkpoint, Escrow, EventKey, LedgerEvent, Payment, ProcessorResult,
    ReorgRecord, Rfq, StagingEvent,
};
use crate::ports::{EventStore, EventTxn};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::BlockHeight;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct State {
    ledger: HashMap<EventKey, LedgerEvent>,
    /// sequence -> ledger key
    by_sequence: BTreeMap<u64, EventKey>,
    staging: BTreeMap<EventKey, StagingEvent>,
    checkpoints: BTreeMap<BlockHeight, Checkpoint>,
    rfqs: HashMap<String, Rfq>,
    bids: HashMap<String, Bid>,
    escrows: HashMap<String, Escrow>,
    payments: Vec<Payment>,
    reorgs: Vec<ReorgRecord>,
    next_sequence: u64,
}

impl State {
    fn sorted_by_sequence(&self, filter: impl Fn(&LedgerEvent) -> bool) -> Vec<LedgerEvent> {
        self.by_sequence
            .values()
            .filter_map(|key| self.ledger.get(key))
            .filter(|e| filter(e))
            .cloned()
            .collect()
    }

    fn sorted_for_replay(&self, filter: impl Fn(&LedgerEvent) -> bool) -> Vec<LedgerEvent> {
        let mut out: Vec<_> = self.ledger.values().filter(|e| filter(e)).cloned().collect();
        out.sort_by_key(|e| e.replay_order());
        out
    }

    fn insert_ledger(&mut self, event: LedgerEvent) -> Option<LedgerEvent> {
        let sequence = event.sequence;
        let key = event.key.clone();
        let previous = self.ledger.insert(key.clone(), event);
        if let Some(old) = &previous {
            if old.sequence != sequence {
                self.by_sequence.remove(&old.sequence);
            }
        }
        self.by_sequence.insert(sequence, key);
        previous
    }

    fn remove_ledger(&mut self, key: &EventKey) -> Option<LedgerEvent> {
        let removed = self.ledger.remove(key)?;
        self.by_sequence.remove(&removed.sequence);
        Some(removed)
    }

    fn split_staging(&mut self, keep: impl Fn(&StagingEvent) -> bool) -> Vec<StagingEvent> {
        let doomed: Vec<EventKey> = self
            .staging
            .values()
            .filter(|e| !keep(e))
            .map(|e| e.key.clone())
            .collect();
        doomed
            .iter()
            .filter_map(|key| self.staging.remove(key))
            .collect()
    }
}

impl BusinessState for State {
    fn rfq(&self, id: &str) -> Option<Rfq> {
        self.rfqs.get(id).cloned()
    }

    fn put_rfq(&mut self, rfq: Rfq) {
        self.rfqs.insert(rfq.id.clone(), rfq);
    }

    fn bid(&self, id: &str) -> Option<Bid> {
        self.bids.get(id).cloned()
    }

    fn put_bid(&mut self, bid: Bid) {
        self.bids.insert(bid.id.clone(), bid);
    }

    fn escrow(&self, rfq_id: &str) -> Option<Escrow> {
        self.escrows.get(rfq_id).cloned()
    }

    fn put_escrow(&mut self, escrow: Escrow) {
        self.escrows.insert(escrow.rfq_id.clone(), escrow);
    }

    fn push_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }
}

impl EventTxn for State {
    fn ledger_event(&self, key: &EventKey) -> Option<LedgerEvent> {
        self.ledger.get(key).cloned()
    }

    fn ledger_tail(&self) -> Option<LedgerEvent> {
        self.by_sequence
            .last_key_value()
            .and_then(|(_, key)| self.ledger.get(key))
            .cloned()
    }

    fn ledger_events(&self) -> Vec<LedgerEvent> {
        self.sorted_by_sequence(|_| true)
    }

    fn ledger_events_for_rfq(&self, rfq_id: &str) -> Vec<LedgerEvent> {
        self.sorted_for_replay(|e| e.rfq_id == rfq_id)
    }

    fn ledger_events_since(&self, height: BlockHeight) -> Vec<LedgerEvent> {
        self.sorted_for_replay(|e| e.block_height >= height)
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    fn put_ledger_event(&mut self, event: LedgerEvent) {
        self.insert_ledger(event);
    }

    fn delete_ledger_events_above(&mut self, height: BlockHeight) -> Vec<LedgerEvent> {
        let doomed = self.sorted_by_sequence(|e| e.block_height > height);
        for event in &doomed {
            self.remove_ledger(&event.key);
        }
        doomed
    }

    fn staging_event(&self, key: &EventKey) -> Option<StagingEvent> {
        self.staging.get(key).cloned()
    }

    fn staging_events(&self) -> Vec<StagingEvent> {
        self.staging.values().cloned().collect()
    }

    fn put_staging_event(&mut self, event: StagingEvent) {
        self.staging.insert(event.key.clone(), event);
    }

    fn delete_staging_event(&mut self, key: &EventKey) -> bool {
        self.staging.remove(key).is_some()
    }

    fn delete_staging_events_above(&mut self, height: BlockHeight) -> Vec<StagingEvent> {
        self.split_staging(|e| e.block_height <= height)
    }

    fn delete_staging_events_through(&mut self, height: BlockHeight) -> Vec<StagingEvent> {
        self.split_staging(|e| e.block_height > height)
    }

    fn checkpoint(&self, height: BlockHeight) -> Option<Checkpoint> {
        self.checkpoints.get(&height).cloned()
    }

    fn checkpoints(&self) -> Vec<Checkpoint> {
        self.checkpoints.values().cloned().collect()
    }

    fn put_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.insert(checkpoint.block_height, checkpoint);
    }

    fn delete_checkpoints_above(&mut self, height: BlockHeight) -> Vec<Checkpoint> {
        match height.checked_add(1) {
            Some(from) => self.checkpoints.split_off(&from).into_values().collect(),
            None => Vec::new(),
        }
    }

    fn drop_rfq_state(&mut self, rfq_id: &str) {
        self.rfqs.remove(rfq_id);
        self.bids.retain(|_, b| b.rfq_id != rfq_id);
        self.escrows.remove(rfq_id);
        self.payments.retain(|p| p.rfq_id != rfq_id);
    }

    fn payments_for(&self, rfq_id: &str) -> Vec<Payment> {
        self.payments
            .iter()
            .filter(|p| p.rfq_id == rfq_id)
            .cloned()
            .collect()
    }

    fn push_reorg(&mut self, record: ReorgRecord) {
        self.reorgs.push(record);
    }

    fn reorgs(&self) -> Vec<ReorgRecord> {
        self.reorgs.clone()
    }
}

/// Inverse of one write.
enum Undo {
    Ledger(EventKey, Option<LedgerEvent>),
    Staging(EventKey, Option<StagingEvent>),
    Checkpoint(BlockHeight, Option<Checkpoint>),
    Rfq(String, Option<Rfq>),
    Bid(String, Option<Bid>),
    Escrow(String, Option<Escrow>),
    Payments(Vec<Payment>),
    PaymentPushed,
    ReorgPushed,
    Sequence(u64),
}

/// Write access to [`State`] that journals every change.
struct Journal<'a> {
    state: &'a mut State,
    undo: Vec<Undo>,
}

impl<'a> Journal<'a> {
    fn new(state: &'a mut State) -> Self {
        Self {
            state,
            undo: Vec::new(),
        }
    }

    /// Undo every journaled write, newest first.
    fn revert(mut self) {
        while let Some(entry) = self.undo.pop() {
            let state = &mut *self.state;
            match entry {
                Undo::Ledger(key, previous) => match previous {
                    Some(event) => {
                        state.insert_ledger(event);
                    }
                    None => {
                        state.remove_ledger(&key);
                    }
                },
                Undo::Staging(key, previous) => match previous {
                    Some(event) => {
                        state.staging.insert(key, event);
                    }
                    None => {
                        state.staging.remove(&key);
                    }
                },
                Undo::Checkpoint(height, previous) => match previous {
                    Some(checkpoint) => {
                        state.checkpoints.insert(height, checkpoint);
                    }
                    None => {
                        state.checkpoints.remove(&height);
                    }
                },
                Undo::Rfq(id, previous) => restore(&mut state.rfqs, id, previous),
                Undo::Bid(id, previous) => restore(&mut state.bids, id, previous),
                Undo::Escrow(id, previous) => restore(&mut state.escrows, id, previous),
                Undo::Payments(payments) => state.payments = payments,
                Undo::PaymentPushed => {
                    state.payments.pop();
                }
                Undo::ReorgPushed => {
                    state.reorgs.pop();
                }
                Undo::Sequence(next) => state.next_sequence = next,
            }
        }
    }
}

fn restore<V>(map: &mut HashMap<String, V>, id: String, previous: Option<V>) {
    match previous {
        Some(value) => {
            map.insert(id, value);
        }
        None => {
            map.remove(&id);
        }
    }
}

impl BusinessState for Journal<'_> {
    fn rfq(&self, id: &str) -> Option<Rfq> {
        self.state.rfq(id)
    }

    fn put_rfq(&mut self, rfq: Rfq) {
        self.undo
            .push(Undo::Rfq(rfq.id.clone(), self.state.rfqs.get(&rfq.id).cloned()));
        self.state.put_rfq(rfq);
    }

    fn bid(&self, id: &str) -> Option<Bid> {
        self.state.bid(id)
    }

    fn put_bid(&mut self, bid: Bid) {
        self.undo
            .push(Undo::Bid(bid.id.clone(), self.state.bids.get(&bid.id).cloned()));
        self.state.put_bid(bid);
    }

    fn escrow(&self, rfq_id: &str) -> Option<Escrow> {
        self.state.escrow(rfq_id)
    }

    fn put_escrow(&mut self, escrow: Escrow) {
        self.undo.push(Undo::Escrow(
            escrow.rfq_id.clone(),
            self.state.escrows.get(&escrow.rfq_id).cloned(),
        ));
        self.state.put_escrow(escrow);
    }

    fn push_payment(&mut self, payment: Payment) {
        self.undo.push(Undo::PaymentPushed);
        self.state.push_payment(payment);
    }
}

impl EventTxn for Journal<'_> {
    fn ledger_event(&self, key: &EventKey) -> Option<LedgerEvent> {
        self.state.ledger_event(key)
    }

    fn ledger_tail(&self) -> Option<LedgerEvent> {
        self.state.ledger_tail()
    }

    fn ledger_events(&self) -> Vec<LedgerEvent> {
        self.state.ledger_events()
    }

    fn ledger_events_for_rfq(&self, rfq_id: &str) -> Vec<LedgerEvent> {
        self.state.ledger_events_for_rfq(rfq_id)
    }

    fn ledger_events_since(&self, height: BlockHeight) -> Vec<LedgerEvent> {
        self.state.ledger_events_since(height)
    }

    fn next_sequence(&mut self) -> u64 {
        self.undo.push(Undo::Sequence(self.state.next_sequence));
        self.state.next_sequence()
    }

    fn put_ledger_event(&mut self, event: LedgerEvent) {
        let key = event.key.clone();
        let previous = self.state.insert_ledger(event);
        self.undo.push(Undo::Ledger(key, previous));
    }

    fn delete_ledger_events_above(&mut self, height: BlockHeight) -> Vec<LedgerEvent> {
        let doomed = self.state.delete_ledger_events_above(height);
        for event in &doomed {
            self.undo
                .push(Undo::Ledger(event.key.clone(), Some(event.clone())));
        }
        doomed
    }

    fn staging_event(&self, key: &EventKey) -> Option<StagingEvent> {
        self.state.staging_event(key)
    }

    fn staging_events(&self) -> Vec<StagingEvent> {
        self.state.staging_events()
    }

    fn put_staging_event(&mut self, event: StagingEvent) {
        let key = event.key.clone();
        let previous = self.state.staging.insert(key.clone(), event);
        self.undo.push(Undo::Staging(key, previous));
    }

    fn delete_staging_event(&mut self, key: &EventKey) -> bool {
        match self.state.staging.remove(key) {
            Some(removed) => {
                self.undo.push(Undo::Staging(key.clone(), Some(removed)));
                true
            }
            None => false,
        }
    }

    fn delete_staging_events_above(&mut self, height: BlockHeight) -> Vec<StagingEvent> {
        let removed = self.state.delete_staging_events_above(height);
        for event in &removed {
            self.undo
                .push(Undo::Staging(event.key.clone(), Some(event.clone())));
        }
        removed
    }

    fn delete_staging_events_through(&mut self, height: BlockHeight) -> Vec<StagingEvent> {
        let removed = self.state.delete_staging_events_through(height);
        for event in &removed {
            self.undo
                .push(Undo::Staging(event.key.clone(), Some(event.clone())));
        }
        removed
    }

    fn checkpoint(&self, height: BlockHeight) -> Option<Checkpoint> {
        self.state.checkpoint(height)
    }

    fn checkpoints(&self) -> Vec<Checkpoint> {
        self.state.checkpoints()
    }

    fn put_checkpoint(&mut self, checkpoint: Checkpoint) {
        let height = checkpoint.block_height;
        let previous = self.state.checkpoints.insert(height, checkpoint);
        self.undo.push(Undo::Checkpoint(height, previous));
    }

    fn delete_checkpoints_above(&mut self, height: BlockHeight) -> Vec<Checkpoint> {
        let dropped = self.state.delete_checkpoints_above(height);
        for checkpoint in &dropped {
            self.undo.push(Undo::Checkpoint(
                checkpoint.block_height,
                Some(checkpoint.clone()),
            ));
        }
        dropped
    }

    fn drop_rfq_state(&mut self, rfq_id: &str) {
        let state = &*self.state;
        let mut undo = vec![
            Undo::Rfq(rfq_id.to_string(), state.rfqs.get(rfq_id).cloned()),
            Undo::Escrow(rfq_id.to_string(), state.escrows.get(rfq_id).cloned()),
        ];
        undo.extend(
            state
                .bids
                .values()
                .filter(|b| b.rfq_id == rfq_id)
                .map(|b| Undo::Bid(b.id.clone(), Some(b.clone()))),
        );
        if state.payments.iter().any(|p| p.rfq_id == rfq_id) {
            undo.push(Undo::Payments(state.payments.clone()));
        }
        self.undo.extend(undo);
        self.state.drop_rfq_state(rfq_id);
    }

    fn payments_for(&self, rfq_id: &str) -> Vec<Payment> {
        self.state.payments_for(rfq_id)
    }

    fn push_reorg(&mut self, record: ReorgRecord) {
        self.undo.push(Undo::ReorgPushed);
        self.state.push_reorg(record);
    }

    fn reorgs(&self) -> Vec<ReorgRecord> {
        self.state.reorgs()
    }
}

/// In-memory implementation of [`EventStore`].
#[derive(Default)]
pub struct InMemoryEventStore {
    state: Mutex<State>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn transaction<T, F>(&self, f: F) -> ProcessorResult<T>
    where
        T: Send,
        F: FnOnce(&mut dyn EventTxn) -> ProcessorResult<T> + Send,
    {
        let mut guard = self.state.lock();
        let mut journal = Journal::new(&mut guard);
        match f(&mut journal) {
            Ok(out) => Ok(out),
            Err(e) => {
                journal.revert();
                Err(e)
            }
        }
    }

    async fn read<T, F>(&self, f: F) -> ProcessorResult<T>
    where
        T: Send,
        F: FnOnce(&dyn EventTxn) -> ProcessorResult<T> + Send,
    {
        let guard = self.state.lock();
        f(&*guard)
    }
}
