//! # Outbound Ports
//!
//! Ledger queries used to heal tracked attempts, and the stream of locally
//! confirmed events used to spot executions nobody tracked. Both come with
//! scriptable mocks.

use crate::domain::{ActionExecution, ConfirmedEventRef, TxChainStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{BlockHeight, LedgerError};
use std::collections::HashMap;

/// Ledger truth for tracked attempts.
#[async_trait]
pub trait ChainStateSource: Send + Sync {
    async fn get_tx_status(&self, external_ref: &str) -> Result<TxChainStatus, LedgerError>;

    /// Whether the logical action behind `canonical_key` was executed,
    /// through this system or not.
    async fn was_action_executed(&self, canonical_key: &str)
        -> Result<ActionExecution, LedgerError>;
}

/// Confirmed events already ingested locally.
#[async_trait]
pub trait ConfirmedEventFeed: Send + Sync {
    /// Highest confirmed block, `None` before the first event.
    async fn latest_block(&self) -> Result<Option<BlockHeight>, LedgerError>;

    /// Confirmed events at or above `height`.
    async fn confirmed_since(&self, height: BlockHeight)
        -> Result<Vec<ConfirmedEventRef>, LedgerError>;
}

/// Scriptable ledger for tests. Unknown references report `NotFound`,
/// unknown actions report not executed.
#[derive(Default)]
pub struct MockChainState {
    statuses: Mutex<HashMap<String, TxChainStatus>>,
    executions: Mutex<HashMap<String, ActionExecution>>,
    failing_refs: Mutex<Vec<String>>,
    should_fail: bool,
}

impl MockChainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger whose every query fails with a network error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn set_status(&self, external_ref: &str, status: TxChainStatus) {
        self.statuses.lock().insert(external_ref.to_string(), status);
    }

    pub fn set_execution(&self, canonical_key: &str, execution: ActionExecution) {
        self.executions
            .lock()
            .insert(canonical_key.to_string(), execution);
    }

    /// Make queries for one reference fail.
    pub fn fail_ref(&self, external_ref: &str) {
        self.failing_refs.lock().push(external_ref.to_string());
    }

    fn check(&self, key: &str) -> Result<(), LedgerError> {
        if self.should_fail || self.failing_refs.lock().iter().any(|r| r == key) {
            return Err(LedgerError::network(format!("mock ledger unavailable for {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainStateSource for MockChainState {
    async fn get_tx_status(&self, external_ref: &str) -> Result<TxChainStatus, LedgerError> {
        self.check(external_ref)?;
        Ok(self
            .statuses
            .lock()
            .get(external_ref)
            .cloned()
            .unwrap_or(TxChainStatus::NotFound))
    }

    async fn was_action_executed(
        &self,
        canonical_key: &str,
    ) -> Result<ActionExecution, LedgerError> {
        self.check(canonical_key)?;
        Ok(self
            .executions
            .lock()
            .get(canonical_key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Fixed list of confirmed events for tests.
#[derive(Default)]
pub struct MockEventFeed {
    events: Mutex<Vec<ConfirmedEventRef>>,
    should_fail: bool,
}

impl MockEventFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed whose every query fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn add(&self, tx_id: &str, transition: &str, block_height: BlockHeight) {
        self.events.lock().push(ConfirmedEventRef {
            tx_id: tx_id.to_string(),
            transition: transition.to_string(),
            block_height,
        });
    }
}

#[async_trait]
impl ConfirmedEventFeed for MockEventFeed {
    async fn latest_block(&self) -> Result<Option<BlockHeight>, LedgerError> {
        if self.should_fail {
            return Err(LedgerError::transient("mock feed unavailable"));
        }
        Ok(self.events.lock().iter().map(|e| e.block_height).max())
    }

    async fn confirmed_since(
        &self,
        height: BlockHeight,
    ) -> Result<Vec<ConfirmedEventRef>, LedgerError> {
        if self.should_fail {
            return Err(LedgerError::transient("mock feed unavailable"));
        }
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.block_height >= height)
            .cloned()
            .collect())
    }
}
