//! Tracked transaction entity.
//!
//! One row per submission *attempt*. Retries of the same logical action share
//! a `canonical_key` but each gets its own `idempotency_key`.

use super::errors::TrackerResult;
use super::state_machine::check_transition;
use serde::{Deserialize, Serialize};
pub use shared_types::ErrorClass;
use shared_types::{ActionDescriptor, BlockHeight, ExternalRef, Timestamp};
use std::fmt;
use uuid::Uuid;

/// Attempt status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    /// Signable action handed to the caller, not yet broadcast.
    Prepared,
    /// Broadcast; ledger reference known.
    Submitted,
    /// Included in a block.
    Confirmed,
    /// Refused by the ledger.
    Rejected,
    /// Timed out before reaching a verdict.
    Expired,
}

impl TxStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [TxStatus; 5] = [
        TxStatus::Prepared,
        TxStatus::Submitted,
        TxStatus::Confirmed,
        TxStatus::Rejected,
        TxStatus::Expired,
    ];

    /// No further transitions allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Rejected | TxStatus::Expired)
    }

    /// Awaiting a verdict.
    pub fn is_active(&self) -> bool {
        matches!(self, TxStatus::Prepared | TxStatus::Submitted)
    }

    /// Position in the lifecycle; terminal states share the last rank.
    pub fn rank(&self) -> u8 {
        match self {
            TxStatus::Prepared => 0,
            TxStatus::Submitted => 1,
            TxStatus::Confirmed | TxStatus::Rejected | TxStatus::Expired => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Prepared => "PREPARED",
            TxStatus::Submitted => "SUBMITTED",
            TxStatus::Confirmed => "CONFIRMED",
            TxStatus::Rejected => "REJECTED",
            TxStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by the ledger or the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Verbatim error text.
    pub error: String,
    /// Ledger error code, `0` if none.
    pub error_code: i32,
    /// Pre-classified by the origin; `None` falls back to text heuristics.
    pub error_class: Option<ErrorClass>,
}

impl Rejection {
    pub fn new(error: impl Into<String>, error_code: i32, error_class: Option<ErrorClass>) -> Self {
        Self {
            error: error.into(),
            error_code,
            error_class,
        }
    }
}

/// One entry of the append-only status log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: TxStatus,
    pub at: Timestamp,
}

/// A single submission attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedTransaction {
    /// Record id.
    pub id: Uuid,
    /// Attempt identity. Globally unique.
    pub idempotency_key: String,
    /// Logical action identity. Shared by retries.
    pub canonical_key: String,
    pub transition_name: String,
    pub program_id: String,
    /// Opaque inputs from the action descriptor.
    pub inputs: serde_json::Value,
    pub fee: u64,

    pub status: TxStatus,
    pub status_history: Vec<StatusChange>,

    pub external_ref: Option<ExternalRef>,
    pub block_height: Option<BlockHeight>,
    pub block_hash: Option<String>,
    /// Last raw ledger / wallet response.
    pub raw_response: Option<serde_json::Value>,

    pub error: Option<String>,
    pub error_code: Option<i32>,
    pub error_class: Option<ErrorClass>,

    pub retry_count: u32,
    pub max_retries: u32,
    pub last_retry_at: Option<Timestamp>,
    pub last_reconciled_at: Option<Timestamp>,
    pub reconcile_attempts: u32,

    pub prepared_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub confirmed_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
    pub expired_at: Option<Timestamp>,
    pub expires_at: Timestamp,

    /// Write counter. Every committed change bumps it; the store swaps only
    /// against the revision that was read.
    pub revision: u64,
}

impl TrackedTransaction {
    /// New PREPARED attempt.
    pub fn prepared(
        action: &ActionDescriptor,
        canonical_key: impl Into<String>,
        idempotency_key: impl Into<String>,
        now: Timestamp,
        ttl_ms: u64,
        max_retries: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            idempotency_key: idempotency_key.into(),
            canonical_key: canonical_key.into(),
            transition_name: action.function.clone(),
            program_id: action.program.clone(),
            inputs: action.inputs.clone(),
            fee: action.fee,
            status: TxStatus::Prepared,
            status_history: vec![StatusChange {
                status: TxStatus::Prepared,
                at: now,
            }],
            external_ref: None,
            block_height: None,
            block_hash: None,
            raw_response: None,
            error: None,
            error_code: None,
            error_class: None,
            retry_count: 0,
            max_retries,
            last_retry_at: None,
            last_reconciled_at: None,
            reconcile_attempts: 0,
            prepared_at: now,
            submitted_at: None,
            confirmed_at: None,
            rejected_at: None,
            expired_at: None,
            expires_at: now.saturating_add(ttl_ms),
            revision: 0,
        }
    }

    /// Apply a state-machine move: status, history entry and the matching
    /// timestamp. Fails without touching `self` if the move is not allowed.
    pub fn transition_to(&mut self, to: TxStatus, now: Timestamp) -> TrackerResult<()> {
        check_transition(self.status, to)?;
        self.status = to;
        self.status_history.push(StatusChange { status: to, at: now });
        match to {
            TxStatus::Submitted => self.submitted_at = Some(now),
            TxStatus::Confirmed => self.confirmed_at = Some(now),
            TxStatus::Rejected => self.rejected_at = Some(now),
            TxStatus::Expired => self.expired_at = Some(now),
            TxStatus::Prepared => {}
        }
        Ok(())
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.status.is_active() && self.expires_at <= now
    }

    /// Retry rule: REJECTED, retryable class, budget left.
    pub fn can_retry(&self) -> bool {
        self.status == TxStatus::Rejected
            && self.error_class.map(|c| c.is_retryable()).unwrap_or(false)
            && self.retry_count < self.max_retries
    }

    /// Idempotency key of the next retry attempt.
    pub fn next_retry_key(&self) -> String {
        self.retry_key(self.retry_count + 1)
    }

    /// Idempotency key of retry number `n`.
    pub fn retry_key(&self, n: u32) -> String {
        format!("{}_retry_{n}", self.idempotency_key)
    }
}

/// Issued by `begin_retry`: the caller prepares a fresh attempt under this key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryTicket {
    pub new_idempotency_key: String,
    pub canonical_key: String,
    pub retry_count: u32,
}

/// Status view returned by batch lookups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status_kind", rename_all = "snake_case")]
pub enum TxStatusEntry {
    Found {
        id: Uuid,
        status: TxStatus,
        prepared_at: Timestamp,
        submitted_at: Option<Timestamp>,
        confirmed_at: Option<Timestamp>,
        rejected_at: Option<Timestamp>,
        expired_at: Option<Timestamp>,
        block_height: Option<BlockHeight>,
        error: Option<String>,
        error_code: Option<i32>,
    },
    NotFound,
}

impl From<&TrackedTransaction> for TxStatusEntry {
    fn from(tx: &TrackedTransaction) -> Self {
        TxStatusEntry::Found {
            id: tx.id,
            status: tx.status,
            prepared_at: tx.prepared_at,
            submitted_at: tx.submitted_at,
            confirmed_at: tx.confirmed_at,
            rejected_at: tx.rejected_at,
            expired_at: tx.expired_at,
            block_height: tx.block_height,
            error: tx.error.clone(),
            error_code: tx.error_code,
        }
    }
}

/// Outcome of an expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirySweep {
    /// Active rows past `expires_at`.
    pub found: usize,
    /// Rows moved to EXPIRED.
    pub expired: usize,
    /// Rows whose transition failed (logged, skipped).
    pub failed: usize,
}
