//! Reconciliation pass report.

use serde::{Deserialize, Serialize};
use shared_types::{ExternalRef, Timestamp};

/// What reconciliation did (or found) for one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationAction {
    /// SUBMITTED moved to CONFIRMED.
    Confirmed,
    /// SUBMITTED moved to REJECTED.
    Rejected,
    /// Ledger still reports the transaction as pending.
    StillPending,
    /// Ledger does not know the reference yet.
    NotFound,
    /// Bypassed PREPARED attempt caught up to CONFIRMED.
    BypassConfirmed,
    /// Bypassed PREPARED attempt caught up to SUBMITTED; the block is not
    /// known yet.
    BypassSubmitted,
    /// The executing transaction already belongs to another attempt.
    AlreadyTracked,
    /// Confirmed ledger effect with no tracked attempt.
    PhantomExecution,
    Failed,
}

impl ReconciliationAction {
    pub fn is_heal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::Rejected | Self::BypassConfirmed | Self::BypassSubmitted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::StillPending => "still_pending",
            Self::NotFound => "not_found",
            Self::BypassConfirmed => "bypass_confirmed",
            Self::BypassSubmitted => "bypass_submitted",
            Self::AlreadyTracked => "already_tracked",
            Self::PhantomExecution => "phantom_execution",
            Self::Failed => "failed",
        }
    }
}

/// One line of the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationDetail {
    pub idempotency_key: Option<String>,
    pub external_ref: Option<ExternalRef>,
    pub action: ReconciliationAction,
    pub reason: String,
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    /// Tracked attempts examined.
    pub checked: usize,
    /// Attempts moved to ledger truth.
    pub healed: usize,
    /// Items whose reconciliation raised an error.
    pub failed: usize,
    pub phantoms: usize,
    /// Filled by the scheduler's expiry sweep.
    pub expired: usize,
    pub details: Vec<ReconciliationDetail>,
}

impl ReconciliationReport {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            started_at,
            ..Self::default()
        }
    }

    /// Record a detail and bump the matching counter.
    pub fn record(&mut self, detail: ReconciliationDetail) {
        match detail.action {
            ReconciliationAction::Failed => self.failed += 1,
            ReconciliationAction::PhantomExecution => self.phantoms += 1,
            action if action.is_heal() => self.healed += 1,
            _ => {}
        }
        self.details.push(detail);
    }

    pub fn count(&self, action: ReconciliationAction) -> usize {
        self.details.iter().filter(|d| d.action == action).count()
    }
}
