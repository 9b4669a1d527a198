//! Error types for reconciliation.
//!
//! These never leave a pass: each one is caught per row, counted and
//! written into the report.

use ls_02_tx_tracker::TrackerError;
use shared_types::LedgerError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Ledger query failed: {0}")]
    Ledger(#[from] LedgerError),

    /// SUBMITTED record without a ledger reference.
    #[error("No external reference on {idempotency_key}")]
    MissingExternalRef { idempotency_key: String },
}

pub type ReconciliationResult<T> = Result<T, ReconciliationError>;
