//! One-way transaction status machine.
//!
//! ```text
//! [PREPARED] ──submit──→ [SUBMITTED] ──confirm──→ [CONFIRMED]
//!     │                       │
//!     │                       ├──reject──→ [REJECTED]
//!     │                       │
//!     └──────expire───────────┴──expire──→ [EXPIRED]
//! ```
//!
//! Terminal states have no outgoing edges. No edge ever points backwards.

use super::entities::TxStatus;
use super::errors::{TrackerError, TrackerResult};

/// Outgoing edges of `from`.
pub fn allowed_transitions(from: TxStatus) -> &'static [TxStatus] {
    match from {
        TxStatus::Prepared => &[TxStatus::Submitted, TxStatus::Expired],
        TxStatus::Submitted => &[TxStatus::Confirmed, TxStatus::Rejected, TxStatus::Expired],
        TxStatus::Confirmed | TxStatus::Rejected | TxStatus::Expired => &[],
    }
}

/// True if `from -> to` is an edge of the table.
pub fn is_valid_transition(from: TxStatus, to: TxStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Fails with `InvalidTransition` for any move not in the table.
pub fn check_transition(from: TxStatus, to: TxStatus) -> TrackerResult<()> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(TrackerError::InvalidTransition { from, to })
    }
}
