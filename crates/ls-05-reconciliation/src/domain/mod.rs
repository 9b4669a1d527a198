//! # Domain Module
//!
//! Ledger truth as seen by reconciliation, the pass report and errors.

pub mod chain;
pub mod errors;
pub mod report;

pub use chain::{ActionExecution, ConfirmedEventRef, TxChainStatus};
pub use errors::*;
pub use report::{ReconciliationAction, ReconciliationDetail, ReconciliationReport};
