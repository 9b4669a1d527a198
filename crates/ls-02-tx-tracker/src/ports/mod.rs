//! # Ports
//!
//! - `inbound`: tracker API used by the caller layer and reconciliation
//! - `outbound`: record storage dependency

pub mod inbound;
pub mod outbound;

pub use inbound::TransactionTrackerApi;
pub use outbound::TransactionStore;
