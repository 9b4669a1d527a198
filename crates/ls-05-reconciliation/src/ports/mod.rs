//! # Ports
//!
//! - `inbound`: on-demand reconciliation
//! - `outbound`: ledger truth and the local confirmed-event feed

pub mod inbound;
pub mod outbound;

pub use inbound::ReconciliationApi;
pub use outbound::{ChainStateSource, ConfirmedEventFeed, MockChainState, MockEventFeed};
