//! # Domain Module
//!
//! Contract events, business aggregates, durable records and the audit hash
//! chain.

pub mod aggregates;
pub mod errors;
pub mod events;
pub mod hash_chain;
pub mod projection;
pub mod records;

pub use aggregates::*;
pub use errors::*;
pub use events::*;
pub use projection::{apply, EventMeta};
pub use records::*;
