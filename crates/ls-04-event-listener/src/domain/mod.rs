//! # Domain Module
//!
//! Backoff state, listener statistics and errors.

pub mod backoff;
pub mod errors;
pub mod stats;

pub use backoff::PollBackoff;
pub use errors::*;
pub use stats::{CatchUpReport, ListenerStats};
