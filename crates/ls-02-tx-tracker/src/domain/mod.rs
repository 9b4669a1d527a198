//! # Domain Module
//!
//! Tracked transaction entity, state machine and error classification.

pub mod classify;
pub mod entities;
pub mod errors;
pub mod state_machine;

pub use classify::classify_error;
pub use entities::*;
pub use errors::*;
pub use state_machine::{allowed_transitions, check_transition, is_valid_transition};
