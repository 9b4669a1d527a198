//! # Domain Module
//!
//! Core types for nonce tracking.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
