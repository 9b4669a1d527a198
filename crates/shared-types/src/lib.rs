//! # Shared Types Crate
//!
//! Cross-subsystem types for the Ledger-Sync workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: types used by more than one subsystem live here.
//! - **Opaque Actions**: the core never interprets an action's inputs; it only
//!   carries them through to storage and back.
//! - **Injected Time**: every subsystem reads the clock through [`TimeSource`]
//!   so tests can drive expiry and grace windows deterministically.

pub mod entities;
pub mod errors;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use time::*;
