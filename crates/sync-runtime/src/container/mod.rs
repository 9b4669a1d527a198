//! # Subsystem Container
//!
//! Central container holding every subsystem instance with its adapters.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, RuntimeConfig};
pub use subsystems::{ConcreteNonceManager, ConcreteProcessor, ConcreteTracker, SyncContainer};
