//! Cross-subsystem integration tests.

pub mod fixtures;
pub mod pipeline;
pub mod properties;
pub mod scenarios;
