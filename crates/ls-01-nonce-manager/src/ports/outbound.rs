//! Driven port: durable nonce storage.
//!
//! Implementations must make `increment` and `increment_once` atomic per key
//! and `set_many` atomic across keys; the service holds no in-process locks.

use crate::domain::{NonceKey, NonceResult};
use async_trait::async_trait;

/// Durable per-key counter storage.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Stored value, `0` if the key was never written.
    async fn get(&self, key: &NonceKey) -> NonceResult<u64>;

    /// Atomically add one and return the new value.
    async fn increment(&self, key: &NonceKey) -> NonceResult<u64>;

    /// Atomically add one unless `attempt_id` already consumed a nonce for
    /// this key. Returns the new value, or `None` on a repeat.
    async fn increment_once(&self, key: &NonceKey, attempt_id: &str) -> NonceResult<Option<u64>>;

    /// Overwrite the stored value.
    async fn set(&self, key: &NonceKey, value: u64) -> NonceResult<()>;

    /// Overwrite every listed value in one write. On error no value changed.
    async fn set_many(&self, values: &[(NonceKey, u64)]) -> NonceResult<()>;
}
