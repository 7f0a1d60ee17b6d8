//! Keyed ephemeral store
//!
//! Short-lived string values with a TTL, shared by every in-flight upload.
//! Rate-limit counters and integrity records both live here.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use upgate_core::AppError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Value under key '{0}' is not a counter")]
    NotACounter(String),

    #[error("Store shard full ({max_entries} live entries)")]
    CapacityExceeded { max_entries: usize },

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err.to_string())
    }
}

/// Key/value store whose entries expire.
///
/// Expired entries are invisible to every operation even before they are
/// physically removed. `increment` and `set` are atomic per key.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Add one to the counter under `key` and return the new count.
    ///
    /// A missing or expired key starts at 1 with a fresh `ttl`. An existing
    /// counter keeps its original expiry, so the window is anchored at the
    /// first increment.
    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64>;

    /// Time left before `key` expires, `None` when absent.
    async fn ttl_remaining(&self, key: &str) -> StoreResult<Option<Duration>>;

    async fn remove(&self, key: &str) -> StoreResult<()>;
}
