//! Key-value store port.
//!
//! # Data Flow
//! ```text
//! circuit_breaker.rs ──┐
//!                      ├─→ KvStore (get / put / delete, bytes + ttl)
//! cache/tiered.rs ─────┘       └─→ memory.rs (DashMap, hard expiry, JSON snapshot)
//! ```
//!
//! # Design Decisions
//! - The store is shared by every request handler; no locking is attempted
//! - Values are opaque bytes; callers own the encoding
//! - Every call is bounded by a short timeout distinct from fetch timeouts
//! - Callers treat any error as "absent"

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::resilience::timeouts::TimedOut;

pub use memory::MemoryStore;

/// Errors raised by a key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store did not answer within the operation timeout.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backing store rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// Snapshot could not be read or written.
    #[error("store persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("store codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<TimedOut> for StoreError {
    fn from(t: TimedOut) -> Self {
        StoreError::Timeout(t.0)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Minimal key-value contract the controller depends on.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the raw bytes stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Overwrite `key`. `ttl` is a hard expiry enforced by the store.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Shared handle to a store.
pub type SharedStore = Arc<dyn KvStore>;
