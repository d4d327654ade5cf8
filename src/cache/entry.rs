//! Cached values and their freshness window.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A previously fetched value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    /// Unix milliseconds when the value was fetched.
    pub stored_at: u64,
    /// How long the entry counts as fresh, in milliseconds.
    pub fresh_ttl_ms: u64,
}

/// Read-time classification of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, stored_at: u64, fresh_ttl: Duration) -> Self {
        Self {
            value,
            stored_at,
            fresh_ttl_ms: crate::clock::millis(fresh_ttl),
        }
    }

    /// `now - stored_at < fresh_ttl`.
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.stored_at) < self.fresh_ttl_ms
    }

    pub fn freshness(&self, now_ms: u64) -> Freshness {
        if self.is_fresh(now_ms) {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }

    /// Milliseconds since the value was fetched.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.stored_at)
    }
}
