//! In-process key-value store with hard expiry and snapshot persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{self, SharedClock};
use crate::observability::metrics;
use crate::store::{KvStore, StoreResult};

/// A stored value and its hard-expiry deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredValue {
    pub value: Vec<u8>,
    /// Expiry timestamp (unix milliseconds); `None` never expires.
    pub expires_at: Option<u64>,
}

impl StoredValue {
    /// Check if the value is still present at `now_ms`.
    pub fn is_live(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(deadline) => deadline > now_ms,
            None => true,
        }
    }
}

/// A thread-safe store backed by `DashMap`.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, StoredValue>>,
    clock: SharedClock,
    persistence_path: Option<String>,
}

impl MemoryStore {
    /// Create a new empty store on the system clock.
    pub fn new(persistence_path: Option<String>) -> Self {
        Self::with_clock(clock::system(), persistence_path)
    }

    pub fn with_clock(clock: SharedClock, persistence_path: Option<String>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            clock,
            persistence_path,
        }
    }

    /// Load a snapshot from `path` if it exists. Expired entries are skipped.
    pub fn load_from_file(path: &str, clock: SharedClock) -> StoreResult<Self> {
        let store = Self::with_clock(clock, Some(path.to_string()));
        if Path::new(path).exists() {
            let file = File::open(path)?;
            let reader = BufReader::new(file);
            let map: HashMap<String, StoredValue> = serde_json::from_reader(reader)?;

            let now = store.clock.now_ms();
            for (k, v) in map.into_iter().filter(|(_, v)| v.is_live(now)) {
                store.inner.insert(k, v);
            }
            metrics::record_store_size(store.inner.len());
            tracing::info!(path = %path, entries = store.inner.len(), "Loaded store snapshot");
        }
        Ok(store)
    }

    /// Write live entries to the persistence path, if one is configured.
    pub fn save_to_file(&self) -> StoreResult<()> {
        if let Some(path) = &self.persistence_path {
            self.purge_expired();
            let file = File::create(path)?;
            let writer = BufWriter::new(file);

            let map: HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();

            serde_json::to_writer(writer, &map)?;
            tracing::info!(path = %path, entries = map.len(), "Saved store snapshot");
        }
        Ok(())
    }

    /// Drop every entry past its hard expiry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.inner.len();
        self.inner.retain(|_, v| v.is_live(now));
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_store_size(self.inner.len());
        removed
    }

    /// Number of entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = self.clock.now_ms();
        if let Some(r) = self.inner.get(key) {
            if r.value().is_live(now) {
                return Ok(Some(r.value().value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Expired: evict lazily
        self.inner.remove_if(key, |_, v| !v.is_live(now));
        Ok(None)
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<()> {
        let expires_at = ttl.map(|t| self.clock.now_ms().saturating_add(clock::millis(t)));
        self.inner.insert(key.to_string(), StoredValue { value, expires_at });
        metrics::record_store_size(self.inner.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key);
        Ok(())
    }
}
