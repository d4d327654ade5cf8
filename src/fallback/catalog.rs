//! Hand-authored data of last resort.

use std::collections::HashMap;

/// Immutable per-key defaults, loaded once at startup.
///
/// Lookups never fail: unknown keys get the catalog-wide default.
#[derive(Debug, Clone)]
pub struct StaticFallbackCatalog<T> {
    entries: HashMap<String, T>,
    default: T,
}

impl<T: Clone> StaticFallbackCatalog<T> {
    /// A catalog answering `default` for every key.
    pub fn new(default: T) -> Self {
        Self {
            entries: HashMap::new(),
            default,
        }
    }

    /// Add a key-specific entry.
    pub fn with_entry(mut self, key: impl Into<String>, value: T) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> T {
        self.entries.get(key).unwrap_or(&self.default).clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}
