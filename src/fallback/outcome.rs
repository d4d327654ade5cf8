//! Result of one pass through the fallback chain.

use serde::{Deserialize, Serialize};

/// Which tier of the fallback chain produced the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Fetched from upstream during this request.
    FreshFetch,
    /// Cached and still inside its fresh window.
    FreshCache,
    /// Cached but past its fresh window.
    StaleCache,
    /// Hand-authored default; every dynamic source failed.
    StaticFallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::FreshFetch => "fresh_fetch",
            Provenance::FreshCache => "fresh_cache",
            Provenance::StaleCache => "stale_cache",
            Provenance::StaticFallback => "static_fallback",
        }
    }

    /// Whether the data may be out of date.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Provenance::StaleCache | Provenance::StaticFallback)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data plus how it was obtained. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome<T> {
    pub data: T,
    pub provenance: Provenance,
    pub circuit_breaker_active: bool,
}

impl<T> FetchOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        FetchOutcome {
            data: f(self.data),
            provenance: self.provenance,
            circuit_breaker_active: self.circuit_breaker_active,
        }
    }
}
