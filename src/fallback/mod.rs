//! Fallback chain orchestration.
//!
//! # Data Flow
//! ```text
//! resolve(key, fetch)
//!     → breaker open?  ── yes ──→ cache (stale allowed) → static catalog
//!     │ no
//!     → fetch (timeout-bounded)
//!         ├─ viable   → cache put → breaker reset → fresh_fetch
//!         └─ failure  → breaker record_failure → cache (stale allowed) → static catalog
//! ```
//!
//! # Design Decisions
//! - `resolve` is infallible by type; the static catalog is pure in-memory data
//! - Steps run strictly in order; the fetch is never raced against the cache
//! - A degenerate result (below the viability check) is a failure, not a success
//! - One parameterized chain per data category

pub mod catalog;
pub mod orchestrator;
pub mod outcome;

pub use catalog::StaticFallbackCatalog;
pub use orchestrator::{min_items, FallbackChain, Viability};
pub use outcome::{FetchOutcome, Provenance};
