//! Tiered cache subsystem.
//!
//! # Data Flow
//! ```text
//! successful fetch
//!     → tiered.rs put (JSON-encode CacheEntry, fresh TTL + hard TTL)
//!     → KvStore
//!
//! request
//!     → tiered.rs read(policy)
//!     → entry.rs classifies fresh / stale at read time
//! ```
//!
//! # Design Decisions
//! - Staleness is a read-time classification, never a deletion
//! - The store's hard expiry outlives the fresh window so stale reads survive
//!   upstream outages
//! - Any store error, timeout or undecodable entry reads as a miss

pub mod entry;
pub mod tiered;

pub use entry::{CacheEntry, Freshness};
pub use tiered::{CacheError, ReadPolicy, TieredCache};
