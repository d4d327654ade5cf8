//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: fetch attempts permitted
//! - Open: upstream assumed down, callers go straight to cache/fallback
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Closed: now - last_failure_at > cooldown (time-based, no half-open trial)
//! Any → Closed: successful fetch (reset) or admin reset
//! ```
//!
//! # Design Decisions
//! - One breaker per protected upstream, shared through the key-value store
//! - State is read-modify-written without locking; the counter is approximate
//!   and a lost increment only delays tripping
//! - Store errors read as a closed breaker with no failures

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::clock::{self, SharedClock};
use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::within;
use crate::store::{SharedStore, StoreError};

/// Persisted breaker record.
///
/// `consecutive_failures` is a best-effort counter: concurrent writers may
/// overwrite each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitState {
    pub consecutive_failures: u32,
    /// Unix milliseconds of the most recent failure.
    pub last_failure_at: Option<u64>,
}

impl CircuitState {
    /// True once the last failure is older than `cooldown`.
    fn cooled_down(&self, now_ms: u64, cooldown: Duration) -> bool {
        match self.last_failure_at {
            Some(at) => now_ms.saturating_sub(at) > clock::millis(cooldown),
            None => true,
        }
    }
}

/// Logical breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerPosition {
    Closed,
    Open,
}

/// Point-in-time view of a breaker for admin and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub position: BreakerPosition,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<u64>,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

/// A failure-count breaker whose state lives in a shared store.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    store: SharedStore,
    clock: SharedClock,
    config: BreakerConfig,
    op_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        store: SharedStore,
        clock: SharedClock,
        config: BreakerConfig,
        op_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            clock,
            config,
            op_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_threshold(&self) -> u32 {
        self.config.failure_threshold
    }

    fn key(&self) -> String {
        format!("circuit:{}", self.name)
    }

    /// Whether `state` counts as open. Does not consider the cooldown.
    pub fn trips(&self, state: &CircuitState) -> bool {
        state.consecutive_failures >= self.config.failure_threshold
    }

    /// Read the persisted state; a missing or unreadable record is closed.
    pub async fn state(&self) -> CircuitState {
        match self.load().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(breaker = %self.name, error = %e, "Breaker state unreadable, assuming closed");
                CircuitState::default()
            }
        }
    }

    /// Check whether fetch attempts are currently suppressed.
    ///
    /// A state whose last failure is older than the cooldown is cleared as a
    /// side effect and reads as closed.
    pub async fn is_open(&self) -> bool {
        let state = self.state().await;
        if state.consecutive_failures == 0 {
            return false;
        }

        if state.cooled_down(self.clock.now_ms(), self.config.cooldown()) {
            if self.trips(&state) {
                tracing::info!(breaker = %self.name, "Cooldown elapsed, closing circuit");
            }
            self.clear().await;
            metrics::record_breaker_state(&self.name, false);
            return false;
        }

        self.trips(&state)
    }

    /// Count one upstream failure and return the resulting state.
    pub async fn record_failure(&self) -> CircuitState {
        let now = self.clock.now_ms();
        let previous = self.state().await;

        // A streak whose last failure has cooled down starts over
        let base = if previous.cooled_down(now, self.config.cooldown()) {
            0
        } else {
            previous.consecutive_failures
        };

        let next = CircuitState {
            consecutive_failures: base.saturating_add(1),
            last_failure_at: Some(now),
        };

        if let Err(e) = self.save(&next).await {
            tracing::warn!(breaker = %self.name, error = %e, "Failed to persist breaker failure");
        }

        if self.trips(&next) && base < self.config.failure_threshold {
            tracing::warn!(
                breaker = %self.name,
                failures = next.consecutive_failures,
                cooldown_secs = self.config.cooldown_secs,
                "Circuit opened"
            );
            metrics::record_breaker_trip(&self.name);
            metrics::record_breaker_state(&self.name, true);
        } else {
            tracing::debug!(breaker = %self.name, failures = next.consecutive_failures, "Upstream failure recorded");
        }

        next
    }

    /// Clear the failure streak after a successful fetch.
    pub async fn reset(&self) {
        let had_failures = self.state().await.consecutive_failures > 0;
        self.clear().await;
        if had_failures {
            tracing::info!(breaker = %self.name, "Upstream recovered, circuit reset");
        }
        metrics::record_breaker_state(&self.name, false);
    }

    /// Force the breaker open from now on, as an operator action.
    pub async fn trip(&self) -> CircuitState {
        let state = CircuitState {
            consecutive_failures: self.config.failure_threshold.max(1),
            last_failure_at: Some(self.clock.now_ms()),
        };
        if let Err(e) = self.save(&state).await {
            tracing::warn!(breaker = %self.name, error = %e, "Failed to persist manual trip");
        }
        tracing::warn!(breaker = %self.name, "Circuit opened manually");
        metrics::record_breaker_trip(&self.name);
        metrics::record_breaker_state(&self.name, true);
        state
    }

    /// Current view of the breaker, cooldown applied.
    pub async fn snapshot(&self) -> BreakerSnapshot {
        let open = self.is_open().await;
        let state = self.state().await;
        BreakerSnapshot {
            name: self.name.clone(),
            position: if open {
                BreakerPosition::Open
            } else {
                BreakerPosition::Closed
            },
            consecutive_failures: state.consecutive_failures,
            last_failure_at: state.last_failure_at,
            failure_threshold: self.config.failure_threshold,
            cooldown_secs: self.config.cooldown_secs,
        }
    }

    async fn load(&self) -> Result<CircuitState, StoreError> {
        let raw = within(self.op_timeout, self.store.get(&self.key())).await?;
        match raw {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(CircuitState::default()),
        }
    }

    async fn save(&self, state: &CircuitState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(state)?;
        // Keep the record a little past the cooldown so stale streaks vanish
        let ttl = self.config.cooldown().checked_mul(2).unwrap_or(Duration::MAX);
        within(self.op_timeout, self.store.put(&self.key(), bytes, Some(ttl))).await
    }

    async fn clear(&self) {
        if let Err(e) = within(self.op_timeout, self.store.delete(&self.key())).await {
            tracing::warn!(breaker = %self.name, error = %e, "Failed to clear breaker state");
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("failure_threshold", &self.config.failure_threshold)
            .field("cooldown_secs", &self.config.cooldown_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{KvStore, MemoryStore, StoreResult};
    use std::sync::Arc;

    fn breaker(clock: &ManualClock) -> CircuitBreaker {
        let clock: SharedClock = Arc::new(clock.clone());
        let store = Arc::new(MemoryStore::with_clock(clock.clone(), None));
        CircuitBreaker::new(
            "booking-site",
            store,
            clock,
            BreakerConfig {
                failure_threshold: 2,
                cooldown_secs: 120,
            },
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn test_trips_at_threshold() {
        let clock = ManualClock::new(1_000_000);
        let cb = breaker(&clock);

        assert!(!cb.is_open().await);
        cb.record_failure().await;
        assert!(!cb.is_open().await);
        let state = cb.record_failure().await;
        assert_eq!(state.consecutive_failures, 2);
        assert!(cb.is_open().await);
    }

    #[tokio::test]
    async fn test_recovers_after_cooldown() {
        let clock = ManualClock::new(1_000_000);
        let cb = breaker(&clock);
        cb.record_failure().await;
        cb.record_failure().await;

        clock.advance(Duration::from_secs(120));
        // Boundary: still open at exactly the cooldown
        assert!(cb.is_open().await);

        clock.advance(Duration::from_millis(1));
        assert!(!cb.is_open().await);
        // Cleared as a side effect
        assert_eq!(cb.state().await, CircuitState::default());
    }

    #[tokio::test]
    async fn test_reset_clears_streak() {
        let clock = ManualClock::new(1_000_000);
        let cb = breaker(&clock);
        cb.record_failure().await;
        cb.record_failure().await;
        cb.record_failure().await;

        cb.reset().await;
        assert_eq!(cb.state().await.consecutive_failures, 0);
        assert!(!cb.is_open().await);
    }

    #[tokio::test]
    async fn test_stale_streak_restarts() {
        let clock = ManualClock::new(1_000_000);
        let cb = breaker(&clock);
        cb.record_failure().await;

        clock.advance(Duration::from_secs(121));
        let state = cb.record_failure().await;
        assert_eq!(state.consecutive_failures, 1);
        assert!(!cb.is_open().await);
    }

    #[tokio::test]
    async fn test_manual_trip_and_snapshot() {
        let clock = ManualClock::new(1_000_000);
        let cb = breaker(&clock);

        let snap = cb.snapshot().await;
        assert_eq!(snap.position, BreakerPosition::Closed);

        cb.trip().await;
        let snap = cb.snapshot().await;
        assert_eq!(snap.position, BreakerPosition::Open);
        assert_eq!(snap.consecutive_failures, 2);
        assert_eq!(snap.last_failure_at, Some(1_000_000));
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl KvStore for BrokenStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> StoreResult<()> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn delete(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Backend("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_broken_store_reads_closed() {
        let clock: SharedClock = Arc::new(ManualClock::new(1_000_000));
        let cb = CircuitBreaker::new(
            "booking-site",
            Arc::new(BrokenStore),
            clock,
            BreakerConfig::default(),
            Duration::from_millis(100),
        );

        assert!(!cb.is_open().await);
        // The failed save is skipped; the returned state still counts it
        assert_eq!(cb.record_failure().await.consecutive_failures, 1);
        cb.record_failure().await;
        assert!(!cb.is_open().await);
        cb.reset().await;
        assert_eq!(cb.snapshot().await.position, BreakerPosition::Closed);
    }

    #[tokio::test]
    async fn test_huge_cooldown_does_not_overflow() {
        let clock = ManualClock::new(1_000_000);
        let shared: SharedClock = Arc::new(clock.clone());
        let cb = CircuitBreaker::new(
            "booking-site",
            Arc::new(MemoryStore::with_clock(shared.clone(), None)),
            shared,
            BreakerConfig {
                failure_threshold: 1,
                cooldown_secs: u64::MAX,
            },
            Duration::from_millis(100),
        );

        cb.record_failure().await;
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert!(cb.is_open().await);
    }
}
