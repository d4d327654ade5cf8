//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Root configuration for the booking resilience service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Public listener (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Circuit breaker thresholds shared by every protected upstream.
    pub breaker: BreakerConfig,

    /// Key-value store settings.
    pub store: StoreConfig,

    /// Bounded retry executor settings.
    pub retries: RetryConfig,

    /// Internal scraper service the upstream fetcher talks to.
    pub upstream: UpstreamConfig,

    /// Per data category cache and viability policy.
    pub categories: CategoriesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (whole handler) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 90,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// Seconds after the last failure before the breaker closes again.
    pub cooldown_secs: u64,
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            cooldown_secs: 120,
        }
    }
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Deadline for a single get/put/delete in milliseconds.
    pub op_timeout_ms: u64,

    /// Hard expiry for cache entries in seconds. Must exceed every fresh TTL.
    pub hard_ttl_secs: u64,

    /// Optional JSON snapshot loaded at startup and written on shutdown.
    pub persistence_path: Option<String>,
}

impl StoreConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn hard_ttl(&self) -> Duration {
        Duration::from_secs(self.hard_ttl_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            op_timeout_ms: 250,
            hard_ttl_secs: 24 * 60 * 60,
            persistence_path: None,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (first try included).
    pub max_attempts: u32,

    /// Per-attempt timeouts in milliseconds, non-decreasing.
    /// The last entry is reused when shorter than `max_attempts`.
    pub timeout_schedule_ms: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            timeout_schedule_ms: vec![20_000, 30_000],
        }
    }
}

/// Upstream (internal scraper service) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the scraper service.
    pub base_url: String,

    /// Outer deadline for one logical fetch, retries included, in seconds.
    pub fetch_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3001".to_string(),
            fetch_timeout_secs: 60,
        }
    }
}

/// The two data categories served by the booking integration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoriesConfig {
    /// Service and price catalog; changes rarely.
    #[serde(deserialize_with = "catalog_overrides")]
    pub catalog: CategoryConfig,

    /// Appointment availability; changes continuously.
    #[serde(deserialize_with = "availability_overrides")]
    pub availability: CategoryConfig,
}

impl CategoriesConfig {
    fn default_catalog() -> CategoryConfig {
        CategoryConfig {
            fresh_ttl_secs: 60 * 60,
            min_viable_items: 5,
            breaker: default_breaker(),
        }
    }

    fn default_availability() -> CategoryConfig {
        CategoryConfig {
            fresh_ttl_secs: 5 * 60,
            min_viable_items: 0,
            breaker: default_breaker(),
        }
    }
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            catalog: Self::default_catalog(),
            availability: Self::default_availability(),
        }
    }
}

/// Cache and viability policy for one data category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryConfig {
    /// Seconds an entry counts as fresh.
    pub fresh_ttl_secs: u64,

    /// Fetches returning fewer items are treated as failures.
    pub min_viable_items: usize,

    /// Name of the breaker guarding this category's upstream.
    pub breaker: String,
}

impl CategoryConfig {
    pub fn fresh_ttl(&self) -> Duration {
        Duration::from_secs(self.fresh_ttl_secs)
    }
}

/// A `[categories.*]` table; fields left out keep that category's defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryOverrides {
    fresh_ttl_secs: Option<u64>,
    min_viable_items: Option<usize>,
    breaker: Option<String>,
}

impl CategoryOverrides {
    fn apply(self, base: CategoryConfig) -> CategoryConfig {
        CategoryConfig {
            fresh_ttl_secs: self.fresh_ttl_secs.unwrap_or(base.fresh_ttl_secs),
            min_viable_items: self.min_viable_items.unwrap_or(base.min_viable_items),
            breaker: self.breaker.unwrap_or(base.breaker),
        }
    }
}

fn catalog_overrides<'de, D>(deserializer: D) -> Result<CategoryConfig, D::Error>
where
    D: Deserializer<'de>,
{
    CategoryOverrides::deserialize(deserializer)
        .map(|o| o.apply(CategoriesConfig::default_catalog()))
}

fn availability_overrides<'de, D>(deserializer: D) -> Result<CategoryConfig, D::Error>
where
    D: Deserializer<'de>,
{
    CategoryOverrides::deserialize(deserializer)
        .map(|o| o.apply(CategoriesConfig::default_availability()))
}

fn default_breaker() -> String {
    "booking-site".to_string()
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the pretty format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Default admin key; refused by validation once the admin listener is on.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
