//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, timeouts > 0)
//! - Check cross-field constraints (hard TTL outlives fresh TTL, schedule order)
//! - Keep the request timeout above the longest a resolve can take
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{CategoryConfig, ServiceConfig, PLACEHOLDER_ADMIN_KEY};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "breaker.failure_threshold",
            "must be at least 1",
        ));
    }
    if config.breaker.cooldown_secs == 0 {
        errors.push(ValidationError::new("breaker.cooldown_secs", "must be positive"));
    }

    if config.store.op_timeout_ms == 0 {
        errors.push(ValidationError::new("store.op_timeout_ms", "must be positive"));
    }

    validate_category("categories.catalog", &config.categories.catalog, config, &mut errors);
    validate_category(
        "categories.availability",
        &config.categories.availability,
        config,
        &mut errors,
    );

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if retries.timeout_schedule_ms.is_empty() {
        errors.push(ValidationError::new(
            "retries.timeout_schedule_ms",
            "must contain at least one timeout",
        ));
    }
    if retries.timeout_schedule_ms.contains(&0) {
        errors.push(ValidationError::new(
            "retries.timeout_schedule_ms",
            "timeouts must be positive",
        ));
    }
    if retries.timeout_schedule_ms.windows(2).any(|w| w[1] < w[0]) {
        errors.push(ValidationError::new(
            "retries.timeout_schedule_ms",
            "timeouts must be non-decreasing",
        ));
    }

    if url::Url::parse(&config.upstream.base_url).is_err() {
        errors.push(ValidationError::new(
            "upstream.base_url",
            format!("'{}' is not a valid URL", config.upstream.base_url),
        ));
    }
    let worst_case_ms: u64 = (0..retries.max_attempts as usize)
        .filter_map(|i| {
            retries
                .timeout_schedule_ms
                .get(i)
                .or(retries.timeout_schedule_ms.last())
        })
        .sum();
    if config.upstream.fetch_timeout_secs.saturating_mul(1000) < worst_case_ms {
        errors.push(ValidationError::new(
            "upstream.fetch_timeout_secs",
            format!("must cover the full retry schedule ({worst_case_ms} ms)"),
        ));
    }

    // Breaker read, cache read, cache write and breaker save each get one
    // store timeout around the fetch
    let resolve_budget_ms = config
        .upstream
        .fetch_timeout_secs
        .saturating_mul(1000)
        .saturating_add(config.store.op_timeout_ms.saturating_mul(4));
    if config.listener.request_timeout_secs.saturating_mul(1000) <= resolve_budget_ms {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            format!("must exceed the worst-case resolve time ({resolve_budget_ms} ms)"),
        ));
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        } else if key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "still set to the placeholder; choose a real key",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_category(
    field: &str,
    category: &CategoryConfig,
    config: &ServiceConfig,
    errors: &mut Vec<ValidationError>,
) {
    if category.fresh_ttl_secs == 0 {
        errors.push(ValidationError::new(
            format!("{field}.fresh_ttl_secs"),
            "must be positive",
        ));
    }
    if config.store.hard_ttl_secs <= category.fresh_ttl_secs {
        errors.push(ValidationError::new(
            "store.hard_ttl_secs",
            format!("must exceed {field}.fresh_ttl_secs so stale reads stay possible"),
        ));
    }
    if category.breaker.trim().is_empty() {
        errors.push(ValidationError::new(format!("{field}.breaker"), "must not be empty"));
    }
}
