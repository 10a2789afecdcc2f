//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, percentages in range)
//! - Check cross-field requirements (http clearinghouse needs a URL)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{ClearinghouseMode, GatewayConfig};

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let breaker = &config.breaker;
    if breaker.timeout_ms == 0 {
        errors.push(ValidationError::new("breaker.timeout_ms", "must be greater than 0"));
    }
    if breaker.reset_timeout_ms == 0 {
        errors.push(ValidationError::new("breaker.reset_timeout_ms", "must be greater than 0"));
    }
    if !(1..=100).contains(&breaker.error_threshold_percentage) {
        errors.push(ValidationError::new(
            "breaker.error_threshold_percentage",
            "must be between 1 and 100",
        ));
    }
    if breaker.volume_threshold == 0 {
        errors.push(ValidationError::new("breaker.volume_threshold", "must be at least 1"));
    }
    if breaker.rolling_window_ms == 0 {
        errors.push(ValidationError::new("breaker.rolling_window_ms", "must be greater than 0"));
    }
    if breaker.rolling_buckets == 0 || u64::from(breaker.rolling_buckets) > breaker.rolling_window_ms {
        errors.push(ValidationError::new(
            "breaker.rolling_buckets",
            "must be between 1 and rolling_window_ms",
        ));
    }

    if config.retry.base_delay_ms == 0 && config.retry.max_retries > 0 {
        errors.push(ValidationError::new("retry.base_delay_ms", "must be greater than 0"));
    }

    if config.idempotency.ttl_secs == 0 {
        errors.push(ValidationError::new("idempotency.ttl_secs", "must be greater than 0"));
    }
    if config.idempotency.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "idempotency.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    let clearinghouse = &config.clearinghouse;
    if !(0.0..=1.0).contains(&clearinghouse.failure_rate) {
        errors.push(ValidationError::new(
            "clearinghouse.failure_rate",
            "must be between 0.0 and 1.0",
        ));
    }
    if clearinghouse.mode == ClearinghouseMode::Http
        && clearinghouse.url.as_deref().map_or(true, str::is_empty)
    {
        errors.push(ValidationError::new("clearinghouse.url", "required in http mode"));
    }

    if config.security.require_api_key && config.security.api_key.is_empty() {
        errors.push(ValidationError::new("security.api_key", "must not be empty"));
    }
    if config.rate_limit.enabled && config.rate_limit.requests_per_minute == 0 {
        errors.push(ValidationError::new(
            "rate_limit.requests_per_minute",
            "must be greater than 0",
        ));
    }

    if config.timeouts.request_secs.saturating_mul(1_000) <= breaker.timeout_ms {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must exceed breaker.timeout_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address {value:?}")));
    }
}
