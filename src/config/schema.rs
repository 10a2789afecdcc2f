//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the eligibility gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for the HTTP surface.
    pub timeouts: TimeoutConfig,

    /// Circuit breaker guarding the verification call.
    pub breaker: BreakerConfig,

    /// Retry policy applied inside the breaker.
    pub retry: RetryConfig,

    /// Idempotency cache settings.
    pub idempotency: IdempotencyConfig,

    /// Where queued requests are spooled.
    pub spool: SpoolConfig,

    /// Upstream clearinghouse (the verification operation).
    pub clearinghouse: ClearinghouseConfig,

    /// Caller authentication and request hygiene.
    pub security: SecurityConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for a request/response in seconds.
    ///
    /// Must exceed `breaker.timeout_ms`, otherwise callers are cut off before
    /// the fallback can spool their request.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Circuit breaker configuration.
///
/// Every field can be overridden from the environment (`CB_*`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Deadline for the whole retrying sequence, in milliseconds (`CB_TIMEOUT`).
    pub timeout_ms: u64,

    /// Time spent OPEN before a trial call is let through (`CB_RESET_TIMEOUT`).
    pub reset_timeout_ms: u64,

    /// Failure percentage that trips the breaker (`CB_ERROR_THRESHOLD`).
    pub error_threshold_percentage: u32,

    /// Minimum calls inside the window before the breaker may trip
    /// (`CB_VOLUME_THRESHOLD`).
    pub volume_threshold: u32,

    /// Rolling window length in milliseconds (`CB_WINDOW`).
    pub rolling_window_ms: u64,

    /// Number of time buckets the rolling window is split into.
    pub rolling_buckets: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            reset_timeout_ms: 10_000,
            error_threshold_percentage: 50,
            volume_threshold: 100,
            rolling_window_ms: 10_000,
            rolling_buckets: 10,
        }
    }
}

impl BreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn rolling_window(&self) -> Duration {
        Duration::from_millis(self.rolling_window_ms)
    }
}

/// Retry configuration.
///
/// Not exposed through the environment; the defaults are the production values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first failure.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
        }
    }
}

/// Idempotency cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Lifetime of a cached outcome in seconds.
    pub ttl_secs: u64,

    /// How often expired entries are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            sweep_interval_secs: 60,
        }
    }
}

impl IdempotencyConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Spool backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpoolKind {
    /// Log the message and report success.
    Log,
    /// Append JSON lines under `spool.directory`.
    File,
}

/// Spool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpoolConfig {
    pub kind: SpoolKind,

    /// Directory for `retry.jsonl` / `dlq.jsonl` when `kind = "file"`.
    pub directory: String,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            kind: SpoolKind::Log,
            directory: "spool".to_string(),
        }
    }
}

/// How the verification call is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearinghouseMode {
    /// In-process flaky stand-in for the real clearinghouse.
    Simulated,
    /// POST to `clearinghouse.url`.
    Http,
}

/// Clearinghouse configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClearinghouseConfig {
    pub mode: ClearinghouseMode,

    /// Upstream endpoint, required in `http` mode.
    pub url: Option<String>,

    /// Per-request timeout for the HTTP client in milliseconds.
    pub request_timeout_ms: u64,

    /// Probability (0.0..=1.0) that a simulated call fails.
    pub failure_rate: f64,

    /// Simulated latency per call in milliseconds.
    pub latency_ms: u64,
}

impl Default for ClearinghouseConfig {
    fn default() -> Self {
        Self {
            mode: ClearinghouseMode::Simulated,
            url: None,
            request_timeout_ms: 2_000,
            failure_rate: 0.6,
            latency_ms: 0,
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Reject calls without a matching `x-api-key` header.
    pub require_api_key: bool,
    /// Expected API key (`API_KEY`).
    pub api_key: String,
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Validate the eligibility request body at the HTTP boundary.
    pub strict_validation: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_api_key: true,
            // WARNING: development key. Set API_KEY in production.
            api_key: "dev-key-123".to_string(),
            enable_headers: true,
            max_body_size: 64 * 1024,
            strict_validation: true,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per minute per client IP.
    pub requests_per_minute: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 10,
            burst_size: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human format.
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
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Bearer token for the admin API.
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.breaker.timeout(), Duration::from_secs(5));
        assert_eq!(config.breaker.reset_timeout(), Duration::from_secs(10));
        assert_eq!(config.breaker.error_threshold_percentage, 50);
        assert_eq!(config.breaker.volume_threshold, 100);
        assert_eq!(config.breaker.rolling_window(), Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 1_000);
        assert_eq!(config.idempotency.ttl_secs, 600);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [breaker]
            volume_threshold = 10

            [spool]
            kind = "file"
            directory = "/var/spool/eligibility"
            "#,
        )
        .unwrap();

        assert_eq!(config.breaker.volume_threshold, 10);
        assert_eq!(config.breaker.timeout_ms, 5_000);
        assert_eq!(config.spool.kind, SpoolKind::File);
        assert_eq!(config.clearinghouse.mode, ClearinghouseMode::Simulated);
    }
}
