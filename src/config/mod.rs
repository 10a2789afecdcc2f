//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → CB_* / API_KEY environment overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → frozen into subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the breaker is built once and never replaced
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, ClearinghouseConfig, ClearinghouseMode, GatewayConfig,
    IdempotencyConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig, RetryConfig,
    SecurityConfig, SpoolConfig, SpoolKind, TimeoutConfig,
};
