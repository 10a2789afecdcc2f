//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` wins over `observability.log_level` when set
//! - JSON output for production, pretty output for development
//! - Request payloads are only ever logged after redaction

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Default directives when `RUST_LOG` is absent.
pub fn default_directives(level: &str) -> String {
    format!("eligibility_gateway={level},tower_http={level}")
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
