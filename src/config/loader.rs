//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the process environment, and validate.
///
/// Without an explicit `path`, `GATEWAY_CONFIG` is consulted; if neither is
/// set, defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let mut config = match path.or(from_env.as_deref()) {
        Some(path) => parse_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply the recognised environment overrides on top of `config`.
///
/// `lookup` abstracts the environment so tests never touch process state.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = parse_var(&lookup, "CB_TIMEOUT")? {
        config.breaker.timeout_ms = v;
    }
    if let Some(v) = parse_var(&lookup, "CB_RESET_TIMEOUT")? {
        config.breaker.reset_timeout_ms = v;
    }
    if let Some(v) = parse_var(&lookup, "CB_ERROR_THRESHOLD")? {
        config.breaker.error_threshold_percentage = v;
    }
    if let Some(v) = parse_var(&lookup, "CB_VOLUME_THRESHOLD")? {
        config.breaker.volume_threshold = v;
    }
    if let Some(v) = parse_var(&lookup, "CB_WINDOW")? {
        config.breaker.rolling_window_ms = v;
    }
    if let Some(key) = lookup("API_KEY").filter(|k| !k.is_empty()) {
        config.security.api_key = key;
    }
    if let Some(addr) = lookup("BIND_ADDRESS").filter(|a| !a.is_empty()) {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup("LOG_LEVEL").filter(|l| !l.is_empty()) {
        config.observability.log_level = level;
    }
    Ok(())
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { key, value: raw }),
    }
}
