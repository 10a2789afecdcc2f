//! The verification operation guarded by the pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{ClearinghouseConfig, ClearinghouseMode};
use crate::eligibility::simulated::SimulatedClearinghouse;
use crate::eligibility::upstream::UpstreamClearinghouse;

/// A single failed verification attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct VerificationError {
    pub message: String,
    /// Upstream HTTP status, when there was one.
    pub status: Option<u16>,
}

impl VerificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

/// Performs one eligibility check. Retries are the caller's business.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, request: &Value) -> Result<Value, VerificationError>;
}

/// Build the verifier selected by `config.mode`.
pub fn build_verifier(config: &ClearinghouseConfig) -> Result<Arc<dyn Verifier>, VerificationError> {
    match config.mode {
        ClearinghouseMode::Simulated => Ok(Arc::new(SimulatedClearinghouse::from_config(config))),
        ClearinghouseMode::Http => Ok(Arc::new(UpstreamClearinghouse::from_config(config)?)),
    }
}
