//! Spooling subsystem.
//!
//! # Data Flow
//! ```text
//! Failure router (resilience/fallback.rs)
//!     → SpoolMessage (redacted payload + reason)
//!     → SpoolSink::push_to_retry_queue | SpoolSink::push_to_dlq
//!     → log.rs (simulated queue) | file.rs (JSON lines on disk)
//! ```
//!
//! # Design Decisions
//! - Sinks see only redacted payloads
//! - A sink failure is final: there is no fallback behind the fallback
//! - Durability is the sink's concern, not the pipeline's

pub mod file;
pub mod log;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{SpoolConfig, SpoolKind};
use crate::pipeline::outcome::ResolutionPath;

pub use file::FileSpoolSink;
pub use log::LogSpoolSink;

/// One spooled request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolMessage {
    pub id: Uuid,
    pub queue: ResolutionPath,
    pub reason: String,
    /// Request payload, already redacted.
    pub payload: Value,
    pub idempotency_key: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub enqueued_at_ms: u64,
}

impl SpoolMessage {
    pub fn new(
        queue: ResolutionPath,
        reason: impl Into<String>,
        payload: Value,
        idempotency_key: Option<String>,
    ) -> Self {
        let enqueued_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            id: Uuid::new_v4(),
            queue,
            reason: reason.into(),
            payload,
            idempotency_key,
            enqueued_at_ms,
        }
    }
}

/// Errors raised by a spool backend.
#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("spool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spool encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("spool unavailable: {0}")]
    Unavailable(String),
}

/// Durable destination for requests the pipeline could not complete.
#[async_trait]
pub trait SpoolSink: Send + Sync {
    async fn push_to_retry_queue(&self, message: SpoolMessage) -> Result<(), SpoolError>;

    async fn push_to_dlq(&self, message: SpoolMessage) -> Result<(), SpoolError>;
}

/// Build the sink selected by `config`.
pub async fn build_sink(config: &SpoolConfig) -> Result<Arc<dyn SpoolSink>, SpoolError> {
    match config.kind {
        SpoolKind::Log => Ok(Arc::new(LogSpoolSink)),
        SpoolKind::File => Ok(Arc::new(FileSpoolSink::open(&config.directory).await?)),
    }
}
