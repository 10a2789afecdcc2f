//! Breaker fallback: classify a failure and spool the request.
//!
//! # Routing
//! ```text
//! BreakerError::Failed(RetriesExhausted) → DLQ   (every attempt failed)
//! BreakerError::Open                     → RETRY (never attempted)
//! BreakerError::Timeout / Crashed        → RETRY (cut short by the breaker)
//! ```

use std::fmt::Display;
use std::sync::Arc;

use serde_json::Value;

use crate::observability::metrics;
use crate::pipeline::outcome::{Outcome, ResolutionPath};
use crate::resilience::circuit_breaker::BreakerError;
use crate::resilience::retries::RetriesExhausted;
use crate::security::redaction::redact;
use crate::spool::{SpoolError, SpoolMessage, SpoolSink};

/// Decide which spool a failure belongs in.
pub fn classify<E>(error: &BreakerError<RetriesExhausted<E>>) -> ResolutionPath {
    match error {
        BreakerError::Failed(_) => ResolutionPath::Dlq,
        BreakerError::Open | BreakerError::Timeout(_) | BreakerError::Crashed(_) => {
            ResolutionPath::Retry
        }
    }
}

/// Routes failed requests to the retry queue or the dead-letter queue.
#[derive(Clone)]
pub struct FailureRouter {
    sink: Arc<dyn SpoolSink>,
}

impl FailureRouter {
    pub fn new(sink: Arc<dyn SpoolSink>) -> Self {
        Self { sink }
    }

    /// Spool `request` and produce the queued outcome.
    ///
    /// The outcome's `reason` is the error message verbatim; only the spooled
    /// payload is redacted. A sink failure is returned as-is.
    pub async fn route<E: Display>(
        &self,
        request: &Value,
        idempotency_key: Option<&str>,
        error: &BreakerError<RetriesExhausted<E>>,
    ) -> Result<Outcome, SpoolError> {
        let path = classify(error);
        let reason = error.to_string();

        tracing::warn!(
            resolution_path = path.as_str(),
            reason = %reason,
            "Fallback triggered"
        );

        let message = SpoolMessage::new(
            path,
            reason.clone(),
            redact(request),
            idempotency_key.map(str::to_owned),
        );
        let pushed = match path {
            ResolutionPath::Retry => self.sink.push_to_retry_queue(message).await,
            ResolutionPath::Dlq => self.sink.push_to_dlq(message).await,
        };

        if let Err(err) = pushed {
            tracing::error!(resolution_path = path.as_str(), error = %err, "Spool sink failed");
            return Err(err);
        }

        metrics::record_spooled(path);
        Ok(Outcome::queued(path, reason))
    }
}
