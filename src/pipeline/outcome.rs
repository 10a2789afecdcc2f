//! Terminal dispositions of a verification request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message returned with every queued outcome.
pub const QUEUED_MESSAGE: &str = "Eligibility request accepted for asynchronous processing";

/// Which spool a queued request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionPath {
    /// Retry queue: the breaker intervened before retries ran out.
    Retry,
    /// Dead-letter queue: every in-process retry failed.
    Dlq,
}

impl ResolutionPath {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionPath::Retry => "retry",
            ResolutionPath::Dlq => "dlq",
        }
    }
}

/// The single, immutable result of one `execute` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success {
        result: Value,
    },
    Queued {
        resolution_path: ResolutionPath,
        message: String,
        reason: String,
    },
}

impl Outcome {
    pub fn success(result: Value) -> Self {
        Outcome::Success { result }
    }

    pub fn queued(resolution_path: ResolutionPath, reason: impl Into<String>) -> Self {
        Outcome::Queued {
            resolution_path,
            message: QUEUED_MESSAGE.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn resolution_path(&self) -> Option<ResolutionPath> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Queued {
                resolution_path, ..
            } => Some(*resolution_path),
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self.resolution_path() {
            None => "success",
            Some(path) => path.as_str(),
        }
    }
}
