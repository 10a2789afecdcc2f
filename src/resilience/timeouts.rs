//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race an operation against a deadline
//! - Let the operation keep running after the deadline passes
//!
//! # Design Decisions
//! - The operation runs on its own task; dropping the `JoinHandle` detaches it
//! - No cancellation token reaches the operation; abandoned work must clean up
//!   after itself
//! - A panicking operation is reported, not propagated

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Why a detached operation produced no value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeadlineError {
    #[error("Timed out after {}ms", .0.as_millis())]
    Elapsed(Duration),

    #[error("Operation task failed: {0}")]
    Crashed(String),
}

/// Spawn `operation` and wait at most `deadline` for it.
///
/// On timeout the spawned task is left running in the background and its
/// eventual result is discarded.
pub async fn run_detached<F>(operation: F, deadline: Duration) -> Result<F::Output, DeadlineError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = tokio::spawn(operation);

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(join_err)) => Err(DeadlineError::Crashed(join_err.to_string())),
        Err(_) => Err(DeadlineError::Elapsed(deadline)),
    }
}
