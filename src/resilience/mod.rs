//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the clearinghouse:
//!     → circuit_breaker.rs (admit? track outcomes, trip on error rate)
//!     → timeouts.rs (deadline over the whole retry sequence, detached)
//!     → retries.rs (sequential attempts, backoff.rs delays)
//!     → On failure: fallback.rs (classify, spool, queued outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; the breaker bounds every call
//! - Retries run inside one breaker call; a trip rejects new calls, while
//!   sequences already admitted run to completion on their own task
//! - The breaker never raises to callers; failures resolve through the fallback

pub mod backoff;
pub mod circuit_breaker;
pub mod fallback;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerError, BreakerEvent, BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitState,
};
pub use fallback::FailureRouter;
pub use retries::{RetriesExhausted, RetryPolicy};
