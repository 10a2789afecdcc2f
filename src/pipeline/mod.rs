//! Resilience pipeline.
//!
//! # Data Flow
//! ```text
//! VerificationRequest
//!     → idempotency.rs (live key? return cached outcome)
//!     → executor.rs → resilience::CircuitBreaker
//!         → RetryPolicy → eligibility::Verifier
//!         → on failure: resilience::FailureRouter → spool
//!     → idempotency.rs (store outcome when keyed)
//!     → outcome.rs (SUCCESS | QUEUED{RETRY|DLQ})
//! ```
//!
//! # Design Decisions
//! - Dependency failures always resolve to an outcome; only spool failures error
//! - The cache never short-circuits unkeyed requests

pub mod executor;
pub mod idempotency;
pub mod outcome;

pub use executor::{PipelineError, ResiliencePipeline, VerificationRequest};
pub use idempotency::IdempotencyCache;
pub use outcome::{Outcome, ResolutionPath, QUEUED_MESSAGE};
