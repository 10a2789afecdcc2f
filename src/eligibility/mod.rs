//! Eligibility verification subsystem.
//!
//! # Data Flow
//! ```text
//! Retrying executor (resilience/retries.rs)
//!     → Verifier::verify (one attempt)
//!     → simulated.rs (flaky in-process clearinghouse)
//!       | upstream.rs (HTTP clearinghouse)
//! ```
//!
//! # Design Decisions
//! - A verifier performs exactly one attempt; retries live in the pipeline
//! - Verifiers never see the idempotency key
//! - Payload shape is checked at the HTTP boundary only (request.rs)

pub mod request;
pub mod simulated;
pub mod upstream;
pub mod verifier;

pub use request::{validate_request, RequestValidationError};
pub use simulated::SimulatedClearinghouse;
pub use upstream::UpstreamClearinghouse;
pub use verifier::{build_verifier, VerificationError, Verifier};
