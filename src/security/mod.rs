//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming verify request:
//!     → rate_limit.rs (per-IP token bucket, 429)
//!     → auth.rs (x-api-key, 401)
//!     → handler (strict body validation, 400)
//! Outgoing response:
//!     → headers.rs (nosniff, frame denial)
//! Spooled or logged payloads:
//!     → redaction.rs (mask PHI fields)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Redaction never mutates its input

pub mod auth;
pub mod headers;
pub mod rate_limit;
pub mod redaction;

pub use redaction::redact;
