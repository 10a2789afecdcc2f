//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (assign/propagate x-request-id)
//!     → server.rs (trace span, timeout, body limit, security layers)
//!     → verify handler → pipeline::ResiliencePipeline::execute
//!     → response.rs (errors as JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_IDEMPOTENCY_KEY, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
