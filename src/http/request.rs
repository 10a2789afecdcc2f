//! Request identification.
//!
//! # Responsibilities
//! - Stamp every request with an `x-request-id` (UUID v4) unless the client sent one
//! - Echo the id on the response
//! - Expose the id to handlers and the trace span
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Client-supplied ids are kept so callers can correlate retries

use axum::http::{HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request id.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Header carrying the caller's idempotency key.
pub static X_IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("x-idempotency-key");

/// Assigns a UUID v4 request id when none is present.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid)
}

/// Copies the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID.clone())
}

/// Convenience accessors for identifiers carried in headers.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;

    /// Non-blank `x-idempotency-key`, if any.
    fn idempotency_key(&self) -> Option<&str>;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> &str {
        self.get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }

    fn idempotency_key(&self) -> Option<&str> {
        self.get(&X_IDEMPOTENCY_KEY)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers().request_id()
    }

    fn idempotency_key(&self) -> Option<&str> {
        self.headers().idempotency_key()
    }
}
