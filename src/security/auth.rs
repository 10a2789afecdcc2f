//! Caller authentication for the verify endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::SecurityConfig;
use crate::http::response::ApiError;

/// Header carrying the caller's API key.
pub const X_API_KEY: &str = "x-api-key";

/// Whether `presented` satisfies the configured key requirement.
pub fn is_authorized(config: &SecurityConfig, presented: Option<&str>) -> bool {
    !config.require_api_key || presented == Some(config.api_key.as_str())
}

/// Rejects requests whose `x-api-key` does not match with 401.
pub async fn api_key_middleware(
    State(config): State<Arc<SecurityConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(X_API_KEY)
        .and_then(|v| v.to_str().ok());

    if is_authorized(&config, presented) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        ApiError::Unauthorized.into_response()
    }
}
