//! Error responses.
//!
//! Every error leaves the service as JSON `{"error": "..."}`. Dependency
//! failures are not errors here: they resolve to a queued outcome with 200.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::eligibility::RequestValidationError;
use crate::pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid API Key")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Internal server error")]
    Internal(#[from] PipelineError),
}

impl From<RequestValidationError> for ApiError {
    fn from(err: RequestValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            tracing::error!(error = %err, "Pipeline failed");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
