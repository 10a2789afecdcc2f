//! Shape checks for the verify endpoint body.
//!
//! The pipeline treats payloads as opaque; these checks only run at the HTTP
//! boundary when `security.strict_validation` is on.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("{0} must be a non-empty string")]
    MissingField(&'static str),

    #[error("{0} must be a string")]
    WrongType(&'static str),
}

const REQUIRED: &[&str] = &["patient_name", "payer_id"];
const OPTIONAL_STRINGS: &[&str] = &["batch_id"];

/// Validate an eligibility request body.
pub fn validate_request(body: &Value) -> Result<(), RequestValidationError> {
    let map = body.as_object().ok_or(RequestValidationError::NotAnObject)?;

    for &field in REQUIRED {
        match map.get(field).and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => {}
            _ => return Err(RequestValidationError::MissingField(field)),
        }
    }

    for &field in OPTIONAL_STRINGS {
        match map.get(field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => return Err(RequestValidationError::WrongType(field)),
        }
    }

    Ok(())
}
