//! PHI redaction for anything that leaves the request path.
//!
//! Applied to payloads before they are logged or spooled, never before
//! processing.

use serde_json::{Map, Value};

/// Replacement for every sensitive value.
pub const REDACTED: &str = "[REDACTED]";

/// Field names whose values are always replaced, at any depth.
pub const SENSITIVE_FIELDS: &[&str] = &["patient_name", "ssn", "dob", "address", "phone"];

/// Return a redacted copy of `data`.
///
/// Objects and arrays are walked recursively; scalars and `null` come back
/// unchanged. The input is never mutated.
pub fn redact(data: &Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(redact_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn redact_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let value = if SENSITIVE_FIELDS.contains(&key.as_str()) {
                Value::String(REDACTED.to_string())
            } else {
                redact(value)
            };
            (key.clone(), value)
        })
        .collect()
}
