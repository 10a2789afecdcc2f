//! Typed client for the eligibility gateway's public endpoint.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityRequest {
    pub patient_name: String,
    pub payer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    /// Any other fields are passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl EligibilityRequest {
    pub fn new(patient_name: impl Into<String>, payer_id: impl Into<String>) -> Self {
        Self {
            patient_name: patient_name.into(),
            payer_id: payer_id.into(),
            batch_id: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn batch(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionPath {
    Retry,
    Dlq,
}

/// Body of a 200 from `POST /eligibility/verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyResponse {
    Success {
        result: Value,
    },
    Queued {
        resolution_path: ResolutionPath,
        message: String,
        reason: String,
    },
}

impl VerifyResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, VerifyResponse::Success { .. })
    }
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct EligibilityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EligibilityClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    /// Use a preconfigured `reqwest::Client` (timeouts, proxies).
    pub fn with_client(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Submit one verification. Queued outcomes are `Ok`; only non-2xx
    /// statuses and transport failures are errors.
    pub async fn verify<B: Serialize + ?Sized>(
        &self,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> Result<VerifyResponse, SdkError> {
        let mut req = self
            .client
            .post(format!("{}/eligibility/verify", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(body);
        if let Some(key) = idempotency_key {
            req = req.header("x-idempotency-key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(SdkError::Status { status, body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<Value, SdkError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SdkError::Status { status, body });
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_queued_response() {
        let body = json!({
            "status": "QUEUED",
            "resolution_path": "DLQ",
            "message": "Eligibility request accepted for asynchronous processing",
            "reason": "Clearinghouse API Unavailable",
        });
        let resp: VerifyResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(
            resp,
            VerifyResponse::Queued { resolution_path: ResolutionPath::Dlq, .. }
        ));
    }

    #[test]
    fn test_request_serialization_flattens_extras() {
        let mut req = EligibilityRequest::new("Jane", "PAYER_1").batch("morning");
        req.extra.insert("member_id".into(), json!("M-1"));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"patient_name": "Jane", "payer_id": "PAYER_1", "batch_id": "morning", "member_id": "M-1"})
        );
    }
}
