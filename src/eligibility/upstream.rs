//! HTTP clearinghouse client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ClearinghouseConfig;
use crate::eligibility::verifier::{VerificationError, Verifier};

/// POSTs the request payload to a real clearinghouse endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClearinghouse {
    client: reqwest::Client,
    url: String,
}

impl UpstreamClearinghouse {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, VerificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerificationError::new(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &ClearinghouseConfig) -> Result<Self, VerificationError> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| VerificationError::new("clearinghouse.url is not configured"))?;
        Self::new(url, Duration::from_millis(config.request_timeout_ms))
    }
}

#[async_trait]
impl Verifier for UpstreamClearinghouse {
    async fn verify(&self, request: &Value) -> Result<Value, VerificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.url, error = %e, "Clearinghouse request failed");
                VerificationError::new(format!("Clearinghouse request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, status = %status, "Clearinghouse returned error status");
            return Err(VerificationError::with_status(
                format!("Clearinghouse returned {status}"),
                status.as_u16(),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| VerificationError::new(format!("Invalid clearinghouse response: {e}")))
    }
}
