//! In-process stand-in for a flaky clearinghouse.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};

use crate::config::ClearinghouseConfig;
use crate::eligibility::verifier::{VerificationError, Verifier};

const VERIFICATION_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone)]
pub struct SimulatedClearinghouse {
    failure_rate: f64,
    latency: Duration,
}

impl SimulatedClearinghouse {
    pub fn new(failure_rate: f64, latency: Duration) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            latency,
        }
    }

    pub fn from_config(config: &ClearinghouseConfig) -> Self {
        Self::new(config.failure_rate, Duration::from_millis(config.latency_ms))
    }

    fn verification_id() -> String {
        let suffix: String = (0..9)
            .map(|_| {
                let idx = fastrand::usize(..VERIFICATION_ID_ALPHABET.len());
                char::from(VERIFICATION_ID_ALPHABET[idx])
            })
            .collect();
        format!("ELG_{suffix}")
    }
}

#[async_trait]
impl Verifier for SimulatedClearinghouse {
    async fn verify(&self, request: &Value) -> Result<Value, VerificationError> {
        tracing::debug!("Verifying insurance eligibility (simulated)");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let unavailable = rand::thread_rng().gen_bool(self.failure_rate);
        if unavailable {
            tracing::error!("Clearinghouse Timeout / Error");
            return Err(VerificationError::with_status("Clearinghouse API Unavailable", 500));
        }

        Ok(json!({
            "eligibility_status": "ACTIVE",
            "payer_id": request.get("payer_id").cloned().unwrap_or(Value::Null),
            "coverage_details": {
                "deductible_remaining": 500.0,
                "copay": 20.0,
            },
            "verification_id": Self::verification_id(),
        }))
    }
}
