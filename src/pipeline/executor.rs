//! The resilience pipeline: the single `execute` entry point.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::GatewayConfig;
use crate::eligibility::Verifier;
use crate::observability::metrics;
use crate::pipeline::idempotency::IdempotencyCache;
use crate::pipeline::outcome::Outcome;
use crate::resilience::{BreakerSettings, CircuitBreaker, FailureRouter, RetryPolicy};
use crate::spool::{SpoolError, SpoolSink};

/// One eligibility request as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub payload: Value,
    pub idempotency_key: Option<String>,
}

impl VerificationRequest {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Failures that escape `execute`. Dependency failures never do.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spool request: {0}")]
    Spool(#[from] SpoolError),

    #[error("pipeline task failed: {0}")]
    Task(String),
}

/// Idempotency cache, circuit breaker, retries and fallback routing around a
/// [`Verifier`].
pub struct ResiliencePipeline {
    verifier: Arc<dyn Verifier>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    router: FailureRouter,
    cache: IdempotencyCache,
}

impl ResiliencePipeline {
    pub fn new(
        verifier: Arc<dyn Verifier>,
        sink: Arc<dyn SpoolSink>,
        retry: RetryPolicy,
        breaker: BreakerSettings,
        cache: IdempotencyCache,
    ) -> Self {
        Self {
            verifier,
            retry,
            breaker: Arc::new(CircuitBreaker::new(breaker)),
            router: FailureRouter::new(sink),
            cache,
        }
    }

    /// Wire a pipeline from the `breaker`, `retry` and `idempotency` sections.
    pub fn from_config(
        config: &GatewayConfig,
        verifier: Arc<dyn Verifier>,
        sink: Arc<dyn SpoolSink>,
    ) -> Self {
        Self::new(
            verifier,
            sink,
            RetryPolicy::from(&config.retry),
            BreakerSettings::from(&config.breaker),
            IdempotencyCache::new(config.idempotency.ttl()),
        )
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn cache(&self) -> &IdempotencyCache {
        &self.cache
    }

    /// Run [`execute`](Self::execute) on its own task and wait for it.
    ///
    /// Dropping the returned future does not cancel the request: the task
    /// still resolves it, spooling and caching as usual.
    pub async fn execute_detached(
        self: &Arc<Self>,
        request: VerificationRequest,
    ) -> Result<Outcome, PipelineError> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.execute(request).await })
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Pipeline task failed");
                PipelineError::Task(err.to_string())
            })?
    }

    /// Resolve `request` to an [`Outcome`].
    ///
    /// A cached outcome for a live idempotency key is returned without touching
    /// the breaker or the verifier. Only a spool failure is an error.
    pub async fn execute(&self, request: VerificationRequest) -> Result<Outcome, PipelineError> {
        let started = Instant::now();
        let key = request.idempotency_key.as_deref();

        if let Some(cached) = key.and_then(|k| self.cache.lookup(k)) {
            tracing::info!(
                idempotency_key = key.unwrap_or_default(),
                outcome = cached.label(),
                "Returning cached outcome"
            );
            metrics::record_request("cached", started);
            return Ok(cached);
        }

        let payload = Arc::new(request.payload);
        let verifier = Arc::clone(&self.verifier);
        let retry = self.retry;
        let attempt_payload = Arc::clone(&payload);

        let operation = async move {
            retry
                .run(|| {
                    let verifier = Arc::clone(&verifier);
                    let payload = Arc::clone(&attempt_payload);
                    async move { verifier.verify(&payload).await }
                })
                .await
        };

        let outcome = self
            .breaker
            .call_or_else(
                async move { operation.await.map(Outcome::success) },
                |err| async move { self.router.route(&payload, key, &err).await },
            )
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                metrics::record_request("error", started);
                return Err(err.into());
            }
        };

        if let Some(key) = key {
            self.cache.store(key, outcome.clone());
        }

        tracing::info!(
            outcome = outcome.label(),
            idempotency_key = key.unwrap_or_default(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Eligibility request resolved"
        );
        metrics::record_request(outcome.label(), started);
        Ok(outcome)
    }
}
