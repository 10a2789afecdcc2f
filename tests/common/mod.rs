//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use eligibility_gateway::config::GatewayConfig;
use eligibility_gateway::eligibility::{VerificationError, Verifier};
use eligibility_gateway::http::HttpServer;
use eligibility_gateway::lifecycle::Shutdown;
use eligibility_gateway::pipeline::{IdempotencyCache, ResiliencePipeline};
use eligibility_gateway::resilience::{BreakerSettings, RetryPolicy};
use eligibility_gateway::spool::{SpoolError, SpoolMessage, SpoolSink};

pub const UNAVAILABLE: &str = "Clearinghouse API Unavailable";

pub fn active(payer_id: &str) -> Value {
    json!({"eligibility_status": "ACTIVE", "payer_id": payer_id})
}

/// Verifier that replays a script, then repeats a fallback result.
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<Result<Value, VerificationError>>>,
    fallback: Result<Value, VerificationError>,
    latency: Duration,
    calls: AtomicU32,
    completed: AtomicU32,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedVerifier {
    pub fn new(
        script: Vec<Result<Value, VerificationError>>,
        fallback: Result<Value, VerificationError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(Vec::new(), Ok(active("PAYER_1")))
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new(), Err(VerificationError::new(UNAVAILABLE)))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    /// Queue results for the next calls.
    pub fn push(&self, result: Result<Value, VerificationError>) {
        self.script.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl Verifier for ScriptedVerifier {
    async fn verify(&self, _request: &Value) -> Result<Value, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Verifier whose client blows up on every call.
pub struct PanickingVerifier;

#[async_trait]
impl Verifier for PanickingVerifier {
    async fn verify(&self, _request: &Value) -> Result<Value, VerificationError> {
        panic!("clearinghouse client bug");
    }
}

/// Sink that keeps every spooled message in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub retry: Mutex<Vec<SpoolMessage>>,
    pub dlq: Mutex<Vec<SpoolMessage>>,
    pub broken: AtomicBool,
}

impl RecordingSink {
    pub fn retry_len(&self) -> usize {
        self.retry.lock().unwrap().len()
    }

    pub fn dlq_len(&self) -> usize {
        self.dlq.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), SpoolError> {
        if self.broken.load(Ordering::SeqCst) {
            Err(SpoolError::Unavailable("queue broker down".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SpoolSink for RecordingSink {
    async fn push_to_retry_queue(&self, message: SpoolMessage) -> Result<(), SpoolError> {
        self.check()?;
        self.retry.lock().unwrap().push(message);
        Ok(())
    }

    async fn push_to_dlq(&self, message: SpoolMessage) -> Result<(), SpoolError> {
        self.check()?;
        self.dlq.lock().unwrap().push(message);
        Ok(())
    }
}

/// Breaker settings used by most tests: 10-call volume, 10s timeout so a full
/// default retry sequence (7s) completes.
pub fn test_breaker() -> BreakerSettings {
    BreakerSettings {
        timeout: Duration::from_secs(10),
        volume_threshold: 10,
        ..BreakerSettings::default()
    }
}

pub fn pipeline(
    verifier: Arc<ScriptedVerifier>,
    sink: Arc<dyn SpoolSink>,
    retry: RetryPolicy,
    breaker: BreakerSettings,
) -> Arc<ResiliencePipeline> {
    Arc::new(ResiliencePipeline::new(
        verifier,
        sink,
        retry,
        breaker,
        IdempotencyCache::new(Duration::from_secs(600)),
    ))
}

/// A gateway serving on an ephemeral loopback port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub pipeline: Arc<ResiliencePipeline>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestGateway {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn start_gateway(config: GatewayConfig, pipeline: Arc<ResiliencePipeline>) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, pipeline.clone());
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestGateway {
        addr,
        pipeline,
        shutdown,
        handle,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
