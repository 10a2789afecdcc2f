//! Behavioural tests for the resilience pipeline, on virtual time.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use eligibility_gateway::eligibility::VerificationError;
use eligibility_gateway::pipeline::{
    IdempotencyCache, Outcome, PipelineError, ResolutionPath, ResiliencePipeline, VerificationRequest,
};
use eligibility_gateway::resilience::{BreakerSettings, CircuitState, RetryPolicy};

mod common;
use common::{
    active, pipeline, test_breaker, PanickingVerifier, RecordingSink, ScriptedVerifier, UNAVAILABLE,
};

fn request() -> VerificationRequest {
    VerificationRequest::new(json!({
        "patient_name": "John Doe",
        "payer_id": "PAYER_1",
        "batch_id": "rcm_morning_batch",
    }))
}

/// Retries without backoff, so many calls fit inside one rolling window.
fn instant_retries() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

#[tokio::test(start_paused = true)]
async fn test_first_attempt_success_has_no_delay() {
    let verifier = Arc::new(ScriptedVerifier::always_ok());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink.clone(), RetryPolicy::default(), test_breaker());
    let started = Instant::now();

    let outcome = pipeline.execute(request()).await.unwrap();

    assert_eq!(outcome, Outcome::success(active("PAYER_1")));
    assert_eq!(verifier.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(sink.retry_len() + sink.dlq_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_makes_four_attempts_then_dead_letters() {
    let verifier = Arc::new(ScriptedVerifier::always_failing());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink.clone(), RetryPolicy::default(), test_breaker());
    let started = Instant::now();

    let outcome = pipeline.execute(request()).await.unwrap();

    assert_eq!(outcome, Outcome::queued(ResolutionPath::Dlq, UNAVAILABLE));
    let offsets: Vec<u64> = verifier
        .call_times()
        .iter()
        .map(|t| t.duration_since(started).as_secs())
        .collect();
    assert_eq!(offsets, vec![0, 1, 3, 7]);

    let dlq = sink.dlq.lock().unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].reason, UNAVAILABLE);
    assert_eq!(dlq[0].payload["patient_name"], "[REDACTED]");
    assert_eq!(dlq[0].payload["batch_id"], "rcm_morning_batch");
    assert_eq!(sink.retry_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_cuts_retry_sequence_short() {
    let verifier = Arc::new(ScriptedVerifier::always_failing());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(
        verifier.clone(),
        sink.clone(),
        RetryPolicy::default(),
        BreakerSettings::default(),
    );
    let started = Instant::now();

    let outcome = pipeline.execute(request()).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(5));
    assert_eq!(
        outcome,
        Outcome::queued(ResolutionPath::Retry, "Timed out after 5000ms")
    );
    assert_eq!(sink.retry_len(), 1);

    // The abandoned sequence keeps going in the background.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(verifier.calls(), 4);
    assert_eq!(sink.dlq_len(), 0, "late exhaustion is not spooled again");
}

#[tokio::test(start_paused = true)]
async fn test_slow_operation_keeps_running_after_timeout() {
    let verifier = Arc::new(ScriptedVerifier::always_ok().with_latency(Duration::from_secs(20)));
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink.clone(), RetryPolicy::default(), test_breaker());

    let outcome = pipeline.execute(request()).await.unwrap();
    assert_eq!(outcome.resolution_path(), Some(ResolutionPath::Retry));
    assert_eq!(verifier.completed(), 0);

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(verifier.completed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unkeyed_calls_always_enter_the_breaker() {
    let verifier = Arc::new(ScriptedVerifier::always_ok());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink, RetryPolicy::default(), test_breaker());

    for _ in 0..5 {
        pipeline.execute(request()).await.unwrap();
    }

    assert_eq!(verifier.calls(), 5);
    assert!(pipeline.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_same_key_replays_identical_outcome_within_ttl() {
    let verifier = Arc::new(ScriptedVerifier::always_failing());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink.clone(), RetryPolicy::default(), test_breaker());
    let keyed = || request().with_idempotency_key("claim-123");

    let first = pipeline.execute(keyed()).await.unwrap();
    let second = pipeline.execute(keyed()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(verifier.calls(), 4, "operation ran for the first call only");
    assert_eq!(sink.dlq_len(), 1);
    assert_eq!(pipeline.breaker().snapshot().window.calls(), 1);

    tokio::time::advance(Duration::from_secs(599)).await;
    assert_eq!(pipeline.execute(keyed()).await.unwrap(), first);
    assert_eq!(verifier.calls(), 4);

    tokio::time::advance(Duration::from_secs(1)).await;
    pipeline.execute(keyed()).await.unwrap();
    assert_eq!(verifier.calls(), 8, "expired entry behaves as absent");
}

#[tokio::test(start_paused = true)]
async fn test_distinct_keys_do_not_share_outcomes() {
    let verifier = Arc::new(ScriptedVerifier::always_ok());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink, RetryPolicy::default(), test_breaker());

    pipeline.execute(request().with_idempotency_key("a")).await.unwrap();
    pipeline.execute(request().with_idempotency_key("b")).await.unwrap();

    assert_eq!(verifier.calls(), 2);
    assert_eq!(pipeline.cache().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_opens_on_tenth_failure_then_rejects_to_retry_queue() {
    let verifier = Arc::new(ScriptedVerifier::always_failing());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink.clone(), instant_retries(), test_breaker());
    let mut events = pipeline.breaker().subscribe();

    for _ in 0..9 {
        pipeline.execute(request()).await.unwrap();
    }
    assert_eq!(pipeline.breaker().state(), CircuitState::Closed);

    pipeline.execute(request()).await.unwrap();
    assert_eq!(pipeline.breaker().state(), CircuitState::Open);
    assert!(events.try_recv().is_ok(), "open event published");
    assert_eq!(sink.dlq_len(), 10);

    let calls_before = verifier.calls();
    let outcome = pipeline.execute(request()).await.unwrap();

    assert_eq!(outcome, Outcome::queued(ResolutionPath::Retry, "Breaker is open"));
    assert_eq!(verifier.calls(), calls_before, "operation not invoked while open");
    assert_eq!(sink.retry_len(), 1);
}

async fn trip(verifier: &ScriptedVerifier, pipeline: &eligibility_gateway::ResiliencePipeline) {
    for _ in 0..10 {
        pipeline.execute(request()).await.unwrap();
    }
    assert_eq!(pipeline.breaker().state(), CircuitState::Open);
    assert!(verifier.calls() >= 10);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_trial_success_closes() {
    let verifier = Arc::new(ScriptedVerifier::always_failing());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink, instant_retries(), test_breaker());
    trip(&verifier, &pipeline).await;

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(pipeline.breaker().state(), CircuitState::HalfOpen);

    verifier.push(Ok(active("PAYER_1")));
    let calls_before = verifier.calls();
    let outcome = pipeline.execute(request()).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(verifier.calls(), calls_before + 1, "exactly one trial");
    assert_eq!(pipeline.breaker().state(), CircuitState::Closed);
    assert_eq!(pipeline.breaker().snapshot().window.calls(), 0, "window reset on close");
}

#[tokio::test(start_paused = true)]
async fn test_half_open_trial_failure_reopens_with_fresh_clock() {
    let verifier = Arc::new(ScriptedVerifier::always_failing());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink.clone(), instant_retries(), test_breaker());
    trip(&verifier, &pipeline).await;

    tokio::time::advance(Duration::from_secs(10)).await;
    let outcome = pipeline.execute(request()).await.unwrap();
    assert_eq!(outcome.resolution_path(), Some(ResolutionPath::Dlq));
    assert_eq!(pipeline.breaker().state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(9)).await;
    let calls_before = verifier.calls();
    let outcome = pipeline.execute(request()).await.unwrap();
    assert_eq!(outcome, Outcome::queued(ResolutionPath::Retry, "Breaker is open"));
    assert_eq!(verifier.calls(), calls_before);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(pipeline.breaker().state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn test_spool_failure_surfaces_as_error() {
    let verifier = Arc::new(ScriptedVerifier::always_failing());
    let sink = Arc::new(RecordingSink::default());
    sink.broken.store(true, Ordering::SeqCst);
    let pipeline = pipeline(verifier, sink, instant_retries(), test_breaker());

    let err = pipeline
        .execute(request().with_idempotency_key("k"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Spool(_)));
    assert!(pipeline.cache().is_empty(), "failed calls are not cached");
}

#[tokio::test(start_paused = true)]
async fn test_recovery_after_transient_failures() {
    let verifier = Arc::new(ScriptedVerifier::new(
        vec![
            Err(VerificationError::new(UNAVAILABLE)),
            Err(VerificationError::new(UNAVAILABLE)),
        ],
        Ok(active("PAYER_9")),
    ));
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink.clone(), RetryPolicy::default(), test_breaker());

    let outcome = pipeline.execute(request()).await.unwrap();

    assert_eq!(outcome, Outcome::success(active("PAYER_9")));
    assert_eq!(verifier.calls(), 3);
    assert_eq!(sink.retry_len() + sink.dlq_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_verifier_is_queued_for_retry() {
    let sink = Arc::new(RecordingSink::default());
    let pipeline = ResiliencePipeline::new(
        Arc::new(PanickingVerifier),
        sink.clone(),
        RetryPolicy::default(),
        test_breaker(),
        IdempotencyCache::new(Duration::from_secs(600)),
    );

    let outcome = pipeline.execute(request()).await.unwrap();

    let Outcome::Queued { resolution_path, reason, .. } = outcome else {
        panic!("expected a queued outcome, got {outcome:?}");
    };
    assert_eq!(resolution_path, ResolutionPath::Retry);
    assert!(reason.contains("panicked"), "reason: {reason}");
    assert_eq!(sink.retry_len(), 1);
    assert_eq!(sink.dlq_len(), 0);

    let window = pipeline.breaker().snapshot().window;
    assert_eq!(window.failures, 1);
    assert_eq!(window.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_caller_still_spools_and_caches() {
    let verifier = Arc::new(ScriptedVerifier::always_failing());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier.clone(), sink.clone(), RetryPolicy::default(), test_breaker());

    let caller = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .execute_detached(request().with_idempotency_key("client-went-away"))
                .await
        })
    };
    tokio::time::sleep(Duration::from_secs(2)).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());
    assert_eq!(sink.dlq_len(), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(verifier.calls(), 4);
    assert_eq!(sink.dlq_len(), 1);
    assert_eq!(
        pipeline.cache().lookup("client-went-away"),
        Some(Outcome::queued(ResolutionPath::Dlq, UNAVAILABLE))
    );
}

#[tokio::test(start_paused = true)]
async fn test_detached_execute_returns_the_outcome() {
    let verifier = Arc::new(ScriptedVerifier::always_ok());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = pipeline(verifier, sink, RetryPolicy::default(), test_breaker());

    let outcome = pipeline.execute_detached(request()).await.unwrap();

    assert_eq!(outcome, Outcome::success(active("PAYER_1")));
}
