//! Circuit breaker for the clearinghouse dependency.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a single trial call decides whether it recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: calls >= volume_threshold AND failure% >= threshold within window
//! Open → Half-Open: after reset timeout, on the next call
//! Half-Open → Closed: trial succeeds (window is reset)
//! Half-Open → Open: trial fails (reset clock restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per process, built once from frozen settings
//! - Fail fast in Open state (the operation future is never polled)
//! - Single trial in Half-Open; concurrent callers are rejected, not queued
//! - Timeouts count as failures; the timed-out work keeps running detached
//! - Transitions are returned by the state machine and published as events

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::{run_detached, DeadlineError};

/// Breaker state as reported to callers and the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// A state change, published on the breaker's event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerEvent {
    Open,
    HalfOpen,
    Close,
}

/// Why the breaker did not return the operation's value.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// Rejected without invoking the operation.
    #[error("Breaker is open")]
    Open,

    /// The operation did not finish within the breaker timeout.
    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The operation task panicked or was aborted.
    #[error("{0}")]
    Crashed(String),

    /// The operation itself failed.
    #[error("{0}")]
    Failed(E),
}

/// Frozen breaker parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub timeout: Duration,
    pub reset_timeout: Duration,
    pub error_threshold_percentage: u32,
    pub volume_threshold: u32,
    pub rolling_window: Duration,
    pub rolling_buckets: u32,
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            timeout: config.timeout(),
            reset_timeout: config.reset_timeout(),
            error_threshold_percentage: config.error_threshold_percentage,
            volume_threshold: config.volume_threshold,
            rolling_window: config.rolling_window(),
            rolling_buckets: config.rolling_buckets.max(1),
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from(&BreakerConfig::default())
    }
}

/// Aggregated counts over the live part of the rolling window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowStats {
    pub successes: u32,
    pub failures: u32,
    pub timeouts: u32,
    pub rejections: u32,
}

impl WindowStats {
    /// Calls that reached the operation.
    pub fn calls(&self) -> u32 {
        self.successes + self.failures + self.timeouts
    }

    pub fn failure_percentage(&self) -> f64 {
        let calls = self.calls();
        if calls == 0 {
            0.0
        } else {
            f64::from(self.failures + self.timeouts) * 100.0 / f64::from(calls)
        }
    }
}

/// Point-in-time view for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub window: WindowStats,
    pub failure_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallOutcome {
    Success,
    Failure,
    Timeout,
}

#[derive(Debug)]
struct Bucket {
    started: Instant,
    stats: WindowStats,
}

/// Time-bucketed rolling window of call outcomes.
#[derive(Debug)]
struct RollingWindow {
    span: Duration,
    bucket_width: Duration,
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    fn new(span: Duration, buckets: u32) -> Self {
        Self {
            span,
            bucket_width: span / buckets.max(1),
            buckets: VecDeque::new(),
        }
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.buckets.front() {
            if now.duration_since(front.started) >= self.span {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    /// Apply `bump` to the newest bucket, opening a fresh one when it is stale.
    fn update<F>(&mut self, now: Instant, bump: F)
    where
        F: FnOnce(&mut WindowStats),
    {
        self.evict(now);
        let stale = self
            .buckets
            .back()
            .map_or(true, |b| now.duration_since(b.started) >= self.bucket_width);
        if stale {
            self.buckets.push_back(Bucket {
                started: now,
                stats: WindowStats::default(),
            });
        }
        if let Some(bucket) = self.buckets.back_mut() {
            bump(&mut bucket.stats);
        }
    }

    fn record(&mut self, now: Instant, outcome: CallOutcome) {
        self.update(now, |stats| match outcome {
            CallOutcome::Success => stats.successes += 1,
            CallOutcome::Failure => stats.failures += 1,
            CallOutcome::Timeout => stats.timeouts += 1,
        });
    }

    fn record_rejection(&mut self, now: Instant) {
        self.update(now, |stats| stats.rejections += 1);
    }

    fn stats(&self, now: Instant) -> WindowStats {
        self.buckets
            .iter()
            .filter(|b| now.duration_since(b.started) < self.span)
            .fold(WindowStats::default(), |mut acc, b| {
                acc.successes += b.stats.successes;
                acc.failures += b.stats.failures;
                acc.timeouts += b.stats.timeouts;
                acc.rejections += b.stats.rejections;
                acc
            })
    }

    fn reset(&mut self) {
        self.buckets.clear();
    }
}

/// Admission ticket for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Normal,
    Trial,
}

/// A permit held for the lifetime of one `call`.
///
/// If the caller's future is dropped before the call finishes, a normal permit
/// records nothing, while a trial permit counts as a failed trial and reopens
/// the breaker. HALF_OPEN is never left without a trial in flight.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    permit: Option<Permit>,
}

impl Admission<'_> {
    fn finish(mut self, outcome: CallOutcome) {
        if let Some(permit) = self.permit.take() {
            self.breaker.complete(permit, outcome);
        }
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if let Some(Permit::Trial) = self.permit.take() {
            tracing::warn!("Trial call abandoned before completion");
            self.breaker.complete(Permit::Trial, CallOutcome::Failure);
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    window: RollingWindow,
}

/// Process-wide circuit breaker.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
    events: broadcast::Sender<BreakerEvent>,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        let (events, _) = broadcast::channel(16);
        metrics::record_breaker_state(CircuitState::Closed);
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                opened_at: None,
                trial_in_flight: false,
                window: RollingWindow::new(settings.rolling_window, settings.rolling_buckets),
            }),
            settings,
            events,
        }
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Receive every transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    /// Current state. An OPEN breaker whose reset timeout has passed reports
    /// HALF_OPEN; the transition itself happens on the next call.
    pub fn state(&self) -> CircuitState {
        let inner = self.lock();
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) if at.elapsed() >= self.settings.reset_timeout => {
                CircuitState::HalfOpen
            }
            (state, _) => state,
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state();
        let window = self.lock().window.stats(Instant::now());
        BreakerSnapshot {
            state,
            failure_percentage: window.failure_percentage(),
            window,
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// The future is only polled if the breaker admits the call; it runs on a
    /// detached task bounded by the breaker timeout.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let Some(permit) = self.try_acquire() else {
            metrics::record_breaker_rejection();
            return Err(BreakerError::Open);
        };
        let admission = Admission {
            breaker: self,
            permit: Some(permit),
        };

        match run_detached(operation, self.settings.timeout).await {
            Ok(Ok(value)) => {
                admission.finish(CallOutcome::Success);
                Ok(value)
            }
            Ok(Err(err)) => {
                admission.finish(CallOutcome::Failure);
                Err(BreakerError::Failed(err))
            }
            Err(DeadlineError::Elapsed(after)) => {
                tracing::warn!(timeout_ms = after.as_millis() as u64, "Breaker call timed out");
                admission.finish(CallOutcome::Timeout);
                Err(BreakerError::Timeout(after))
            }
            Err(DeadlineError::Crashed(reason)) => {
                tracing::error!(%reason, "Breaker call crashed");
                admission.finish(CallOutcome::Failure);
                Err(BreakerError::Crashed(reason))
            }
        }
    }

    /// Like [`call`](Self::call), but every failure path resolves through
    /// `fallback`. Only the fallback's own error can escape.
    pub async fn call_or_else<F, T, E, Fb, FbFut, X>(&self, operation: F, fallback: Fb) -> Result<T, X>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        Fb: FnOnce(BreakerError<E>) -> FbFut,
        FbFut: Future<Output = Result<T, X>>,
    {
        match self.call(operation).await {
            Ok(value) => Ok(value),
            Err(err) => fallback(err).await,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self) -> Option<Permit> {
        let now = Instant::now();
        let mut inner = self.lock();

        let (permit, transition) = match inner.state {
            CircuitState::Closed => (Some(Permit::Normal), None),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(Duration::MAX, |at| now.duration_since(at));
                if elapsed >= self.settings.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    (Some(Permit::Trial), Some(BreakerEvent::HalfOpen))
                } else {
                    (None, None)
                }
            }
            CircuitState::HalfOpen if !inner.trial_in_flight => {
                inner.trial_in_flight = true;
                (Some(Permit::Trial), None)
            }
            CircuitState::HalfOpen => (None, None),
        };

        if permit.is_none() {
            inner.window.record_rejection(now);
        }
        drop(inner);

        if let Some(event) = transition {
            self.publish(event);
        }
        permit
    }

    fn complete(&self, permit: Permit, outcome: CallOutcome) {
        let now = Instant::now();
        let mut inner = self.lock();

        let transition = match permit {
            Permit::Trial => {
                inner.trial_in_flight = false;
                if outcome == CallOutcome::Success {
                    inner.state = CircuitState::Closed;
                    inner.opened_at = None;
                    inner.window.reset();
                    Some(BreakerEvent::Close)
                } else {
                    inner.window.record(now, outcome);
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    Some(BreakerEvent::Open)
                }
            }
            Permit::Normal => {
                inner.window.record(now, outcome);
                // Late results from calls admitted before a trip only feed the window.
                if inner.state == CircuitState::Closed && self.should_trip(&inner.window.stats(now)) {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    Some(BreakerEvent::Open)
                } else {
                    None
                }
            }
        };
        drop(inner);

        if let Some(event) = transition {
            self.publish(event);
        }
    }

    fn should_trip(&self, stats: &WindowStats) -> bool {
        let calls = stats.calls();
        calls >= self.settings.volume_threshold
            && u64::from(stats.failures + stats.timeouts) * 100
                >= u64::from(self.settings.error_threshold_percentage) * u64::from(calls)
    }

    fn publish(&self, event: BreakerEvent) {
        let state = match event {
            BreakerEvent::Open => {
                tracing::error!("CIRCUIT BREAKER: OPEN");
                CircuitState::Open
            }
            BreakerEvent::HalfOpen => {
                tracing::warn!("CIRCUIT BREAKER: HALF_OPEN, admitting trial call");
                CircuitState::HalfOpen
            }
            BreakerEvent::Close => {
                tracing::info!("CIRCUIT BREAKER: CLOSED");
                CircuitState::Closed
            }
        };
        metrics::record_breaker_transition(state);
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
