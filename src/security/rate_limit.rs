//! Per-client rate limiting middleware.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::http::response::ApiError;
use crate::observability::metrics;

/// A simple token bucket.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_per_sec: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_full(&self, capacity: f64, refill_per_sec: f64, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens + elapsed * refill_per_sec >= capacity
    }
}

/// Buckets above this count trigger a sweep of fully refilled ones.
const SWEEP_THRESHOLD: usize = 10_000;

/// Token buckets keyed by client IP.
pub struct RateLimiterState {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    refill_per_sec: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            refill_per_sec: f64::from(requests_per_minute) / 60.0,
            burst: f64::from(burst.max(1)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_minute, config.burst_size)
    }

    /// Take a token for `key`. Returns `false` when the client is over its limit.
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= SWEEP_THRESHOLD {
            let now = Instant::now();
            buckets.retain(|_, b| !b.is_full(self.burst, self.refill_per_sec, now));
        }

        buckets
            .entry(key.to_owned())
            .or_insert_with(|| TokenBucket::new(self.burst))
            .try_acquire(self.burst, self.refill_per_sec)
    }
}

/// Middleware function for per-IP rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if state.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited();
        ApiError::RateLimited.into_response()
    }
}
