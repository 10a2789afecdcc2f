//! Metrics collection and exposition.
//!
//! # Metrics
//! - `eligibility_requests_total` (counter): resolved requests by outcome
//! - `eligibility_request_duration_seconds` (histogram): `execute` latency
//! - `eligibility_verify_attempts_total` (counter): clearinghouse attempts by result
//! - `eligibility_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `eligibility_breaker_transitions_total` (counter): transitions by target state
//! - `eligibility_breaker_rejections_total` (counter): calls refused while open
//! - `eligibility_spooled_total` (counter): spooled requests by queue
//! - `eligibility_idempotency_lookups_total` (counter): hit, miss, expired
//! - `eligibility_idempotency_entries` (gauge): cache size
//! - `eligibility_rate_limited_total` (counter): requests refused by the limiter
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::Instant;

use crate::pipeline::outcome::ResolutionPath;
use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(err) => tracing::error!(address = %addr, error = %err, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str, start: Instant) {
    ::metrics::counter!("eligibility_requests_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("eligibility_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_attempt(result: &'static str) {
    ::metrics::counter!("eligibility_verify_attempts_total", "result" => result).increment(1);
}

fn state_value(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    }
}

pub fn record_breaker_state(state: CircuitState) {
    ::metrics::gauge!("eligibility_breaker_state").set(state_value(state));
}

pub fn record_breaker_transition(to: CircuitState) {
    ::metrics::counter!("eligibility_breaker_transitions_total", "to" => to.as_str()).increment(1);
    record_breaker_state(to);
}

pub fn record_breaker_rejection() {
    ::metrics::counter!("eligibility_breaker_rejections_total").increment(1);
}

pub fn record_spooled(queue: ResolutionPath) {
    ::metrics::counter!("eligibility_spooled_total", "queue" => queue.as_str()).increment(1);
}

pub fn record_idempotency_lookup(result: &'static str) {
    ::metrics::counter!("eligibility_idempotency_lookups_total", "result" => result).increment(1);
}

pub fn record_idempotency_entries(entries: usize) {
    ::metrics::gauge!("eligibility_idempotency_entries").set(entries as f64);
}

pub fn record_rate_limited() {
    ::metrics::counter!("eligibility_rate_limited_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_state_gauge_ordering() {
        assert!(state_value(CircuitState::Closed) < state_value(CircuitState::HalfOpen));
        assert!(state_value(CircuitState::HalfOpen) < state_value(CircuitState::Open));
    }
}
