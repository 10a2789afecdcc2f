use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::resilience::{BreakerSnapshot, CircuitState};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub breaker: CircuitState,
    pub idempotency_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct BreakerSettingsView {
    pub timeout_ms: u64,
    pub reset_timeout_ms: u64,
    pub error_threshold_percentage: u32,
    pub volume_threshold: u32,
    pub rolling_window_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct BreakerStatus {
    #[serde(flatten)]
    pub snapshot: BreakerSnapshot,
    pub settings: BreakerSettingsView,
}

#[derive(Debug, Serialize)]
pub struct IdempotencyStatus {
    pub entries: usize,
    pub ttl_secs: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let breaker = state.pipeline.breaker().state();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if breaker == CircuitState::Closed {
            "operational"
        } else {
            "degraded"
        },
        uptime_secs: state.started_at.elapsed().as_secs(),
        breaker,
        idempotency_entries: state.pipeline.cache().len(),
    })
}

pub async fn get_breaker(State(state): State<AdminState>) -> Json<BreakerStatus> {
    let breaker = state.pipeline.breaker();
    let settings = breaker.settings();
    Json(BreakerStatus {
        snapshot: breaker.snapshot(),
        settings: BreakerSettingsView {
            timeout_ms: settings.timeout.as_millis() as u64,
            reset_timeout_ms: settings.reset_timeout.as_millis() as u64,
            error_threshold_percentage: settings.error_threshold_percentage,
            volume_threshold: settings.volume_threshold,
            rolling_window_ms: settings.rolling_window.as_millis() as u64,
        },
    })
}

pub async fn get_idempotency(State(state): State<AdminState>) -> Json<IdempotencyStatus> {
    let cache = state.pipeline.cache();
    Json(IdempotencyStatus {
        entries: cache.len(),
        ttl_secs: cache.ttl().as_secs(),
    })
}
