//! Operator API, served on its own listener behind a bearer token.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::time::Instant;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::pipeline::ResiliencePipeline;

#[derive(Clone)]
pub struct AdminState {
    pub pipeline: Arc<ResiliencePipeline>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(pipeline: Arc<ResiliencePipeline>, api_key: &str) -> Self {
        Self {
            pipeline,
            api_key: Arc::from(api_key),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breaker", get(get_breaker))
        .route("/admin/idempotency", get(get_idempotency))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::eligibility::SimulatedClearinghouse;
    use crate::spool::LogSpoolSink;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router() -> Router {
        let pipeline = ResiliencePipeline::from_config(
            &GatewayConfig::default(),
            Arc::new(SimulatedClearinghouse::new(0.0, Duration::ZERO)),
            Arc::new(LogSpoolSink),
        );
        setup_admin_router(AdminState::new(Arc::new(pipeline), "secret"))
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let response = router()
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router()
            .oneshot(
                Request::get("/admin/status")
                    .header("authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_breaker_view() {
        let response = router()
            .oneshot(
                Request::get("/admin/breaker")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["state"], "CLOSED");
        assert_eq!(body["window"]["failures"], 0);
        assert_eq!(body["settings"]["volume_threshold"], 100);
        assert_eq!(body["settings"]["timeout_ms"], 5000);
    }
}
