//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the verify and health endpoints
//! - Wire up middleware (request id, tracing, timeout, body limit, headers)
//! - Guard the verify endpoint with rate limiting and API key auth
//! - Hand validated requests to the resilience pipeline
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Request},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{GatewayConfig, SecurityConfig};
use crate::eligibility::validate_request;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::ApiError;
use crate::pipeline::{Outcome, ResiliencePipeline, VerificationRequest};
use crate::security::auth::api_key_middleware;
use crate::security::headers::with_security_headers;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResiliencePipeline>,
    pub security: Arc<SecurityConfig>,
}

/// HTTP front end of the eligibility gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    pub fn new(config: GatewayConfig, pipeline: Arc<ResiliencePipeline>) -> Self {
        let state = AppState {
            pipeline,
            security: Arc::new(config.security.clone()),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut verify = Router::new()
            .route("/eligibility/verify", post(verify_handler))
            .route_layer(middleware::from_fn_with_state(
                state.security.clone(),
                api_key_middleware,
            ));

        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiterState::from_config(&config.rate_limit));
            verify = verify.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let router = Router::new()
            .route("/health", get(health_handler))
            .merge(verify)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        let router = if config.security.enable_headers {
            with_security_headers(router)
        } else {
            router
        };

        router
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %request.request_id(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for serving on a custom listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `POST /eligibility/verify`: 200 with the outcome, queued or not.
async fn verify_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Outcome>, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("invalid JSON body: {err}")))?;

    if state.security.strict_validation {
        validate_request(&payload)?;
    }

    let mut request = VerificationRequest::new(payload);
    if let Some(key) = headers.idempotency_key() {
        request = request.with_idempotency_key(key);
    }

    tracing::debug!(
        request_id = %headers.request_id(),
        keyed = request.idempotency_key.is_some(),
        "Verifying eligibility"
    );

    let outcome = state.pipeline.execute_detached(request).await?;
    Ok(Json(outcome))
}

/// `GET /health`: liveness plus the breaker state.
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "breaker": state.pipeline.breaker().state(),
    }))
}
