//! Eligibility verification gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /eligibility/verify
//!        │
//!        ▼
//!   ┌──────────┐   ┌────────────┐   ┌──────────────────────────────────────┐
//!   │ security │──▶│    http    │──▶│              pipeline                │
//!   │ limit+key│   │  handler   │   │  idempotency cache                   │
//!   └──────────┘   └────────────┘   │    → circuit breaker (timeout)       │
//!                                    │       → retries → clearinghouse      │
//!                                    │    → fallback → spool (RETRY | DLQ)  │
//!                                    └──────────────────────────────────────┘
//!
//!   Cross-cutting: config, observability, lifecycle, admin
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use eligibility_gateway::admin::{setup_admin_router, AdminState};
use eligibility_gateway::config::load_config;
use eligibility_gateway::eligibility::build_verifier;
use eligibility_gateway::lifecycle::{wait_for_signal, Shutdown};
use eligibility_gateway::observability::{logging, metrics};
use eligibility_gateway::spool::build_sink;
use eligibility_gateway::{HttpServer, ResiliencePipeline};

#[derive(Parser)]
#[command(name = "eligibility-gateway", version, about = "Resilient insurance eligibility verification gateway")]
struct Args {
    /// TOML configuration file (falls back to GATEWAY_CONFIG, then defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!("eligibility-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        breaker_timeout_ms = config.breaker.timeout_ms,
        volume_threshold = config.breaker.volume_threshold,
        clearinghouse = ?config.clearinghouse.mode,
        spool = ?config.spool.kind,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let verifier = build_verifier(&config.clearinghouse)?;
    let sink = build_sink(&config.spool).await?;
    let pipeline = Arc::new(ResiliencePipeline::from_config(&config, verifier, sink));

    let shutdown = Shutdown::new();
    let sweeper = pipeline
        .cache()
        .spawn_sweeper(config.idempotency.sweep_interval(), shutdown.subscribe());

    let admin = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(AdminState::new(pipeline.clone(), &config.admin.api_key));
        let mut stop = shutdown.subscribe();
        Some(tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(err) = served {
                tracing::error!(error = %err, "Admin server failed");
            }
        }))
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, pipeline);
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    server.await??;
    if let Some(admin) = admin {
        admin.await?;
    }
    sweeper.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
