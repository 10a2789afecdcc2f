//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline, breaker, cache, HTTP layer:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout / log aggregation
//!     → Prometheus scrape listener
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every HTTP log line via the trace span
//! - Metrics are cheap and safe to record before an exporter is installed

pub mod logging;
pub mod metrics;
