//! Eligibility verification gateway library.

pub mod admin;
pub mod config;
pub mod eligibility;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod resilience;
pub mod security;
pub mod spool;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Outcome, ResiliencePipeline, VerificationRequest};
