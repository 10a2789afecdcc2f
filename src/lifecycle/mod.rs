//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_signal resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server drains, admin server stops, sweeper exits
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
