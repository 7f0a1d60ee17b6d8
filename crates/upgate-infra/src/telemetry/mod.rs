//! Telemetry initialization
//!
//! Structured logging through `tracing`, with a human-readable or JSON
//! formatter selected at startup.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, LogFormat};
