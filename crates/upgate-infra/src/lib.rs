//! Upgate Infrastructure Library
//!
//! This crate provides shared infrastructure components used by the upgate services:
//! - Keyed ephemeral store (rate-limit counters, integrity records)
//! - Per-identity upload rate limiting
//! - Middleware (security headers)
//! - Telemetry initialization
//! - Error response shape

pub mod error;
pub mod store;

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-export commonly used types
pub use error::ErrorResponse;
pub use store::{EphemeralStore, MemoryStore, StoreError, StoreResult};

#[cfg(feature = "middleware")]
pub use middleware::security_headers_middleware;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{RateLimitDecision, UploadRateLimiter};
