//! Per-identity upload rate limiting

mod limiter;

pub use limiter::{RateLimitDecision, UploadRateLimiter};
