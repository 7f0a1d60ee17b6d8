//! HTTP error response shape
//!
//! This module provides the ErrorResponse type for HTTP error responses.
//! Note: IntoResponse for upgate errors lives in the binary crate (upgate-api)
//! because of Rust's orphan rule: external traits (axum::IntoResponse) for
//! external types (upgate_core::AppError) cannot be implemented here.

use serde::Serialize;
use upgate_core::ErrorMetadata;

pub const INTERNAL_ERROR_CODE: &str = "INTERNAL_ERROR";

/// Standard error response format for HTTP APIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    /// Build the client-facing body from anything that self-describes its
    /// presentation. Only `client_message()` is used, never the internal text,
    /// and sensitive errors collapse to `INTERNAL_ERROR`.
    pub fn from_metadata<E: ErrorMetadata>(err: &E) -> Self {
        let code = if err.is_sensitive() {
            INTERNAL_ERROR_CODE
        } else {
            err.error_code()
        };
        Self {
            error: err.client_message(),
            code: code.to_string(),
        }
    }
}
