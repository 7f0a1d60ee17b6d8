//! Shared HTTP middleware for upgate services

pub mod security_headers;

pub use security_headers::security_headers_middleware;
