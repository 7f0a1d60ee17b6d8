//! Upgate Core Library
//!
//! This crate provides the domain types, error taxonomy and configuration
//! shared by every upgate component: the admission policy, the upload request
//! and storage descriptor, scan verdicts and rejection reasons.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AdmissionOutcome, AdmissionPolicy, AdmissionState, QuotaMode, RejectionReason, ScanVerdict,
    StorageDescriptor, UploadRequest,
};
