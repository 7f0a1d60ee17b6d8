//! Upgate Services Layer
//!
//! This crate is the **service layer**: it hosts the external malware scanner
//! client and re-exports a unified API from infrastructure, processing, and
//! storage so that the API crate depends on a single service facade. Keep
//! coordination here; keep thin HTTP handling in upgate-api.

pub mod services;

#[cfg(feature = "rate-limit")]
pub use upgate_infra::{EphemeralStore, MemoryStore, RateLimitDecision, UploadRateLimiter};
pub use upgate_processing::{
    ContentSniffer, IntegrityRecorder, MalwareScanner, MediaValidator, NameSanitizer,
    UploadAdmissionPipeline,
};
pub use upgate_storage::{
    create_storage, LocalStorage, Storage, StorageError, StorageResult, StoredObject,
};

#[cfg(feature = "clamav")]
pub use services::clamav::ClamAVService;
pub use services::disabled::DisabledScanner;
