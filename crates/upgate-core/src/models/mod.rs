//! Domain models for upload admission

pub mod policy;
pub mod upload;

pub use policy::{normalize_media_type, AdmissionPolicy, QuotaMode};
pub use upload::{
    AdmissionOutcome, AdmissionState, RejectionReason, ScanVerdict, StorageDescriptor,
    UploadRequest,
};
