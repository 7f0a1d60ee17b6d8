//! Types flowing through a single admission: request, verdicts and result.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorMetadata, LogLevel};

/// An inbound upload handed to the pipeline by the HTTP layer.
///
/// Everything except `body` is caller-supplied metadata and is treated as
/// untrusted. `declared_content_type` and `declared_size` are advisory only.
pub struct UploadRequest<R> {
    /// Opaque token for the uploading principal.
    pub identity: String,
    pub declared_filename: String,
    pub declared_content_type: Option<String>,
    pub declared_size: Option<u64>,
    pub body: R,
}

impl<R> UploadRequest<R> {
    pub fn new(identity: impl Into<String>, declared_filename: impl Into<String>, body: R) -> Self {
        Self {
            identity: identity.into(),
            declared_filename: declared_filename.into(),
            declared_content_type: None,
            declared_size: None,
            body,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.declared_content_type = Some(content_type.into());
        self
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }
}

impl<R> fmt::Debug for UploadRequest<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("identity", &self.identity)
            .field("declared_filename", &self.declared_filename)
            .field("declared_content_type", &self.declared_content_type)
            .field("declared_size", &self.declared_size)
            .finish_non_exhaustive()
    }
}

/// Handle to a persisted upload, produced only after every check passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    /// Generated name: `{timestamp}_{uuid}.{ext}`.
    pub safe_name: String,
    /// Key under which the storage backend holds the bytes.
    pub storage_key: String,
    /// Bytes persisted.
    pub size: u64,
    /// Hex-encoded SHA-256 of the persisted bytes.
    pub hash: String,
    /// Media type derived from the content, not from caller metadata.
    pub media_type: String,
}

/// Result of consulting the malware scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean,
    /// Signature name reported by the scanner.
    Infected(String),
    /// The scanner could not be consulted or answered with garbage.
    Unavailable(String),
}

/// Why an upload was not admitted. Closed set; never carries internal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum RejectionReason {
    #[error("File too large")]
    FileTooLarge,
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("Invalid file extension")]
    InvalidExtension,
    #[error("Invalid file type")]
    InvalidType,
    #[error("File contains malware")]
    ContainsMalware,
    #[error("Security check failed")]
    SecurityCheckFailed,
    #[error("Upload rate limit exceeded")]
    RateLimitExceeded,
    #[error("Upload incomplete")]
    Incomplete,
}

/// Static metadata for each reason: (http_status, error_code, recoverable, log_level).
fn rejection_static_metadata(reason: &RejectionReason) -> (u16, &'static str, bool, LogLevel) {
    match reason {
        RejectionReason::FileTooLarge => (413, "FILE_TOO_LARGE", false, LogLevel::Debug),
        RejectionReason::InvalidFilename => (400, "INVALID_FILENAME", false, LogLevel::Warn),
        RejectionReason::InvalidExtension => (400, "INVALID_EXTENSION", false, LogLevel::Debug),
        RejectionReason::InvalidType => (400, "INVALID_TYPE", false, LogLevel::Warn),
        RejectionReason::ContainsMalware => (400, "CONTAINS_MALWARE", false, LogLevel::Warn),
        RejectionReason::SecurityCheckFailed => {
            (503, "SECURITY_CHECK_FAILED", true, LogLevel::Error)
        }
        RejectionReason::RateLimitExceeded => (429, "RATE_LIMIT_EXCEEDED", true, LogLevel::Warn),
        RejectionReason::Incomplete => (400, "UPLOAD_INCOMPLETE", true, LogLevel::Debug),
    }
}

impl ErrorMetadata for RejectionReason {
    fn http_status_code(&self) -> u16 {
        rejection_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        rejection_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        rejection_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn is_sensitive(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        rejection_static_metadata(self).3
    }
}

/// Final verdict of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Admitted(StorageDescriptor),
    Rejected(RejectionReason),
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionOutcome::Admitted(_))
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            AdmissionOutcome::Rejected(reason) => Some(*reason),
            AdmissionOutcome::Admitted(_) => None,
        }
    }

    pub fn descriptor(&self) -> Option<&StorageDescriptor> {
        match self {
            AdmissionOutcome::Admitted(descriptor) => Some(descriptor),
            AdmissionOutcome::Rejected(_) => None,
        }
    }
}

/// Last state an admission reached. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AdmissionState {
    Received,
    SizeChecked,
    NameValidated,
    TypeSniffed,
    Scanned,
    HashRecorded,
    Admitted,
}

impl fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdmissionState::Received => "received",
            AdmissionState::SizeChecked => "size_checked",
            AdmissionState::NameValidated => "name_validated",
            AdmissionState::TypeSniffed => "type_sniffed",
            AdmissionState::Scanned => "scanned",
            AdmissionState::HashRecorded => "hash_recorded",
            AdmissionState::Admitted => "admitted",
        };
        f.write_str(name)
    }
}
