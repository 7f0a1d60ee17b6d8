//! Admission policy: the immutable rule set an upload is checked against.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
pub const DEFAULT_SNIFF_BYTES: usize = 1024;
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_HASH_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_FILE_MODE: u32 = 0o640;

/// When a rate-limit slot is consumed.
///
/// `ConsumeOnAttempt` records the slot before any validation runs, so a
/// rejected upload still uses up the identity's window. `ConsumeOnSuccess`
/// only checks the slot up front and records it once the upload is admitted;
/// the check and the record are not atomic, so concurrent attempts from one
/// identity may both be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaMode {
    #[default]
    ConsumeOnAttempt,
    ConsumeOnSuccess,
}

impl fmt::Display for QuotaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaMode::ConsumeOnAttempt => write!(f, "attempt"),
            QuotaMode::ConsumeOnSuccess => write!(f, "success"),
        }
    }
}

impl FromStr for QuotaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "attempt" | "consume_on_attempt" => Ok(QuotaMode::ConsumeOnAttempt),
            "success" | "consume_on_success" => Ok(QuotaMode::ConsumeOnSuccess),
            other => Err(format!(
                "Invalid quota mode '{}'. Must be 'attempt' or 'success'",
                other
            )),
        }
    }
}

/// Rules applied by the admission pipeline.
///
/// Extensions are stored lower-cased without a leading dot. Media types are
/// stored lower-cased; an entry of the form `family/*` matches every type in
/// that family, any other entry must match exactly.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_media_types: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_quota: u32,
    pub quota_mode: QuotaMode,
    pub sniff_bytes: usize,
    pub hash_ttl: Duration,
    pub scan_timeout: Duration,
    pub file_mode: u32,
    pub reject_double_extensions: bool,
    pub require_extension_match: bool,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "pdf"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_media_types: ["image/jpeg", "image/png", "image/gif", "application/pdf"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            rate_limit_quota: 1,
            quota_mode: QuotaMode::default(),
            sniff_bytes: DEFAULT_SNIFF_BYTES,
            hash_ttl: DEFAULT_HASH_TTL,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            file_mode: DEFAULT_FILE_MODE,
            reject_double_extensions: true,
            require_extension_match: true,
        }
    }
}

impl AdmissionPolicy {
    /// Whether `extension` (any case, with or without a leading dot) is allowlisted.
    pub fn allows_extension(&self, extension: &str) -> bool {
        let normalized = extension.trim_start_matches('.').to_lowercase();
        !normalized.is_empty() && self.allowed_extensions.iter().any(|e| *e == normalized)
    }

    /// Whether a sniffed media type is allowlisted.
    pub fn allows_media_type(&self, media_type: &str) -> bool {
        let normalized = normalize_media_type(media_type);
        self.allowed_media_types.iter().any(|allowed| {
            match allowed.strip_suffix("/*") {
                Some(family) => normalized
                    .split_once('/')
                    .is_some_and(|(f, _)| f == family),
                None => *allowed == normalized,
            }
        })
    }

    /// Check the rule set for values that would make every upload fail or
    /// weaken the stored-file permissions.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_file_size == 0 {
            return Err("max_file_size must be greater than zero".to_string());
        }
        if self.allowed_extensions.is_empty() {
            return Err("allowed_extensions must not be empty".to_string());
        }
        if self.allowed_media_types.is_empty() {
            return Err("allowed_media_types must not be empty".to_string());
        }
        if self.rate_limit_quota == 0 {
            return Err("rate_limit_quota must be greater than zero".to_string());
        }
        if self.rate_limit_window.is_zero() {
            return Err("rate_limit_window must be greater than zero".to_string());
        }
        if self.sniff_bytes == 0 {
            return Err("sniff_bytes must be greater than zero".to_string());
        }
        if self.file_mode & 0o111 != 0 {
            return Err(format!(
                "file_mode {:o} must not grant execute permission",
                self.file_mode
            ));
        }
        if self.file_mode & 0o007 != 0 {
            return Err(format!(
                "file_mode {:o} must not grant world permissions",
                self.file_mode
            ));
        }
        Ok(())
    }
}

/// Strip MIME parameters and lower-case (e.g. "Image/PNG; q=1" -> "image/png").
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
        .to_lowercase()
}
