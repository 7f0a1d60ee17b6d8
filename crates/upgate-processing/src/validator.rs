use upgate_core::models::normalize_media_type;
use upgate_core::{AdmissionPolicy, RejectionReason};

/// Validation failures on size and content type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid media type: {media_type} (allowed: {allowed:?})")]
    InvalidMediaType {
        media_type: String,
        allowed: Vec<String>,
    },

    #[error("Media type {media_type} does not match extension '{extension}' (expected one of: {expected})")]
    ExtensionMismatch {
        extension: String,
        media_type: String,
        expected: String,
    },
}

impl From<ValidationError> for RejectionReason {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { .. } => RejectionReason::FileTooLarge,
            ValidationError::InvalidMediaType { .. } | ValidationError::ExtensionMismatch { .. } => {
                RejectionReason::InvalidType
            }
        }
    }
}

/// Media types a file with the given extension may legitimately sniff as.
/// `None` for extensions without a known mapping.
pub fn expected_media_types(extension: &str) -> Option<&'static [&'static str]> {
    let expected: &'static [&'static str] = match extension {
        // Images
        "jpg" | "jpeg" => &["image/jpeg"],
        "png" => &["image/png"],
        "gif" => &["image/gif"],
        "webp" => &["image/webp"],
        "avif" => &["image/avif"],
        "bmp" => &["image/bmp"],
        "tif" | "tiff" => &["image/tiff"],
        "ico" => &["image/x-icon", "image/vnd.microsoft.icon"],
        // Audio and video
        "mp3" => &["audio/mpeg"],
        "wav" => &["audio/x-wav", "audio/wav"],
        "ogg" => &["audio/ogg", "application/ogg"],
        "flac" => &["audio/x-flac", "audio/flac"],
        "mp4" => &["video/mp4"],
        "webm" => &["video/webm"],
        "mov" => &["video/quicktime"],
        // Documents
        "pdf" => &["application/pdf"],
        "txt" => &["text/plain"],
        "csv" => &["text/plain", "text/csv"],
        "zip" => &["application/zip"],
        "gz" => &["application/gzip"],
        _ => return None,
    };
    Some(expected)
}

/// Size and media type checks driven by the admission policy
pub struct MediaValidator {
    max_file_size: u64,
    policy: AdmissionPolicy,
}

impl MediaValidator {
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            max_file_size: policy.max_file_size,
            policy,
        }
    }

    /// Check the caller-declared size, if any, before a byte is read
    pub fn validate_declared_size(&self, declared: Option<u64>) -> Result<(), ValidationError> {
        match declared {
            Some(size) => self.validate_size(size),
            None => Ok(()),
        }
    }

    pub fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Check a sniffed media type against the allowlist
    pub fn validate_media_type(&self, media_type: &str) -> Result<(), ValidationError> {
        if !self.policy.allows_media_type(media_type) {
            return Err(ValidationError::InvalidMediaType {
                media_type: media_type.to_string(),
                allowed: self.policy.allowed_media_types.clone(),
            });
        }
        Ok(())
    }

    /// Check that the sniffed media type is consistent with the validated extension
    ///
    /// Extensions without a known mapping pass; the allowlists still apply to them.
    pub fn validate_extension_media_type_match(
        &self,
        extension: &str,
        media_type: &str,
    ) -> Result<(), ValidationError> {
        let extension = extension.trim_start_matches('.').to_lowercase();
        let normalized = normalize_media_type(media_type);

        let Some(expected) = expected_media_types(&extension) else {
            tracing::debug!(
                extension = %extension,
                media_type = %normalized,
                "Unknown extension, skipping media type/extension cross-validation"
            );
            return Ok(());
        };

        if !expected.iter().any(|mt| *mt == normalized) {
            return Err(ValidationError::ExtensionMismatch {
                extension,
                media_type: normalized,
                expected: expected.join(", "),
            });
        }

        Ok(())
    }
}
