//! Filename sanitization
//!
//! Declared filenames are attacker-controlled. The only part of one that
//! survives into storage is its validated, lower-cased extension; the stored
//! name itself is generated.

use chrono::Utc;
use uuid::Uuid;

use upgate_core::{AdmissionPolicy, RejectionReason};

#[derive(Debug, Clone)]
pub struct NameSanitizer {
    allowed_extensions: Vec<String>,
    reject_double_extensions: bool,
}

impl NameSanitizer {
    pub fn new(policy: &AdmissionPolicy) -> Self {
        Self {
            allowed_extensions: policy.allowed_extensions.clone(),
            reject_double_extensions: policy.reject_double_extensions,
        }
    }

    /// Whether a declared name tries to address a location of its own choosing:
    /// parent references, absolute paths, drive prefixes, NUL or control characters.
    pub fn is_traversal(name: &str) -> bool {
        let bytes = name.as_bytes();
        name.contains("..")
            || name.starts_with('/')
            || name.starts_with('\\')
            || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
            || name.chars().any(|c| c == '\0' || c.is_control())
    }

    /// Last path component, splitting on both `/` and `\`.
    pub fn base_name(name: &str) -> &str {
        name.rsplit(['/', '\\']).next().unwrap_or(name)
    }

    /// Validate the declared name and return its lower-cased extension.
    pub fn validated_extension(&self, declared: &str) -> Result<String, RejectionReason> {
        if declared.trim().is_empty() || Self::is_traversal(declared) {
            return Err(RejectionReason::InvalidFilename);
        }

        let base = Self::base_name(declared).trim();
        let Some((stem, extension)) = base.rsplit_once('.') else {
            return Err(RejectionReason::InvalidExtension);
        };

        if stem.is_empty() {
            return Err(RejectionReason::InvalidFilename);
        }

        let extension = extension.to_lowercase();
        if !self.allowed_extensions.iter().any(|e| *e == extension) {
            return Err(RejectionReason::InvalidExtension);
        }

        // "shell.php.png" style names
        if self.reject_double_extensions && stem.contains('.') {
            return Err(RejectionReason::InvalidExtension);
        }

        Ok(extension)
    }

    /// `{YYYYmmdd_HHMMSS}_{uuid-v4}.{extension}`
    pub fn generate(extension: &str) -> String {
        format!(
            "{}_{}.{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            Uuid::new_v4(),
            extension
        )
    }

    /// Turn a declared name into a fresh storage name.
    ///
    /// Every call generates a new name, including for names this sanitizer
    /// produced itself.
    pub fn sanitize(&self, declared: &str) -> Result<String, RejectionReason> {
        let extension = self.validated_extension(declared)?;
        Ok(Self::generate(&extension))
    }
}
