//! Configuration module
//!
//! Process configuration is read once from environment variables (a `.env`
//! file is honoured via `dotenvy`) and turned into an immutable
//! [`AdmissionPolicy`] plus the settings of the storage, scanner and HTTP
//! collaborators.

use std::env;
use std::time::Duration;

use crate::models::{AdmissionPolicy, QuotaMode};

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_FILE_SIZE_MB: u64 = 5;
const RATE_LIMIT_WINDOW_SECS: u64 = 60;
const RATE_LIMIT_QUOTA: u32 = 1;
const HASH_TTL_SECS: u64 = 3600;
const SNIFF_BYTES: usize = 1024;
const FILE_PERMISSIONS: &str = "640";
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_TIMEOUT_SECS: u64 = 30;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub log_format: String,
    // Storage configuration
    pub upload_dir: String,
    pub upload_base_url: String,
    // Admission policy
    pub max_file_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_media_types: Vec<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_quota: u32,
    pub rate_limit_quota_mode: QuotaMode,
    pub hash_ttl_secs: u64,
    pub sniff_bytes: usize,
    pub file_permissions: u32,
    pub reject_double_extensions: bool,
    pub require_extension_match: bool,
    // ClamAV configuration
    pub clamav_enabled: bool,
    pub clamav_host: String,
    pub clamav_port: u16,
    pub clamav_timeout_secs: u64,
    // HTTP
    /// Header carrying the uploader identity, set by a trusted upstream.
    /// `None` keys the upload quota on the peer IP address.
    pub identity_header: Option<String>,
    pub http_concurrency_limit: usize,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // A missing .env file is fine; real deployments set variables directly.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let max_file_size_mb = var("MAX_FILE_SIZE_MB", &MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("MAX_FILE_SIZE_MB must be a valid number"))?;

        let file_permissions = u32::from_str_radix(
            var("FILE_PERMISSIONS", FILE_PERMISSIONS).trim_start_matches("0o"),
            8,
        )
        .map_err(|_| anyhow::anyhow!("FILE_PERMISSIONS must be an octal mode such as 640"))?;

        let config = Config {
            server_port: var("PORT", &SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            log_format: var("LOG_FORMAT", "text").to_lowercase(),
            upload_dir: var("UPLOAD_DIR", "./secure_uploads"),
            upload_base_url: var("UPLOAD_BASE_URL", "/secure-media"),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_extensions: split_list(&var("ALLOWED_EXTENSIONS", "jpg,jpeg,png,gif,pdf"))
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            allowed_media_types: split_list(&var(
                "ALLOWED_MEDIA_TYPES",
                "image/jpeg,image/png,image/gif,application/pdf",
            )),
            rate_limit_window_secs: var(
                "RATE_LIMIT_WINDOW_SECS",
                &RATE_LIMIT_WINDOW_SECS.to_string(),
            )
            .parse()
            .unwrap_or(RATE_LIMIT_WINDOW_SECS),
            rate_limit_quota: var("RATE_LIMIT_QUOTA", &RATE_LIMIT_QUOTA.to_string())
                .parse()
                .unwrap_or(RATE_LIMIT_QUOTA),
            rate_limit_quota_mode: var("RATE_LIMIT_QUOTA_MODE", "attempt")
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?,
            hash_ttl_secs: var("HASH_TTL_SECS", &HASH_TTL_SECS.to_string())
                .parse()
                .unwrap_or(HASH_TTL_SECS),
            sniff_bytes: var("SNIFF_BYTES", &SNIFF_BYTES.to_string())
                .parse()
                .unwrap_or(SNIFF_BYTES),
            file_permissions,
            reject_double_extensions: parse_bool(&var("REJECT_DOUBLE_EXTENSIONS", "true")),
            require_extension_match: parse_bool(&var("REQUIRE_EXTENSION_MATCH", "true")),
            clamav_enabled: parse_bool(&var("CLAMAV_ENABLED", "true")),
            clamav_host: var("CLAMAV_HOST", "localhost"),
            clamav_port: var("CLAMAV_PORT", &CLAMAV_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CLAMAV_PORT must be a valid number"))?,
            clamav_timeout_secs: var("CLAMAV_TIMEOUT_SECS", &CLAMAV_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CLAMAV_TIMEOUT_SECS),
            identity_header: lookup("IDENTITY_HEADER")
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty()),
            http_concurrency_limit: var(
                "HTTP_CONCURRENCY_LIMIT",
                &HTTP_CONCURRENCY_LIMIT.to_string(),
            )
            .parse()
            .map_err(|_| anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be a valid number"))?,
        };

        Ok(config)
    }

    /// Check the configuration for values that cannot be served safely.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.admission_policy()
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid admission policy: {}", e))?;

        if self.is_production() && !self.clamav_enabled {
            return Err(anyhow::anyhow!(
                "CLAMAV_ENABLED cannot be false in production; uploads must be scanned"
            ));
        }

        if self.clamav_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "CLAMAV_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!(
                "HTTP_CONCURRENCY_LIMIT must be greater than zero"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Build the immutable admission policy handed to the pipeline.
    pub fn admission_policy(&self) -> AdmissionPolicy {
        AdmissionPolicy {
            max_file_size: self.max_file_size_bytes,
            allowed_extensions: self.allowed_extensions.clone(),
            allowed_media_types: self.allowed_media_types.clone(),
            rate_limit_window: Duration::from_secs(self.rate_limit_window_secs),
            rate_limit_quota: self.rate_limit_quota,
            quota_mode: self.rate_limit_quota_mode,
            sniff_bytes: self.sniff_bytes,
            hash_ttl: Duration::from_secs(self.hash_ttl_secs),
            scan_timeout: Duration::from_secs(self.clamav_timeout_secs),
            file_mode: self.file_permissions,
            reject_double_extensions: self.reject_double_extensions,
            require_extension_match: self.require_extension_match,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
