//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Permission change failed: {0}")]
    PermissionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Reader over persisted bytes.
pub type StoredReader = Pin<Box<dyn AsyncRead + Send>>;

/// What a backend reports after persisting an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Internal identifier used to reference the file later.
    pub key: String,
    /// Final location (filesystem path for the local backend).
    pub path: String,
    /// Publicly routable URL for the file.
    pub url: String,
    /// Bytes written.
    pub size: u64,
}

/// Storage abstraction trait
///
/// The admission pipeline only hands bytes to a backend after every check
/// passed, so backends never see rejected uploads. A failed `save` must not
/// leave a partially written object behind.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist the reader's bytes under `name`. Fails with `AlreadyExists`
    /// rather than overwriting an existing object.
    async fn save(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredObject>;

    /// Narrow the permissions of a stored object to `mode` (Unix permission bits).
    async fn set_permissions(&self, key: &str, mode: u32) -> StorageResult<()>;

    /// Open a stored object for reading.
    async fn open(&self, key: &str) -> StorageResult<StoredReader>;

    /// Delete a stored object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a stored object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
