//! Collaborator traits for the admission pipeline.

use async_trait::async_trait;
use tokio::io::AsyncRead;

use upgate_core::ScanVerdict;

/// Malware scanner consulted before anything is persisted.
///
/// Implementations report failures as `ScanVerdict::Unavailable` rather
/// than erroring; the pipeline treats that as a failed security check.
#[async_trait]
pub trait MalwareScanner: Send + Sync {
    async fn scan(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> ScanVerdict;
}
