use async_trait::async_trait;
use tokio::io::AsyncRead;

use upgate_core::ScanVerdict;
use upgate_processing::MalwareScanner;

/// Scanner for development setups without a clamd daemon.
///
/// Reports every payload as clean. Configuration validation refuses it in
/// production.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledScanner;

#[async_trait]
impl MalwareScanner for DisabledScanner {
    async fn scan(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> ScanVerdict {
        // Drain so the caller sees the same stream state as with a real scanner
        let mut sink = tokio::io::sink();
        if let Err(e) = tokio::io::copy(reader, &mut sink).await {
            return ScanVerdict::Unavailable(format!("Failed to read upload: {}", e));
        }
        tracing::warn!("Malware scanning disabled, upload not scanned");
        ScanVerdict::Clean
    }
}
