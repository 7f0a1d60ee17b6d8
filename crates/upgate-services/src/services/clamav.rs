use async_trait::async_trait;
use clamav_client::{clean, Tcp};
use std::str;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

use upgate_core::ScanVerdict;
use upgate_processing::MalwareScanner;

/// clamd client over TCP.
///
/// Every failure (connection, protocol, timeout) is reported as
/// `ScanVerdict::Unavailable`, never as clean.
#[derive(Clone)]
pub struct ClamAVService {
    host: String,
    port: u16,
    /// Timeout in seconds for each scan operation (default: 30)
    timeout_secs: u64,
}

impl ClamAVService {
    /// Create a new ClamAVService.
    ///
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    pub fn new(host: String, port: u16) -> Self {
        Self::with_timeout(host, port, 30)
    }

    /// Create with a custom scan timeout (for large files or slow ClamAV instances).
    pub fn with_timeout(host: String, port: u16, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            timeout_secs,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether clamd answers PING with PONG.
    pub async fn is_available(&self) -> bool {
        let address = self.address();
        let result = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            tokio::task::spawn_blocking(move || {
                let connection = Tcp {
                    host_address: address.as_str(),
                };
                clamav_client::ping(connection)
            }),
        )
        .await;

        matches!(result, Ok(Ok(Ok(ref response))) if response[..] == clamav_client::PONG[..])
    }

    /// Scan in-memory data using sync API inside spawn_blocking to avoid !Send tokio futures.
    pub async fn scan_bytes(&self, data: Vec<u8>) -> ScanVerdict {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, size_bytes = data.len(), "Starting ClamAV scan");
        let address = self.address();

        let timeout_secs = self.timeout_secs;
        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || {
                let connection = Tcp {
                    host_address: address.as_str(),
                };
                match clamav_client::scan_buffer(data.as_slice(), connection, None) {
                    Ok(response_bytes) => interpret_response(&response_bytes, start),
                    Err(e) => {
                        let error_msg = format!("ClamAV scan error: {}", e);
                        tracing::error!(error = %error_msg, "ClamAV scan failed");
                        ScanVerdict::Unavailable(error_msg)
                    }
                }
            }),
        )
        .await;

        match result {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                let error_msg = format!("ClamAV scan task join error: {}", e);
                tracing::error!(error = %error_msg, "ClamAV scan panicked");
                ScanVerdict::Unavailable(error_msg)
            }
            Err(_) => {
                let error_msg = format!("ClamAV scan timeout (exceeded {} seconds)", timeout_secs);
                tracing::error!(error = %error_msg, "ClamAV scan timeout");
                ScanVerdict::Unavailable(error_msg)
            }
        }
    }
}

/// Turn a clamd reply into a verdict.
fn interpret_response(response_bytes: &[u8], start: Instant) -> ScanVerdict {
    match clean(response_bytes) {
        Ok(true) => {
            tracing::info!(
                duration_ms = start.elapsed().as_millis(),
                "File scan completed: clean"
            );
            ScanVerdict::Clean
        }
        Ok(false) => {
            let response_str = str::from_utf8(response_bytes)
                .map(|s| s.trim_end_matches('\0').trim())
                .unwrap_or("");
            // "stream: Eicar-Signature FOUND"
            if !response_str.ends_with("FOUND") {
                let error_msg = format!("Unexpected ClamAV response: {}", response_str);
                tracing::error!(error = %error_msg, "ClamAV returned an error reply");
                return ScanVerdict::Unavailable(error_msg);
            }
            let signature = signature_name(response_str);
            tracing::warn!(
                duration_ms = start.elapsed().as_millis(),
                virus = %signature,
                "File scan detected virus"
            );
            ScanVerdict::Infected(signature)
        }
        Err(e) => {
            let error_msg = format!("Failed to parse ClamAV response: {}", e);
            tracing::error!(error = %error_msg, "Failed to parse ClamAV response");
            ScanVerdict::Unavailable(error_msg)
        }
    }
}

fn signature_name(response: &str) -> String {
    response
        .split(':')
        .nth(1)
        .unwrap_or("unknown")
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_string()
}

#[async_trait]
impl MalwareScanner for ClamAVService {
    #[tracing::instrument(skip(self, reader), fields(host = %self.host, port = self.port))]
    async fn scan(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> ScanVerdict {
        // The pipeline hands over a spool already bounded by the size policy
        let mut data = Vec::new();
        if let Err(e) = reader.read_to_end(&mut data).await {
            let error_msg = format!("Failed to read upload for scanning: {}", e);
            tracing::error!(error = %error_msg, "ClamAV scan aborted");
            return ScanVerdict::Unavailable(error_msg);
        }
        self.scan_bytes(data).await
    }
}
