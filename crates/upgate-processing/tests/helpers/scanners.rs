use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use upgate_core::ScanVerdict;
use upgate_processing::MalwareScanner;

/// Scanner with a fixed verdict that counts how often it was consulted
pub struct FixedScanner {
    verdict: ScanVerdict,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FixedScanner {
    pub fn clean() -> Self {
        Self::with_verdict(ScanVerdict::Clean)
    }

    pub fn infected(signature: &str) -> Self {
        Self::with_verdict(ScanVerdict::Infected(signature.to_string()))
    }

    pub fn unavailable() -> Self {
        Self::with_verdict(ScanVerdict::Unavailable("connection refused".to_string()))
    }

    /// Answers `Clean`, but only after `delay`
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::clean()
        }
    }

    fn with_verdict(verdict: ScanVerdict) -> Self {
        Self {
            verdict,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MalwareScanner for FixedScanner {
    async fn scan(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> ScanVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut sink = Vec::new();
        if let Err(e) = reader.read_to_end(&mut sink).await {
            return ScanVerdict::Unavailable(e.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.verdict.clone()
    }
}

/// Flags payloads containing the EICAR test signature
pub struct EicarScanner;

pub const EICAR: &[u8] =
    br"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

#[async_trait]
impl MalwareScanner for EicarScanner {
    async fn scan(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> ScanVerdict {
        let mut data = Vec::new();
        if let Err(e) = reader.read_to_end(&mut data).await {
            return ScanVerdict::Unavailable(e.to_string());
        }
        if data.windows(EICAR.len()).any(|w| w == EICAR) {
            ScanVerdict::Infected("Eicar-Signature".to_string())
        } else {
            ScanVerdict::Clean
        }
    }
}
