//! Integrity records: SHA-256 digests of admitted files, kept in the
//! ephemeral store for later verification.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

use upgate_core::AppError;
use upgate_infra::store::{EphemeralStore, StoreResult};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub struct IntegrityRecorder {
    store: Arc<dyn EphemeralStore>,
    ttl: Duration,
}

impl IntegrityRecorder {
    pub fn new(store: Arc<dyn EphemeralStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(safe_name: &str) -> String {
        format!("file_hash_{}", safe_name)
    }

    /// Hex SHA-256 of everything the reader yields, read in 64 KiB chunks.
    pub async fn compute_digest(
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> std::io::Result<String> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Hash the reader and record the digest under `file_hash_{safe_name}`.
    #[tracing::instrument(skip(self, reader))]
    pub async fn compute_and_record(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        safe_name: &str,
    ) -> Result<String, AppError> {
        let digest = Self::compute_digest(reader).await?;
        self.store
            .set(&Self::key(safe_name), digest.clone(), self.ttl)
            .await?;
        tracing::debug!(hash = %digest, "Integrity hash recorded");
        Ok(digest)
    }

    pub async fn recorded_hash(&self, safe_name: &str) -> StoreResult<Option<String>> {
        self.store.get(&Self::key(safe_name)).await
    }

    /// Whether the reader's bytes match the recorded digest. False when no
    /// record exists (never recorded, or expired).
    pub async fn verify(
        &self,
        safe_name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<bool, AppError> {
        let Some(recorded) = self.recorded_hash(safe_name).await? else {
            return Ok(false);
        };
        let actual = Self::compute_digest(reader).await?;
        Ok(recorded == actual)
    }

    pub async fn forget(&self, safe_name: &str) -> StoreResult<()> {
        self.store.remove(&Self::key(safe_name)).await
    }
}
