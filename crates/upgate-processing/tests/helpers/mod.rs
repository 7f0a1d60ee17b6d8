#![allow(dead_code)]

pub mod fixtures;
pub mod scanners;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::AsyncRead;

use upgate_core::AdmissionPolicy;
use upgate_infra::MemoryStore;
use upgate_processing::{MalwareScanner, UploadAdmissionPipeline};
use upgate_storage::{LocalStorage, Storage, StorageError, StorageResult, StoredObject, StoredReader};

/// Pipeline wired to a temporary local storage root and an in-memory store
pub struct TestPipeline {
    pub pipeline: UploadAdmissionPipeline,
    pub store: Arc<MemoryStore>,
    pub upload_dir: std::path::PathBuf,
    pub _temp_dir: TempDir,
}

impl TestPipeline {
    /// Number of files currently in the storage root
    pub fn stored_files(&self) -> Vec<std::path::PathBuf> {
        list_files(&self.upload_dir)
    }
}

pub fn list_files(dir: &Path) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Setup a pipeline over local storage with the given policy and scanner
pub async fn setup_pipeline(
    policy: AdmissionPolicy,
    scanner: Arc<dyn MalwareScanner>,
) -> TestPipeline {
    setup_pipeline_with_store(policy, scanner, MemoryStore::new()).await
}

/// Same as [`setup_pipeline`] over a caller-configured store
pub async fn setup_pipeline_with_store(
    policy: AdmissionPolicy,
    scanner: Arc<dyn MalwareScanner>,
    store: MemoryStore,
) -> TestPipeline {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let upload_dir = temp_dir.path().join("secure_uploads");
    let storage = LocalStorage::new(upload_dir.clone(), "/secure-media".to_string())
        .await
        .expect("Failed to create local storage");

    let store = Arc::new(store);
    let pipeline = UploadAdmissionPipeline::new(policy, Arc::new(storage), scanner, store.clone());

    TestPipeline {
        pipeline,
        store,
        upload_dir,
        _temp_dir: temp_dir,
    }
}

/// Setup a pipeline whose storage rejects every save
pub async fn setup_failing_pipeline(
    policy: AdmissionPolicy,
    scanner: Arc<dyn MalwareScanner>,
) -> (UploadAdmissionPipeline, Arc<MemoryStore>, Arc<FailingStorage>) {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(FailingStorage::default());
    let pipeline = UploadAdmissionPipeline::new(policy, storage.clone(), scanner, store.clone());
    (pipeline, store, storage)
}

/// Storage backend that fails on save and records cleanup calls
#[derive(Default)]
pub struct FailingStorage {
    pub deletes: AtomicUsize,
}

#[async_trait]
impl Storage for FailingStorage {
    async fn save(
        &self,
        _name: &str,
        _reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredObject> {
        Err(StorageError::UploadFailed("disk quota exceeded".to_string()))
    }

    async fn set_permissions(&self, _key: &str, _mode: u32) -> StorageResult<()> {
        Ok(())
    }

    async fn open(&self, key: &str) -> StorageResult<StoredReader> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }
}
