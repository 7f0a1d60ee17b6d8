//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p upgate-api --test upload_test`.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use axum_test::TestServer;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncRead;
use upgate_api::setup::routes;
use upgate_api::AppState;
use upgate_core::{Config, ScanVerdict};
use upgate_services::{
    create_storage, DisabledScanner, MalwareScanner, MemoryStore, UploadAdmissionPipeline,
};

/// Scanner that always answers with the same verdict after draining the body.
pub struct StaticScanner(pub ScanVerdict);

#[async_trait]
impl MalwareScanner for StaticScanner {
    async fn scan(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> ScanVerdict {
        let mut sink = tokio::io::sink();
        let _ = tokio::io::copy(reader, &mut sink).await;
        self.0.clone()
    }
}

/// Test application: server and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub upload_dir: std::path::PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn stored_files(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}

/// Setup test app with local storage, an in-memory store and the given scanner.
/// `overrides` are applied on top of the defaults as environment-style keys.
pub async fn setup_test_app_with(
    overrides: &[(&str, &str)],
    scanner: Arc<dyn MalwareScanner>,
) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let upload_dir = temp_dir.path().join("uploads");

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert(
        "UPLOAD_DIR".to_string(),
        upload_dir.to_string_lossy().to_string(),
    );
    vars.insert("CLAMAV_ENABLED".to_string(), "false".to_string());
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test config");
    config.validate().expect("Test config failed validation");

    let storage = create_storage(&config)
        .await
        .expect("Failed to create storage");
    let store = Arc::new(MemoryStore::new());
    let pipeline =
        UploadAdmissionPipeline::new(config.admission_policy(), storage, scanner, store);
    let state = Arc::new(AppState::new(config.clone(), pipeline));

    let app = routes::setup_routes(&config, state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        upload_dir,
        _temp_dir: temp_dir,
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[], Arc::new(DisabledScanner)).await
}
