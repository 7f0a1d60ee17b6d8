//! Upload endpoint integration tests.
//!
//! Run with: `cargo test -p upgate-api --test upload_test`

mod helpers;

use std::sync::Arc;

use helpers::fixtures::{file_form, large_png, pdf_bytes, png_bytes};
use helpers::{setup_test_app, setup_test_app_with, StaticScanner};
use serde_json::Value;
use upgate_core::ScanVerdict;

#[tokio::test]
async fn test_upload_png_succeeds() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/upload")
        .multipart(file_form("pic.png", "image/png", png_bytes()))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["media_type"], "image/png");
    assert_eq!(body["size"], png_bytes().len() as u64);
    assert_eq!(body["hash"].as_str().map(str::len), Some(64));
    let filename = body["filename"].as_str().expect("filename");
    assert!(filename.ends_with(".png"));
    assert_ne!(filename, "pic.png");
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_traversal_name_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/upload")
        .multipart(file_form("../../etc/passwd.png", "image/png", png_bytes()))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_FILENAME");
    assert_eq!(body["error"], "Invalid filename");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_oversize_upload_returns_413() {
    let app = setup_test_app_with(
        &[("MAX_FILE_SIZE_MB", "1")],
        Arc::new(StaticScanner(ScanVerdict::Clean)),
    )
    .await;

    let response = app
        .client()
        .post("/upload")
        .multipart(file_form(
            "photo.png",
            "image/png",
            large_png(1024 * 1024 + 4096),
        ))
        .await;

    assert_eq!(response.status_code(), 413);
    let body: Value = response.json();
    assert_eq!(body["code"], "FILE_TOO_LARGE");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_second_upload_is_rate_limited() {
    let app = setup_test_app_with(
        &[("IDENTITY_HEADER", "x-user-id")],
        Arc::new(StaticScanner(ScanVerdict::Clean)),
    )
    .await;
    let client = app.client();

    let first = client
        .post("/upload")
        .add_header("x-user-id", "carol")
        .multipart(file_form("pic.png", "image/png", png_bytes()))
        .await;
    assert_eq!(first.status_code(), 200);

    let second = client
        .post("/upload")
        .add_header("x-user-id", "carol")
        .multipart(file_form("pic.png", "image/png", png_bytes()))
        .await;
    assert_eq!(second.status_code(), 429);
    let retry_after: u64 = second
        .header("retry-after")
        .to_str()
        .expect("ascii header")
        .parse()
        .expect("seconds");
    assert!((1..=60).contains(&retry_after));
    let body: Value = second.json();
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");

    // Quotas are per identity
    let other = client
        .post("/upload")
        .add_header("x-user-id", "dave")
        .multipart(file_form("pic.png", "image/png", png_bytes()))
        .await;
    assert_eq!(other.status_code(), 200);
}

#[tokio::test]
async fn test_scanner_unavailable_returns_503() {
    let app = setup_test_app_with(
        &[],
        Arc::new(StaticScanner(ScanVerdict::Unavailable(
            "connection refused".to_string(),
        ))),
    )
    .await;

    let response = app
        .client()
        .post("/upload")
        .multipart(file_form("doc.pdf", "application/pdf", pdf_bytes()))
        .await;

    assert_eq!(response.status_code(), 503);
    let body: Value = response.json();
    assert_eq!(body["code"], "SECURITY_CHECK_FAILED");
    assert!(!response.text().contains("connection refused"));
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_infected_upload_rejected() {
    let app = setup_test_app_with(
        &[],
        Arc::new(StaticScanner(ScanVerdict::Infected(
            "Eicar-Signature".to_string(),
        ))),
    )
    .await;

    let response = app
        .client()
        .post("/upload")
        .multipart(file_form("doc.pdf", "application/pdf", pdf_bytes()))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "CONTAINS_MALWARE");
    assert!(!response.text().contains("Eicar"));
}

#[tokio::test]
async fn test_disguised_content_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/upload")
        .multipart(file_form("shell.png", "image/png", b"<?php system($_GET['c']); ?>".to_vec()))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_TYPE");
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = setup_test_app().await;

    let form = axum_test::multipart::MultipartForm::new().add_text("comment", "hello");
    let response = app
        .client()
        .post("/upload")
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "NO_FILE");
}

#[tokio::test]
async fn test_client_identity_header_does_not_reset_quota() {
    let app = setup_test_app().await;
    let client = app.client();

    let mut statuses = Vec::new();
    for i in 0..5 {
        let response = client
            .post("/upload")
            .add_header("x-user-id", format!("spoofed-{}", i))
            .multipart(file_form("pic.png", "image/png", png_bytes()))
            .await;
        statuses.push(response.status_code().as_u16());
    }

    assert_eq!(statuses, vec![200, 429, 429, 429, 429]);
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_concurrency_limit_from_config() {
    let app = setup_test_app_with(
        &[("HTTP_CONCURRENCY_LIMIT", "1")],
        Arc::new(StaticScanner(ScanVerdict::Clean)),
    )
    .await;

    for _ in 0..3 {
        assert_eq!(app.client().get("/health").await.status_code(), 200);
    }
    let response = app
        .client()
        .post("/upload")
        .multipart(file_form("pic.png", "image/png", png_bytes()))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/upload")
        .multipart(file_form("../evil.png", "image/png", png_bytes()))
        .await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert_eq!(response.header("cache-control"), "no-store");
    assert!(response
        .header("content-security-policy")
        .to_str()
        .expect("ascii header")
        .contains("default-src 'none'"));
    assert!(response.maybe_header("referrer-policy").is_some());
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "healthy");
    assert!(body.get("clamav").is_none());
    assert_eq!(response.header("x-content-type-options"), "nosniff");
}
