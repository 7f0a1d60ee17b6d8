//! Health check handler.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
    /// `None` when uploads are not scanned by clamd.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamav: Option<String>,
}

async fn storage_status(state: &AppState) -> String {
    match tokio::fs::metadata(&state.config.upload_dir).await {
        Ok(meta) if meta.is_dir() => "healthy".to_string(),
        Ok(_) => "unhealthy: upload path is not a directory".to_string(),
        Err(e) => format!("unhealthy: {}", e),
    }
}

#[cfg(feature = "clamav")]
async fn clamav_status(state: &AppState) -> Option<String> {
    let clamav = state.clamav.as_ref()?;
    Some(if clamav.is_available().await {
        "healthy".to_string()
    } else {
        "unavailable".to_string()
    })
}

#[cfg(not(feature = "clamav"))]
async fn clamav_status(_state: &AppState) -> Option<String> {
    None
}

/// `GET /health`: always 200 while the process serves requests; the body
/// reports collaborator status so uploads failing closed can be diagnosed.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = storage_status(&state).await;
    let clamav = clamav_status(&state).await;

    let degraded = storage != "healthy" || clamav.as_deref().is_some_and(|s| s != "healthy");
    let status = if degraded { "degraded" } else { "healthy" };

    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: status.to_string(),
            storage,
            clamav,
        }),
    )
}
