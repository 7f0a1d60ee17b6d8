//! Application setup and initialization
//!
//! Everything main.rs needs before serving: configuration checks, telemetry,
//! collaborators and routes.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use upgate_core::Config;
use upgate_infra::{init_telemetry, LogFormat};

const SERVICE_NAME: &str = "upgate";

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    init_telemetry(
        LogFormat::parse(&config.log_format),
        SERVICE_NAME,
        &config.environment,
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let state = services::initialize_services(&config).await?;
    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router))
}
