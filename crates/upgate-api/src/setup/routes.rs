//! Route configuration and setup

use crate::handlers;
use crate::middleware::identity_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use upgate_core::Config;
use upgate_infra::security_headers_middleware;

/// Room for multipart framing on top of the largest admissible file, so an
/// oversize upload is rejected by the pipeline with a proper reason.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let body_limit =
        usize::try_from(config.max_file_size_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX);

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = config.http_concurrency_limit.max(1);

    tracing::info!(
        body_limit_bytes = body_limit,
        http_concurrency_limit,
        "HTTP limits configured"
    );

    let upload_routes = Router::new()
        .route("/upload", post(handlers::upload::upload_file))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(upload_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(security_headers_middleware))
}
