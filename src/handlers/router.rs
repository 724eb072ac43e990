//! Router configuration - centralized route definitions.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;

use crate::config::ServerConfig;

use super::{analyze, health};

/// Application state: the immutable server configuration. The engine itself
/// is stateless, so nothing else is shared between requests.
pub type AppState = Arc<ServerConfig>;

/// Routes that must always be reachable (monitoring probes).
pub fn build_public_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .with_state(state)
}

/// Analysis API routes.
pub fn build_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/kpis", post(analyze::list_kpis))
        .route("/api/analyze", post(analyze::analyze_csv))
        .with_state(state)
}

/// Full application router with body-size, concurrency and CORS layers.
pub fn build_router(state: AppState) -> Router {
    let cors = state.cors.to_layer();
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    let concurrency = ConcurrencyLimitLayer::new(state.max_concurrent_requests);

    Router::new()
        .merge(build_public_routes(state.clone()))
        .merge(build_api_routes(state))
        .layer(body_limit)
        .layer(concurrency)
        .layer(cors)
}
