//! Health endpoint.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use super::router::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub mc_draws: usize,
}

/// GET /health - liveness probe and effective engine defaults.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mc_draws: state.draws,
    })
}
