//! Health check handler

use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::state::AppState;

/// GET /health - Liveness and store occupancy
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.auth_service.stats().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.as_str().to_string(),
        active_nonces: stats.active_nonces,
        active_sessions: stats.active_sessions,
    })
}
