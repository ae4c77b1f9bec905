//! Route definitions for Keygate API

mod auth;

pub use auth::auth_routes;

use axum::{routing::get, Router};

use crate::error::ApiError;
use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the full application router with its middleware stack
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}

async fn root() -> &'static str {
    "Keygate Auth Server"
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".to_string())
}
