//! Data models for Keygate

use serde::Serialize;

pub mod auth;
pub use auth::*;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub active_nonces: usize,
    pub active_sessions: usize,
}
