//! API handlers for Keygate

pub mod auth;
pub mod health;

pub use auth::*;
pub use health::health_check;

pub use crate::middleware::auth::AuthenticatedSession;
