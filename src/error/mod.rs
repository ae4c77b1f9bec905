//! Centralized API error handling for Keygate
//!
//! This module provides a unified error type for API responses with proper
//! HTTP status code mapping and JSON error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Auth(e) => match e {
                AuthError::InvalidIdentity(_) => "INVALID_IDENTITY",
                AuthError::MalformedMessage(_) => "MALFORMED_MESSAGE",
                AuthError::NonceNotFound => "NONCE_NOT_FOUND",
                AuthError::NonceExpired => "NONCE_EXPIRED",
                AuthError::IdentityMismatch => "IDENTITY_MISMATCH",
                AuthError::InvalidSignature => "INVALID_SIGNATURE",
                AuthError::NoSession => "NO_SESSION",
                AuthError::SessionExpired => "SESSION_EXPIRED",
            },
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(e) => match e {
                AuthError::InvalidIdentity(_) | AuthError::MalformedMessage(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::IdentityMismatch => StatusCode::FORBIDDEN,
                AuthError::NonceNotFound
                | AuthError::NonceExpired
                | AuthError::InvalidSignature
                | AuthError::NoSession
                | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        tracing::debug!(error = %message, code = %error_code, "Client error occurred");

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::BadRequest("test".to_string()).error_code(),
            "BAD_REQUEST"
        );
        assert_eq!(
            ApiError::from(AuthError::NonceExpired).error_code(),
            "NONCE_EXPIRED"
        );
        assert_eq!(
            ApiError::from(AuthError::NoSession).error_code(),
            "NO_SESSION"
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidIdentity("x".to_string())).error_code(),
            "INVALID_IDENTITY"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(AuthError::MalformedMessage("x".to_string())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidSignature).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::IdentityMismatch).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
