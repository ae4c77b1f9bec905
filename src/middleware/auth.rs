//! Authentication middleware
//!
//! Extractor for bearer session ids.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::{AuthService, SessionRecord};
use crate::error::ApiError;

/// Caller authenticated by a live session
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session_id: String,
    pub record: SessionRecord,
}

/// Extractor for authenticated sessions
///
/// Reads the session id from the `Authorization: Bearer` header and resolves
/// it through [`AuthService::require_session`].
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(session: AuthenticatedSession) -> impl IntoResponse {
///     format!("Hello, {}", session.record.identity)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedSession
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                    .into_response()
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let record = auth_service
            .require_session(bearer.token())
            .await
            .map_err(|e| ApiError::from(e).into_response())?;

        Ok(AuthenticatedSession {
            session_id: bearer.token().to_string(),
            record,
        })
    }
}
