//! Authentication HTTP handlers
//!
//! Endpoints for key-ownership authentication.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use validator::Validate;

use super::AuthenticatedSession;
use crate::error::ApiResult;
use crate::models::{
    ChallengeRequest, ChallengeResponse, LogoutAllResponse, SessionInfoResponse, SessionResponse,
    VerifyRequest,
};
use crate::state::AppState;

/// POST /auth/challenge - Request a challenge message for an identity
pub async fn request_challenge(
    State(state): State<AppState>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> ApiResult<Json<ChallengeResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let challenge = state
        .auth_service
        .request_challenge(req.identity.trim())
        .await?;

    Ok(Json(challenge.into()))
}

/// POST /auth/verify - Verify a signed challenge and establish a session
pub async fn verify_signature(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let session = state
        .auth_service
        .complete_challenge(&req.message, &req.signature)
        .await?;

    Ok(Json(session.into()))
}

/// GET /auth/session - Describe the caller's session
pub async fn get_session(session: AuthenticatedSession) -> Json<SessionInfoResponse> {
    Json(session.record.into())
}

/// POST /auth/logout - End the current session
///
/// Always succeeds, including for missing, unknown or expired sessions.
pub async fn logout(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> StatusCode {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        state.auth_service.end_session(bearer.token()).await;
    }

    StatusCode::NO_CONTENT
}

/// POST /auth/logout-all - End every session of the caller's identity
pub async fn logout_all(
    State(state): State<AppState>,
    session: AuthenticatedSession,
) -> ApiResult<Json<LogoutAllResponse>> {
    let revoked_sessions = state
        .auth_service
        .end_all_sessions(&session.session_id)
        .await?;

    Ok(Json(LogoutAllResponse { revoked_sessions }))
}
