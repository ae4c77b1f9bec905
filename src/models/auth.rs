//! Authentication request/response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{EstablishedSession, IssuedChallenge, SessionRecord};

/// Request for authentication challenge
#[derive(Debug, Deserialize, Validate)]
pub struct ChallengeRequest {
    #[validate(length(min = 1, max = 128))]
    pub identity: String,
}

/// Response containing the authentication challenge
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub message: String,
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

/// Request to verify a signed challenge
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
    #[validate(length(min = 1, max = 1024))]
    pub signature: String,
}

/// Newly established session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub identity: String,
    pub chain_id: u64,
    pub expires_at: DateTime<Utc>,
}

/// Details of the caller's current session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfoResponse {
    pub identity: String,
    pub chain_id: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutAllResponse {
    pub revoked_sessions: usize,
}

impl From<IssuedChallenge> for ChallengeResponse {
    fn from(challenge: IssuedChallenge) -> Self {
        Self {
            message: challenge.message,
            nonce: challenge.nonce,
            expires_at: challenge.expires_at,
        }
    }
}

impl From<EstablishedSession> for SessionResponse {
    fn from(session: EstablishedSession) -> Self {
        Self {
            session_id: session.session_id,
            identity: session.identity,
            chain_id: session.chain_id,
            expires_at: session.expires_at,
        }
    }
}

impl From<SessionRecord> for SessionInfoResponse {
    fn from(record: SessionRecord) -> Self {
        Self {
            identity: record.identity,
            chain_id: record.chain_id,
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        }
    }
}
