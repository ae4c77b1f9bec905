//! Authentication service
//!
//! Orchestrates the challenge → verify → session flow:
//!
//! 1. `request_challenge` validates the identity, issues a nonce and renders
//!    the challenge message.
//! 2. `complete_challenge` checks, in this order: message syntax and domain,
//!    nonce presence/expiry/identity binding, the signature (via the oracle,
//!    with no store lock held), then consumes the nonce atomically and mints a
//!    session. A rejected signature burns the nonce.
//! 3. `require_session` / `end_session` serve protected resources.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::clock::Clock;
use super::identity::IdentityScheme;
use super::message::{ChallengeMessage, MessageError};
use super::nonce::{NonceError, NonceStore, DEFAULT_NONCE_TTL_SECONDS};
use super::oracle::SignatureOracle;
use super::session::{SessionError, SessionRecord, SessionStore, DEFAULT_SESSION_TTL_SECONDS};
use super::verifier::{SignatureVerifier, VerifyError, DEFAULT_ORACLE_TIMEOUT_SECONDS};

/// Auth service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Nonce not found or already used")]
    NonceNotFound,

    #[error("Nonce expired")]
    NonceExpired,

    #[error("Nonce was issued for a different identity")]
    IdentityMismatch,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Session not found")]
    NoSession,

    #[error("Session expired")]
    SessionExpired,
}

impl From<NonceError> for AuthError {
    fn from(e: NonceError) -> Self {
        match e {
            NonceError::NotFound => AuthError::NonceNotFound,
            NonceError::Expired => AuthError::NonceExpired,
            NonceError::IdentityMismatch => AuthError::IdentityMismatch,
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound => AuthError::NoSession,
            SessionError::Expired => AuthError::SessionExpired,
        }
    }
}

impl From<MessageError> for AuthError {
    fn from(e: MessageError) -> Self {
        AuthError::MalformedMessage(e.to_string())
    }
}

impl From<VerifyError> for AuthError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::Malformed(e) => e.into(),
            VerifyError::InvalidSignature => AuthError::InvalidSignature,
        }
    }
}

/// Settings for the challenge protocol
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Domain shown in the challenge header; signed messages must match it
    pub domain: String,
    pub uri: String,
    /// Single-line statement rendered into every challenge
    pub statement: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce_ttl: Duration,
    pub session_ttl: Duration,
    pub oracle_timeout: std::time::Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            domain: "localhost:3001".to_string(),
            uri: "http://localhost:3001".to_string(),
            statement: "Sign in to prove you control this account.".to_string(),
            version: "1".to_string(),
            chain_id: 1,
            nonce_ttl: Duration::seconds(DEFAULT_NONCE_TTL_SECONDS),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECONDS),
            oracle_timeout: std::time::Duration::from_secs(DEFAULT_ORACLE_TIMEOUT_SECONDS),
        }
    }
}

/// Challenge handed to a client for signing
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub message: String,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of a completed challenge
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub session_id: String,
    pub identity: String,
    pub chain_id: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Live entry counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthStats {
    pub active_nonces: usize,
    pub active_sessions: usize,
}

/// Entries removed by one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub nonces: usize,
    pub sessions: usize,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    settings: AuthSettings,
    scheme: Arc<dyn IdentityScheme>,
    nonces: NonceStore,
    sessions: SessionStore,
    verifier: SignatureVerifier,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        settings: AuthSettings,
        scheme: Arc<dyn IdentityScheme>,
        oracle: Arc<dyn SignatureOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let nonces = NonceStore::new(clock.clone(), settings.nonce_ttl);
        let sessions = SessionStore::new(clock, settings.session_ttl);
        let verifier = SignatureVerifier::new(scheme.clone(), oracle, settings.oracle_timeout);

        Self {
            settings,
            scheme,
            nonces,
            sessions,
            verifier,
        }
    }

    /// Issue a challenge for `identity`
    pub async fn request_challenge(&self, identity: &str) -> Result<IssuedChallenge, AuthError> {
        if !self.scheme.validate(identity) {
            return Err(AuthError::InvalidIdentity(format!(
                "expected a {} address",
                self.scheme.network()
            )));
        }

        let issued = self.nonces.issue(&self.scheme.normalize(identity)).await;

        let message = ChallengeMessage {
            domain: self.settings.domain.clone(),
            network: self.scheme.network().to_string(),
            identity: identity.to_string(),
            statement: self.settings.statement.clone(),
            uri: self.settings.uri.clone(),
            version: self.settings.version.clone(),
            chain_id: self.settings.chain_id,
            nonce: issued.token.clone(),
            issued_at: issued.created_at,
        }
        .build();

        tracing::debug!(
            identity = %identity,
            nonce = %short(&issued.token),
            "Issued challenge"
        );

        Ok(IssuedChallenge {
            message,
            nonce: issued.token,
            issued_at: issued.created_at,
            expires_at: issued.expires_at,
        })
    }

    /// Verify a signed challenge and establish a session
    pub async fn complete_challenge(
        &self,
        message: &str,
        signature: &str,
    ) -> Result<EstablishedSession, AuthError> {
        let challenge = self.verifier.parse(message)?;

        if challenge.domain != self.settings.domain {
            return Err(AuthError::MalformedMessage(format!(
                "challenge was issued for domain {}",
                challenge.domain
            )));
        }

        let nonce = challenge.nonce.clone();
        let claimed = self.scheme.normalize(&challenge.identity);

        // No store lock is held across the oracle call; the nonce is checked
        // here and again by the atomic consume below.
        self.nonces.peek(&nonce, &claimed).await?;

        let verified = match self.verifier.verify_parsed(message, challenge, signature).await {
            Ok(verified) => verified,
            Err(e) => {
                self.nonces.burn(&nonce).await;
                tracing::info!(identity = %claimed, error = %e, "Challenge rejected");
                return Err(e.into());
            }
        };

        self.nonces.consume(&verified.nonce, &verified.identity).await?;

        let session = self
            .sessions
            .create(&verified.identity, verified.chain_id)
            .await;

        tracing::info!(
            identity = %verified.identity,
            chain_id = verified.chain_id,
            session = %short(&session.session_id),
            "Session established"
        );

        Ok(EstablishedSession {
            session_id: session.session_id,
            identity: session.record.identity,
            chain_id: session.record.chain_id,
            issued_at: session.record.issued_at,
            expires_at: session.record.expires_at,
        })
    }

    /// Resolve a session id for a protected resource
    pub async fn require_session(&self, session_id: &str) -> Result<SessionRecord, AuthError> {
        Ok(self.sessions.lookup(session_id).await?)
    }

    /// End a session. Unknown or expired ids are not an error.
    pub async fn end_session(&self, session_id: &str) {
        if self.sessions.revoke(session_id).await {
            tracing::debug!(session = %short(session_id), "Session ended");
        }
    }

    /// End every session of the identity that owns `session_id`
    pub async fn end_all_sessions(&self, session_id: &str) -> Result<usize, AuthError> {
        let record = self.require_session(session_id).await?;
        let revoked = self.sessions.revoke_all(&record.identity).await;

        tracing::info!(identity = %record.identity, revoked, "Ended all sessions");
        Ok(revoked)
    }

    /// Drop expired nonces and sessions
    pub async fn sweep(&self) -> SweepReport {
        SweepReport {
            nonces: self.nonces.sweep().await,
            sessions: self.sessions.sweep().await,
        }
    }

    pub async fn stats(&self) -> AuthStats {
        AuthStats {
            active_nonces: self.nonces.len().await,
            active_sessions: self.sessions.len().await,
        }
    }
}

/// Log-safe prefix of a secret token
fn short(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}
