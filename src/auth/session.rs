//! Authenticated sessions
//!
//! Sessions are keyed by the SHA-256 of their bearer id, so the map never holds
//! a usable token. Expiry is checked lazily on every read and by the periodic
//! sweep; a session is valid while `now < expires_at`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::clock::Clock;
use super::nonce::generate_secure_token;

/// Default session lifetime (24 hours)
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,
}

/// Stored session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub identity: String,
    pub chain_id: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A newly minted session; the only place the bearer id is ever returned
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: String,
    pub record: SessionRecord,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    /// Mint a session for a verified identity
    pub async fn create(&self, identity: &str, chain_id: u64) -> NewSession {
        let issued_at = self.clock.now();
        let record = SessionRecord {
            identity: identity.to_string(),
            chain_id,
            issued_at,
            expires_at: issued_at + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        let session_id = loop {
            let candidate = generate_secure_token();
            if !sessions.contains_key(&hash_session_id(&candidate)) {
                break candidate;
            }
        };
        sessions.insert(hash_session_id(&session_id), record.clone());

        NewSession { session_id, record }
    }

    /// Look up a live session. Expired sessions are removed on read.
    pub async fn lookup(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        let key = hash_session_id(session_id);
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get(&key) {
            None => return Err(SessionError::NotFound),
            Some(record) => now >= record.expires_at,
        };

        if expired {
            sessions.remove(&key);
            return Err(SessionError::Expired);
        }

        sessions.get(&key).cloned().ok_or(SessionError::NotFound)
    }

    /// Delete a session. Returns whether anything was removed.
    pub async fn revoke(&self, session_id: &str) -> bool {
        let key = hash_session_id(session_id);
        self.sessions.write().await.remove(&key).is_some()
    }

    /// Delete every session belonging to `identity`
    pub async fn revoke_all(&self, identity: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.identity.eq_ignore_ascii_case(identity));
        before - sessions.len()
    }

    /// Remove every expired session, returning how many were dropped
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| now < record.expires_at);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Hash a session id for storage
fn hash_session_id(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hex::encode(hasher.finalize())
}
