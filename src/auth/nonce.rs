//! Single-use challenge nonces
//!
//! Every nonce is bound to the identity it was issued for and expires after a
//! fixed TTL. A nonce leaves the store exactly once: consumed, burned after a
//! failed signature check, evicted on an expired read, or reaped by a sweep.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::clock::Clock;

/// Default nonce lifetime (5 minutes)
pub const DEFAULT_NONCE_TTL_SECONDS: i64 = 300;

/// Nonce store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NonceError {
    #[error("Nonce not found or already used")]
    NotFound,

    #[error("Nonce expired")]
    Expired,

    #[error("Nonce was issued for a different identity")]
    IdentityMismatch,
}

#[derive(Debug, Clone)]
struct NonceEntry {
    identity_hint: String,
    created_at: DateTime<Utc>,
}

/// A freshly issued nonce
#[derive(Debug, Clone)]
pub struct IssuedNonce {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory nonce store
#[derive(Clone)]
pub struct NonceStore {
    entries: Arc<RwLock<HashMap<String, NonceEntry>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl NonceStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    /// Issue a new nonce bound to `identity_hint`
    pub async fn issue(&self, identity_hint: &str) -> IssuedNonce {
        let created_at = self.clock.now();
        let mut entries = self.entries.write().await;

        // 256 bits of entropy; the loop only guards the invariant
        let token = loop {
            let candidate = generate_secure_token();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };

        entries.insert(
            token.clone(),
            NonceEntry {
                identity_hint: identity_hint.to_string(),
                created_at,
            },
        );

        IssuedNonce {
            token,
            created_at,
            expires_at: created_at + self.ttl,
        }
    }

    /// Check a nonce without consuming it
    ///
    /// Runs the same checks as [`NonceStore::consume`]. An expired entry is
    /// evicted; a live one stays in place.
    pub async fn peek(&self, token: &str, claimed_identity: &str) -> Result<String, NonceError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let entry = self.check(&mut entries, token, claimed_identity, now)?;
        Ok(entry.identity_hint.clone())
    }

    /// Atomically consume a nonce, returning the identity it was issued for
    pub async fn consume(
        &self,
        token: &str,
        claimed_identity: &str,
    ) -> Result<String, NonceError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        self.check(&mut entries, token, claimed_identity, now)?;

        entries
            .remove(token)
            .map(|entry| entry.identity_hint)
            .ok_or(NonceError::NotFound)
    }

    /// Remove a nonce unconditionally. Returns whether it was present.
    pub async fn burn(&self, token: &str) -> bool {
        self.entries.write().await.remove(token).is_some()
    }

    /// Remove every expired nonce, returning how many were dropped
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check<'a>(
        &self,
        entries: &'a mut HashMap<String, NonceEntry>,
        token: &str,
        claimed_identity: &str,
        now: DateTime<Utc>,
    ) -> Result<&'a NonceEntry, NonceError> {
        let expired = match entries.get(token) {
            None => return Err(NonceError::NotFound),
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            entries.remove(token);
            return Err(NonceError::Expired);
        }

        let entry = entries.get(token).ok_or(NonceError::NotFound)?;
        if !entry.identity_hint.eq_ignore_ascii_case(claimed_identity) {
            return Err(NonceError::IdentityMismatch);
        }

        Ok(entry)
    }

    fn is_expired(&self, entry: &NonceEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at > self.ttl
    }
}

/// Generate a cryptographically secure token (32 random bytes, hex encoded)
pub(crate) fn generate_secure_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
