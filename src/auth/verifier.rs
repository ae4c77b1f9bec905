//! Signature verification
//!
//! Parses a signed challenge, asks the oracle whether the signature belongs to
//! the embedded identity and reports the identity, nonce and chain id on
//! success. Every failure to reach a positive answer is a rejection.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::identity::IdentityScheme;
use super::message::{ChallengeMessage, MessageError};
use super::oracle::SignatureOracle;

/// Default upper bound on a single oracle call
pub const DEFAULT_ORACLE_TIMEOUT_SECONDS: u64 = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] MessageError),

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Outcome of a successful verification
#[derive(Debug, Clone)]
pub struct VerifiedChallenge {
    /// Signer identity in canonical form
    pub identity: String,
    pub nonce: String,
    pub chain_id: u64,
}

#[derive(Clone)]
pub struct SignatureVerifier {
    scheme: Arc<dyn IdentityScheme>,
    oracle: Arc<dyn SignatureOracle>,
    timeout: Duration,
}

impl SignatureVerifier {
    pub fn new(
        scheme: Arc<dyn IdentityScheme>,
        oracle: Arc<dyn SignatureOracle>,
        timeout: Duration,
    ) -> Self {
        Self {
            scheme,
            oracle,
            timeout,
        }
    }

    /// Parse a challenge and check it belongs to this identity scheme
    pub fn parse(&self, message: &str) -> Result<ChallengeMessage, MessageError> {
        let challenge = ChallengeMessage::parse(message)?;

        if challenge.network != self.scheme.network() {
            return Err(MessageError::InvalidField {
                field: "network",
                reason: format!("expected {}", self.scheme.network()),
            });
        }

        if !self.scheme.validate(&challenge.identity) {
            return Err(MessageError::InvalidField {
                field: "identity",
                reason: "not a valid address".to_string(),
            });
        }

        Ok(challenge)
    }

    /// Parse and verify in one step
    pub async fn verify(
        &self,
        message: &str,
        signature: &str,
    ) -> Result<VerifiedChallenge, VerifyError> {
        let challenge = self.parse(message)?;
        self.verify_parsed(message, challenge, signature).await
    }

    /// Verify the signature over an already parsed challenge
    ///
    /// `message` must be the exact text `challenge` was parsed from; the
    /// oracle checks the signature over those bytes.
    pub async fn verify_parsed(
        &self,
        message: &str,
        challenge: ChallengeMessage,
        signature: &str,
    ) -> Result<VerifiedChallenge, VerifyError> {
        let call = self.oracle.verify(message, signature, &challenge.identity);
        let outcome = tokio::time::timeout(self.timeout, call).await;

        match outcome {
            Ok(Ok(true)) => Ok(VerifiedChallenge {
                identity: self.scheme.normalize(&challenge.identity),
                nonce: challenge.nonce,
                chain_id: challenge.chain_id,
            }),
            Ok(Ok(false)) => Err(VerifyError::InvalidSignature),
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    identity = %challenge.identity,
                    "Signature oracle failed, rejecting"
                );
                Err(VerifyError::InvalidSignature)
            }
            Err(_) => {
                tracing::warn!(
                    identity = %challenge.identity,
                    timeout_ms = %self.timeout.as_millis(),
                    "Signature oracle timed out, rejecting"
                );
                Err(VerifyError::InvalidSignature)
            }
        }
    }
}
