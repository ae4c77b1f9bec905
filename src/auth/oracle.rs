//! Signature verification oracles
//!
//! The oracle is the only component that touches key material. It answers a
//! single question: was `message` signed by the private key behind `identity`?

use async_trait::async_trait;
use thiserror::Error;

use super::crypto::{recover_personal_sign_address, verify_stellar_signature, CryptoError};

/// Oracle failures that are not a plain "signature does not match"
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Verification backend unavailable: {0}")]
    Unavailable(String),

    #[error("Verification backend failed: {0}")]
    Backend(String),
}

/// Pluggable signature verification capability
///
/// `Ok(false)` means the signature does not belong to `identity`. `Err` means
/// the oracle could not give an answer; callers must treat both as a rejection.
/// Malformed keys and signatures are `Ok(false)`, never an `OracleError`.
#[async_trait]
pub trait SignatureOracle: Send + Sync {
    async fn verify(
        &self,
        message: &str,
        signature: &str,
        identity: &str,
    ) -> Result<bool, OracleError>;
}

/// EIP-191 `personal_sign` verification for EVM accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct EvmPersonalSignOracle;

#[async_trait]
impl SignatureOracle for EvmPersonalSignOracle {
    async fn verify(
        &self,
        message: &str,
        signature: &str,
        identity: &str,
    ) -> Result<bool, OracleError> {
        match recover_personal_sign_address(message, signature) {
            Ok(recovered) => Ok(recovered.eq_ignore_ascii_case(identity)),
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting EVM signature");
                Ok(false)
            }
        }
    }
}

/// Ed25519 verification for Stellar accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct StellarEd25519Oracle;

#[async_trait]
impl SignatureOracle for StellarEd25519Oracle {
    async fn verify(
        &self,
        message: &str,
        signature: &str,
        identity: &str,
    ) -> Result<bool, OracleError> {
        match verify_stellar_signature(identity, message, signature) {
            Ok(()) => Ok(true),
            Err(CryptoError::VerificationFailed) => Ok(false),
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting Stellar signature");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::{build_eip191_message, evm_address, keccak256};
    use k256::ecdsa::SigningKey;

    fn sign(key: &SigningKey, message: &str) -> String {
        let hash = keccak256(build_eip191_message(message).as_bytes());
        let (signature, recovery_id) = key.sign_prehash_recoverable(&hash).unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte());
        hex::encode(bytes)
    }

    #[tokio::test]
    async fn test_evm_oracle_accepts_matching_key() {
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let address = evm_address(key.verifying_key()).to_uppercase().replacen("0X", "0x", 1);
        let signature = sign(&key, "hello");

        assert!(EvmPersonalSignOracle
            .verify("hello", &signature, &address)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_evm_oracle_rejects_other_key() {
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let other = SigningKey::from_slice(&[4u8; 32]).unwrap();
        let signature = sign(&other, "hello");
        let address = evm_address(key.verifying_key());

        assert!(!EvmPersonalSignOracle
            .verify("hello", &signature, &address)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_evm_oracle_rejects_garbage() {
        assert!(!EvmPersonalSignOracle
            .verify("hello", "not-hex", "0x0000000000000000000000000000000000000000")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_stellar_oracle_rejects_bad_key() {
        assert!(!StellarEd25519Oracle
            .verify("hello", "AAAA", "GNOTAKEY")
            .await
            .unwrap());
    }
}
