//! Identity schemes
//!
//! An identity scheme decides what a syntactically valid identity looks like,
//! how identities are compared, and which network name appears in the
//! challenge header.

use super::crypto::decode_stellar_public_key;

/// Pluggable identity validator
pub trait IdentityScheme: Send + Sync {
    /// Network name shown in the challenge header ("... with your <network> account:")
    fn network(&self) -> &str;

    /// Whether `identity` is syntactically valid for this scheme
    fn validate(&self, identity: &str) -> bool;

    /// Canonical form used for comparisons and session records
    fn normalize(&self, identity: &str) -> String;
}

/// EVM account address: `0x` followed by 40 hex digits
#[derive(Debug, Clone, Copy, Default)]
pub struct EvmAddress;

impl IdentityScheme for EvmAddress {
    fn network(&self) -> &str {
        "Ethereum"
    }

    fn validate(&self, identity: &str) -> bool {
        match identity.strip_prefix("0x") {
            Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }

    fn normalize(&self, identity: &str) -> String {
        identity.to_ascii_lowercase()
    }
}

/// Stellar account strkey (`G...`, 56 characters, checksummed)
#[derive(Debug, Clone, Copy, Default)]
pub struct StellarAddress;

impl IdentityScheme for StellarAddress {
    fn network(&self) -> &str {
        "Stellar"
    }

    fn validate(&self, identity: &str) -> bool {
        identity.len() == 56 && decode_stellar_public_key(identity).is_ok()
    }

    fn normalize(&self, identity: &str) -> String {
        identity.to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_address_validation() {
        let scheme = EvmAddress;
        assert!(scheme.validate("0xAbC0000000000000000000000000000000000001"));
        assert!(scheme.validate("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd"));

        assert!(!scheme.validate("abcdefabcdefabcdefabcdefabcdefabcdefabcd"));
        assert!(!scheme.validate("0XABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD"));
        assert!(!scheme.validate("0xabc"));
        assert!(!scheme.validate("0xgggggggggggggggggggggggggggggggggggggggg"));
        assert!(!scheme.validate("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd00"));
        assert!(!scheme.validate(""));
    }

    #[test]
    fn test_evm_address_normalization() {
        assert_eq!(
            EvmAddress.normalize("0xAbC0000000000000000000000000000000000001"),
            "0xabc0000000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_stellar_address_validation() {
        let scheme = StellarAddress;
        assert!(scheme.validate("GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7"));
        assert!(!scheme.validate("GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN"));
        assert!(!scheme.validate("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd"));
        assert_eq!(scheme.network(), "Stellar");
    }
}
