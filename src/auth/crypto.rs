//! Signature primitives for the supported key types
//!
//! - Stellar: ed25519 over the raw message, keys encoded as `G...` strkeys
//! - EVM: secp256k1 over the EIP-191 prefixed message, keys identified by
//!   their 20-byte keccak address

use base32::Alphabet;
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey as EcdsaVerifyingKey};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Stellar strkey version byte for ed25519 public keys ('G')
const STELLAR_ACCOUNT_VERSION: u8 = 6 << 3;

/// Errors that can occur during signature verification
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Invalid address checksum")]
    InvalidChecksum,

    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Verify an ed25519 signature from a Stellar account
///
/// # Arguments
/// * `public_key` - Stellar G-address (e.g., "GABC...")
/// * `message` - The message that was signed
/// * `signature_base64` - Base64-encoded 64-byte signature
pub fn verify_stellar_signature(
    public_key: &str,
    message: &str,
    signature_base64: &str,
) -> Result<(), CryptoError> {
    let public_key_bytes = decode_stellar_public_key(public_key)?;

    let signature_bytes = decode_base64(signature_base64)?;

    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let verifying_key = VerifyingKey::from_bytes(&public_key_bytes)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    verifying_key
        .verify(message.as_bytes(), &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Decode a Stellar public key from G-address format
///
/// Stellar addresses are base32-encoded with a version byte prefix
/// and a 2-byte CRC16 checksum at the end.
pub fn decode_stellar_public_key(address: &str) -> Result<[u8; 32], CryptoError> {
    if !address.starts_with('G') {
        return Err(CryptoError::InvalidAddressFormat(
            "Stellar public keys must start with 'G'".to_string(),
        ));
    }

    let decoded = base32::decode(Alphabet::Rfc4648 { padding: false }, address)
        .ok_or_else(|| CryptoError::InvalidAddressFormat("Invalid base32 encoding".to_string()))?;

    // 1 version byte + 32 key bytes + 2 checksum bytes
    if decoded.len() != 35 {
        return Err(CryptoError::InvalidAddressFormat(format!(
            "Expected 35 bytes, got {}",
            decoded.len()
        )));
    }

    if decoded[0] != STELLAR_ACCOUNT_VERSION {
        return Err(CryptoError::InvalidAddressFormat(
            "Unexpected strkey version byte".to_string(),
        ));
    }

    let payload = &decoded[..33];
    let checksum = &decoded[33..35];
    if checksum != crc16_xmodem(payload) {
        return Err(CryptoError::InvalidChecksum);
    }

    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&decoded[1..33]);

    Ok(public_key)
}

/// Encode a raw ed25519 public key as a Stellar G-address
pub fn encode_stellar_public_key(public_key: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(35);
    payload.push(STELLAR_ACCOUNT_VERSION);
    payload.extend_from_slice(public_key);
    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum);

    base32::encode(Alphabet::Rfc4648 { padding: false }, &payload)
}

/// Calculate CRC16-XModem checksum (used by Stellar)
fn crc16_xmodem(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0;

    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }

    // Little-endian byte order
    [(crc & 0xff) as u8, (crc >> 8) as u8]
}

/// Decode base64, accepting both the standard and URL-safe alphabets
fn decode_base64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let input = encoded.trim();
    general_purpose::STANDARD
        .decode(input)
        .or_else(|_| general_purpose::URL_SAFE.decode(input))
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(input))
        .or_else(|_| general_purpose::URL_SAFE_NO_PAD.decode(input))
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))
}

/// Compute Keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Build EIP-191 message for signing
///
/// Format: "\x19Ethereum Signed Message:\n" + len(message) + message
pub fn build_eip191_message(message: &str) -> String {
    format!("\x19Ethereum Signed Message:\n{}{}", message.len(), message)
}

/// Derive the lowercase `0x` address of a secp256k1 public key
pub fn evm_address(verifying_key: &EcdsaVerifyingKey) -> String {
    // Uncompressed point is 0x04 || x || y; the address hashes x || y
    let public_key = verifying_key.to_encoded_point(false);
    let hash = keccak256(&public_key.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recover the signing address of an EIP-191 (`personal_sign`) signature
///
/// `signature_hex` is the 65-byte `r || s || v` signature, optionally
/// `0x`-prefixed. `v` may be given as 0/1 or 27/28.
pub fn recover_personal_sign_address(
    message: &str,
    signature_hex: &str,
) -> Result<String, CryptoError> {
    let raw = signature_hex.trim();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes =
        hex::decode(raw).map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    if bytes.len() != 65 {
        return Err(CryptoError::InvalidSignatureFormat(format!(
            "Expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    let v = match bytes[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        other => {
            return Err(CryptoError::InvalidSignatureFormat(format!(
                "Invalid recovery byte: {}",
                other
            )))
        }
    };

    let recovery_id = RecoveryId::try_from(v)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let signature = EcdsaSignature::try_from(&bytes[..64])
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let message_hash = keccak256(build_eip191_message(message).as_bytes());

    let verifying_key =
        EcdsaVerifyingKey::recover_from_prehash(&message_hash, &signature, recovery_id)
            .map_err(|_| CryptoError::VerificationFailed)?;

    Ok(evm_address(&verifying_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use k256::ecdsa::SigningKey as EcdsaSigningKey;

    #[test]
    fn test_decode_stellar_public_key() {
        let address = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";
        assert!(decode_stellar_public_key(address).is_ok());
    }

    #[test]
    fn test_invalid_stellar_prefix() {
        let address = "SAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";
        let result = decode_stellar_public_key(address);
        assert!(matches!(result, Err(CryptoError::InvalidAddressFormat(_))));
    }

    #[test]
    fn test_stellar_checksum_detects_typo() {
        let address = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN6";
        assert!(decode_stellar_public_key(address).is_err());
    }

    #[test]
    fn test_stellar_encode_decode() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let public = key.verifying_key().to_bytes();
        let address = encode_stellar_public_key(&public);

        assert!(address.starts_with('G'));
        assert_eq!(address.len(), 56);
        assert_eq!(decode_stellar_public_key(&address).unwrap(), public);
    }

    #[test]
    fn test_verify_stellar_signature() {
        let key = SigningKey::from_bytes(&[42u8; 32]);
        let address = encode_stellar_public_key(&key.verifying_key().to_bytes());
        let signature = general_purpose::STANDARD.encode(key.sign(b"hello").to_bytes());

        assert!(verify_stellar_signature(&address, "hello", &signature).is_ok());
        assert!(matches!(
            verify_stellar_signature(&address, "hello!", &signature),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn test_keccak256() {
        let hash = keccak256(b"hello world");
        let expected =
            hex::decode("47173285a8d7341e5e972fc677286384f802f8ef42a5ec5f03bbfa254cb01fad")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_eip191_message_format() {
        assert_eq!(
            build_eip191_message("Hello, Ethereum!"),
            "\x19Ethereum Signed Message:\n16Hello, Ethereum!"
        );
    }

    #[test]
    fn test_known_private_key_address() {
        // Private key 0x...01 maps to a well-known address
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let key = EcdsaSigningKey::from_slice(&secret).unwrap();
        assert_eq!(
            evm_address(key.verifying_key()),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_recover_personal_sign_address() {
        let key = EcdsaSigningKey::from_slice(&[9u8; 32]).unwrap();
        let hash = keccak256(build_eip191_message("sign me").as_bytes());
        let (signature, recovery_id) = key.sign_prehash_recoverable(&hash).unwrap();

        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        let signature_hex = format!("0x{}", hex::encode(&bytes));

        let recovered = recover_personal_sign_address("sign me", &signature_hex).unwrap();
        assert_eq!(recovered, evm_address(key.verifying_key()));
    }

    #[test]
    fn test_recover_rejects_short_signature() {
        let result = recover_personal_sign_address("msg", "0xdeadbeef");
        assert!(matches!(result, Err(CryptoError::InvalidSignatureFormat(_))));
    }
}
