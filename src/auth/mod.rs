//! Authentication module for Keygate
//!
//! Provides key-ownership authentication:
//! - Challenge-response authentication with single-use nonces
//! - Pluggable identity schemes and signature oracles (EVM, Stellar)
//! - Opaque, time-bounded sessions with background expiry

pub mod clock;
mod crypto;
pub mod identity;
pub mod message;
pub mod nonce;
pub mod oracle;
mod service;
pub mod session;
mod sweeper;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{
    build_eip191_message, encode_stellar_public_key, evm_address, keccak256, CryptoError,
};
pub use identity::{EvmAddress, IdentityScheme, StellarAddress};
pub use message::{ChallengeMessage, MessageError};
pub use nonce::{NonceError, NonceStore};
pub use oracle::{EvmPersonalSignOracle, OracleError, SignatureOracle, StellarEd25519Oracle};
pub use service::{
    AuthError, AuthService, AuthSettings, AuthStats, EstablishedSession, IssuedChallenge,
    SweepReport,
};
pub use session::{SessionError, SessionRecord, SessionStore};
pub use sweeper::{run_sweeper, DEFAULT_SWEEP_INTERVAL_SECONDS};
pub use verifier::{SignatureVerifier, VerifiedChallenge, VerifyError};
