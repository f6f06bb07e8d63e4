//! Key-encapsulation mechanism abstraction.
//!
//! The exchange engine is generic over [`Kem`] so the primitive stays a black
//! box: it only relies on `decapsulate(sk, encapsulate(pk).0) ==
//! encapsulate(pk).1` for matching keys. Byte encoding lives here too, since
//! only the primitive knows its layout.

mod fips203;

use rand::{CryptoRng, RngCore};
use thiserror::Error;

pub use self::fips203::{MlKem768, MlKem1024};
use crate::SharedKey;

/// Errors reported by a KEM binding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KemError {
    /// Encoded value has the wrong length for this KEM
    #[error("malformed {what}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Which value was being decoded
        what: &'static str,
        /// Expected encoded length
        expected: usize,
        /// Actual encoded length
        actual: usize,
    },

    /// Public key decoded but failed validation
    #[error("public key rejected: {reason}")]
    InvalidPublicKey {
        /// Why the key was rejected
        reason: &'static str,
    },

    /// The primitive refused to encapsulate or decapsulate
    #[error("{operation} rejected by primitive")]
    Rejected {
        /// Operation that failed
        operation: &'static str,
    },

    /// Randomness source failed or was exhausted
    #[error("randomness source failed: {reason}")]
    Randomness {
        /// Error reported by the source
        reason: String,
    },
}

/// An IND-CCA2 key-encapsulation mechanism with a 32-byte shared secret.
///
/// Implementations must never consume randomness through a panicking path:
/// fallible sources are read with `try_fill_bytes` and failures reported as
/// [`KemError::Randomness`].
pub trait Kem {
    /// Human-readable algorithm name, bound into roster fingerprints.
    const NAME: &'static str;

    /// Encoded public key length in bytes.
    const PUBLIC_KEY_SIZE: usize;

    /// Encoded ciphertext length in bytes.
    const CIPHERTEXT_SIZE: usize;

    /// Encapsulation key.
    type PublicKey: Clone + Send + Sync;

    /// Decapsulation key. Never leaves the participant that generated it.
    type SecretKey: Send + Sync;

    /// Encapsulated secret.
    type Ciphertext: Clone + Send + Sync;

    /// Generate a fresh keypair for one slot.
    fn generate_keypair<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<(Self::PublicKey, Self::SecretKey), KemError>;

    /// Encapsulate a fresh secret against `public_key`.
    fn encapsulate<R: RngCore + CryptoRng>(
        public_key: &Self::PublicKey,
        rng: &mut R,
    ) -> Result<(Self::Ciphertext, SharedKey), KemError>;

    /// Recover the secret from `ciphertext` with `secret_key`.
    fn decapsulate(
        secret_key: &Self::SecretKey,
        ciphertext: &Self::Ciphertext,
    ) -> Result<SharedKey, KemError>;

    /// Encode a public key.
    fn encode_public_key(public_key: &Self::PublicKey) -> Vec<u8>;

    /// Decode and validate a public key.
    fn decode_public_key(bytes: &[u8]) -> Result<Self::PublicKey, KemError>;

    /// Encode a ciphertext.
    fn encode_ciphertext(ciphertext: &Self::Ciphertext) -> Vec<u8>;

    /// Decode a ciphertext.
    fn decode_ciphertext(bytes: &[u8]) -> Result<Self::Ciphertext, KemError>;
}
