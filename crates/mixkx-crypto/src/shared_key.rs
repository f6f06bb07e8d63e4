//! Pairwise shared key with a reserved all-zero sentinel

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Size of every pairwise shared key in bytes.
pub const SHARED_KEY_SIZE: usize = 32;

/// A 32-byte secret shared between two message slots.
///
/// The all-zero value is reserved: it marks a slot's entry for itself and an
/// entry that has not been derived yet. A KEM that ever yields it for a real
/// pair is treated as broken by the exchange engine.
#[derive(Clone)]
pub struct SharedKey {
    bytes: [u8; SHARED_KEY_SIZE],
}

impl SharedKey {
    /// The zero sentinel.
    pub const ZERO: Self = Self { bytes: [0u8; SHARED_KEY_SIZE] };

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; SHARED_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Copy key bytes out of a slice, if it has exactly [`SHARED_KEY_SIZE`]
    /// bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; SHARED_KEY_SIZE] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_KEY_SIZE] {
        &self.bytes
    }

    /// Whether this is the zero sentinel. Runs in constant time.
    pub fn is_zero(&self) -> bool {
        self.bytes[..].ct_eq(&[0u8; SHARED_KEY_SIZE][..]).into()
    }

    /// Short non-secret identifier for logs: the first four bytes of
    /// SHA-256 over the key.
    pub fn fingerprint(&self) -> [u8; 4] {
        use sha2::{Digest, Sha256};

        let digest = Sha256::digest(self.bytes);
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest[..4]);
        out
    }
}

impl Default for SharedKey {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for SharedKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl Eq for SharedKey {}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            f.write_str("SharedKey(zero)")
        } else {
            f.write_str("SharedKey(<redacted>)")
        }
    }
}

impl Drop for SharedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}
