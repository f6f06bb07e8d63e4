//! Public roster: one encapsulation key per global slot.
//!
//! Every participant must hold a byte-identical roster before the exchange
//! starts. [`Roster::fingerprint`] gives participants a compact value to
//! compare over whatever channel agreed on the roster; a mismatch is a
//! protocol violation, not something the exchange can repair.

use std::fmt;

use mixkx_crypto::Kem;
use sha2::{Digest, Sha256};

use crate::{
    addressing::MAX_SLOTS,
    error::{ExchangeError, Phase},
};

/// Domain label for roster fingerprints
const ROSTER_LABEL: &[u8] = b"mixkxRosterV1";

/// Ordered public keys for every slot in the session.
pub struct Roster<K: Kem> {
    keys: Vec<K::PublicKey>,
}

impl<K: Kem> Roster<K> {
    /// Build a roster from already-decoded keys in global slot order.
    pub fn new(keys: Vec<K::PublicKey>) -> Result<Self, ExchangeError> {
        if keys.len() > MAX_SLOTS {
            return Err(ExchangeError::TooManySlots { total: keys.len(), max: MAX_SLOTS });
        }
        Ok(Self { keys })
    }

    /// Decode and validate encoded keys in global slot order.
    pub fn from_encoded<B: AsRef<[u8]>>(encoded: &[B]) -> Result<Self, ExchangeError> {
        if encoded.len() > MAX_SLOTS {
            return Err(ExchangeError::TooManySlots { total: encoded.len(), max: MAX_SLOTS });
        }

        let keys = encoded
            .iter()
            .enumerate()
            .map(|(slot, bytes)| {
                K::decode_public_key(bytes.as_ref()).map_err(|source| {
                    tracing::warn!(slot, %source, "rejected roster entry");
                    ExchangeError::InvalidPublicKey { phase: Phase::Bootstrap, slot, source }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { keys })
    }

    /// Number of slots, `M_total`.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the roster has no slots.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Public key of global slot `slot`.
    pub fn get(&self, slot: usize) -> Option<&K::PublicKey> {
        self.keys.get(slot)
    }

    /// Keys in global slot order.
    pub fn as_slice(&self) -> &[K::PublicKey] {
        &self.keys
    }

    /// Encode every key in global slot order.
    pub fn encode(&self) -> Vec<Vec<u8>> {
        self.keys.iter().map(K::encode_public_key).collect()
    }

    /// SHA-256 over the label, KEM name, slot count, and every encoded key.
    ///
    /// Keys are length-prefixed so that no two rosters share an encoding.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(ROSTER_LABEL);
        hasher.update((K::NAME.len() as u64).to_be_bytes());
        hasher.update(K::NAME.as_bytes());
        hasher.update((self.keys.len() as u64).to_be_bytes());
        for key in &self.keys {
            let encoded = K::encode_public_key(key);
            hasher.update((encoded.len() as u64).to_be_bytes());
            hasher.update(&encoded);
        }
        hasher.finalize().into()
    }

    /// Fail with [`ExchangeError::RosterDivergence`] unless this roster
    /// hashes to `expected`.
    pub fn ensure_fingerprint(&self, expected: &[u8; 32]) -> Result<(), ExchangeError> {
        if &self.fingerprint() == expected {
            Ok(())
        } else {
            tracing::warn!(slots = self.keys.len(), "roster fingerprint mismatch");
            Err(ExchangeError::RosterDivergence)
        }
    }
}

impl<K: Kem> Clone for Roster<K> {
    fn clone(&self) -> Self {
        Self { keys: self.keys.clone() }
    }
}

impl<K: Kem> fmt::Debug for Roster<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Roster").field("kem", &K::NAME).field("slots", &self.keys.len()).finish()
    }
}
