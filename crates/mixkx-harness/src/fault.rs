//! Fault injection for simulated sessions.

use rand::{CryptoRng, RngCore};

/// A single fault injected into a simulated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The assembled stream loses its last ciphertext before anyone
    /// decapsulates.
    TruncatedStream,
    /// One participant receives a roster with its first two entries swapped
    /// (or, for a single-slot roster, with the entry missing).
    DivergentRoster {
        /// Participant holding the divergent copy
        participant: usize,
    },
    /// One participant's randomness source fails during encapsulation.
    FailingRandomness {
        /// Participant with the failing source
        participant: usize,
    },
    /// One participant's broadcast loses its last byte in transit.
    CorruptContribution {
        /// Participant whose contribution is damaged
        participant: usize,
    },
}

/// Randomness source whose every fallible read fails.
///
/// Only valid where the source is read through `try_fill_bytes`: the
/// exchange engine and the [`Kem`](mixkx_crypto::Kem) bindings in
/// `mixkx-crypto`. The infallible methods cannot report an error and panic,
/// so never pass this to code that calls `fill_bytes` or `next_u*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        unreachable!("exchange reads randomness through try_fill_bytes")
    }

    fn next_u64(&mut self) -> u64 {
        unreachable!("exchange reads randomness through try_fill_bytes")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        unreachable!("exchange reads randomness through try_fill_bytes")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new("injected randomness failure"))
    }
}

impl CryptoRng for FailingRng {}
