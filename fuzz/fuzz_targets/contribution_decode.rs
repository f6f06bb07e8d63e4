//! Fuzz target for broadcast decoding
//!
//! # Strategy
//!
//! - Random bytes as a contribution with an arbitrary claimed count
//! - Random bytes as roster entries (public key validation)
//!
//! # Invariants
//!
//! - Wrong byte lengths are rejected as shape mismatches
//! - Accepted contributions re-encode to the same bytes
//! - Roster entries that decode re-encode to the same bytes
//! - NEVER panic on malformed input

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mixkx_core::{ExchangeError, Roster, decode_contribution, encode_contribution};
use mixkx_crypto::{Kem, MlKem1024, MlKem768};

#[derive(Debug, Arbitrary)]
enum DecodeInput {
    Contribution { bytes: Vec<u8>, count: u16 },
    RosterEntries { entries: Vec<Vec<u8>> },
    PaddedKey { fill: u8, large: bool },
}

fn check_contribution<K: Kem>(bytes: &[u8], count: usize) {
    match decode_contribution::<K>(bytes, count) {
        Ok(ciphertexts) => {
            assert_eq!(ciphertexts.len(), count);
            assert_eq!(encode_contribution::<K>(&ciphertexts), bytes);
        }
        Err(ExchangeError::ShapeMismatch { .. }) => {
            assert_ne!(bytes.len(), count * K::CIPHERTEXT_SIZE);
        }
        Err(ExchangeError::MalformedCiphertext { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
}

fn check_roster<K: Kem>(entries: &[Vec<u8>]) {
    if let Ok(roster) = Roster::<K>::from_encoded(entries) {
        assert_eq!(roster.encode(), entries);
        assert!(roster.ensure_fingerprint(&roster.fingerprint()).is_ok());
    }
}

fuzz_target!(|input: DecodeInput| {
    match input {
        DecodeInput::Contribution { bytes, count } => {
            check_contribution::<MlKem768>(&bytes, usize::from(count));
            check_contribution::<MlKem1024>(&bytes, usize::from(count));
        }

        DecodeInput::RosterEntries { entries } => {
            check_roster::<MlKem768>(&entries);
            check_roster::<MlKem1024>(&entries);
        }

        DecodeInput::PaddedKey { fill, large } => {
            // Correct length, arbitrary coefficients: exercises the modulus check
            let size = if large { MlKem1024::PUBLIC_KEY_SIZE } else { MlKem768::PUBLIC_KEY_SIZE };
            let entries = vec![vec![fill; size]];
            check_roster::<MlKem768>(&entries);
            check_roster::<MlKem1024>(&entries);
        }
    }
});
