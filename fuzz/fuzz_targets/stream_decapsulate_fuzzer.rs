//! Fuzz target for decapsulating hostile ciphertext streams
//!
//! # Strategy
//!
//! - Small seeded sessions (keys are generated, not fuzzed)
//! - Arbitrary stream bytes, decoded as one contribution of the full length
//! - Arbitrary start offsets and slot counts for the receiving engine
//! - Honest streams with single ciphertexts replaced by garbage
//!
//! # Invariants
//!
//! - Wrong lengths and offsets are typed errors
//! - A successful decapsulation never stores a zero key
//! - Tampered ciphertexts still yield keys (implicit rejection), but never
//!   the key the honest sender derived
//! - NEVER panic on any stream

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mixkx_core::{
    ExchangeConfig, PairwiseExchange, Roster, SlotLayout, decode_contribution, encode_contribution,
    pair_position,
};
use mixkx_crypto::{Kem, MlKem768};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Debug, Arbitrary)]
struct StreamInput {
    seed: u64,
    total: u8,
    start: u8,
    count: u8,
    attack: StreamAttack,
}

#[derive(Debug, Arbitrary)]
enum StreamAttack {
    RawBytes { bytes: Vec<u8> },
    TamperPair { m: u8, k: u8, fill: u8 },
}

type Ciphertext = <MlKem768 as Kem>::Ciphertext;

fuzz_target!(|input: StreamInput| {
    let total = usize::from(input.total % 6) + 2;
    let start = usize::from(input.start) % total;
    let count = (usize::from(input.count) % (total - start)) + 1;

    let mut rng = ChaCha20Rng::seed_from_u64(input.seed);
    let mut public = Vec::with_capacity(total);
    let mut secrets = Vec::with_capacity(total);
    for _ in 0..total {
        let (pk, sk) = MlKem768::generate_keypair(&mut rng).unwrap();
        public.push(pk);
        secrets.push(Some(sk));
    }
    let roster = Arc::new(Roster::<MlKem768>::new(public).unwrap());

    // Receiver owns [start, start + count); the remaining slots are split
    // into the honest senders before and after it.
    let layout = SlotLayout::from_counts(&[start, count, total - start - count]).unwrap();
    let mut engines: Vec<PairwiseExchange<MlKem768>> = layout
        .ranges()
        .iter()
        .map(|range| {
            let own = range.globals().filter_map(|slot| secrets[slot].take()).collect();
            PairwiseExchange::with_config(own, Arc::clone(&roster), ExchangeConfig::sequential())
                .unwrap()
        })
        .collect();

    match input.attack {
        StreamAttack::RawBytes { bytes } => {
            let Ok(stream) = decode_contribution::<MlKem768>(&bytes, layout.stream_len()) else {
                return;
            };
            let receiver = &mut engines[1];
            if receiver.decapsulate(&stream, start).is_ok() {
                let matrix = receiver.shared_keys().unwrap();
                for (own, row) in matrix.iter_rows() {
                    for (peer, key) in row.iter().enumerate().take(own) {
                        assert!(!key.is_zero(), "zero key stored for ({peer}, {own})");
                    }
                }
            }
        }

        StreamAttack::TamperPair { m, k, fill } => {
            let mut stream: Vec<Ciphertext> = Vec::with_capacity(layout.stream_len());
            for (engine, range) in engines.iter_mut().zip(layout.ranges()) {
                stream.extend(engine.encapsulate(&mut rng, range.start).unwrap());
            }

            let (m, k) = (usize::from(m) % total, usize::from(k) % total);
            let Some(pos) = pair_position(total, m, k) else {
                return;
            };
            let (lower, higher) = (m.min(k), m.max(k));

            let mut bytes = encode_contribution::<MlKem768>(&stream);
            let offset = pos * MlKem768::CIPHERTEXT_SIZE;
            let original = bytes[offset..offset + MlKem768::CIPHERTEXT_SIZE].to_vec();
            bytes[offset..offset + MlKem768::CIPHERTEXT_SIZE].fill(fill);
            let tampered_differs = bytes[offset..offset + MlKem768::CIPHERTEXT_SIZE] != original[..];
            let stream = decode_contribution::<MlKem768>(&bytes, layout.stream_len()).unwrap();

            let Some((owner, _)) = layout.owner_of(higher) else {
                return;
            };
            let sender = layout.owner_of(lower).map(|(p, _)| p).unwrap();
            let expected = engines[sender].shared_keys().unwrap().key_between(lower, higher).cloned();

            let receiver = &mut engines[owner];
            receiver.decapsulate(&stream, layout.ranges()[owner].start).unwrap();
            let recovered = receiver.shared_keys().unwrap().key_between(higher, lower).cloned();

            if tampered_differs {
                assert_ne!(recovered, expected, "tampered ciphertext recovered the honest key");
            } else {
                assert_eq!(recovered, expected);
            }
        }
    }
});
