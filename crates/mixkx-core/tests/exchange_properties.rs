//! End-to-end tests for the pairwise exchange.
//!
//! These tests verify critical invariants:
//! - Both sides of every pair hold the same key
//! - Self entries stay zero, every other entry is filled
//! - Decapsulation is deterministic and idempotent

use std::{collections::HashSet, sync::Arc};

use mixkx_core::{
    ExchangeConfig, PairwiseExchange, Roster, SharedKeyMatrix, SlotLayout, assemble_stream,
    decode_contribution, encode_contribution,
};
use mixkx_crypto::{Kem, MlKem768, MlKem1024};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Run a full session in memory and return every participant's matrix.
fn run_session<K: Kem>(counts: &[usize], seed: u64, config: ExchangeConfig) -> Vec<SharedKeyMatrix> {
    let layout = SlotLayout::from_counts(counts).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let mut public = Vec::with_capacity(layout.total());
    let mut secrets = Vec::with_capacity(layout.participants());
    for range in layout.ranges() {
        let mut own = Vec::with_capacity(range.count);
        for _ in 0..range.count {
            let (pk, sk) = K::generate_keypair(&mut rng).unwrap();
            public.push(pk);
            own.push(sk);
        }
        secrets.push(own);
    }

    // Roster travels as bytes, like it would between real participants.
    let encoded: Vec<Vec<u8>> = public.iter().map(K::encode_public_key).collect();
    let roster = Arc::new(Roster::<K>::from_encoded(&encoded).unwrap());

    let mut engines: Vec<_> = secrets
        .into_iter()
        .map(|own| PairwiseExchange::with_config(own, Arc::clone(&roster), config).unwrap())
        .collect();

    let contributions: Vec<Vec<u8>> = engines
        .iter_mut()
        .zip(layout.ranges())
        .map(|(engine, range)| {
            let ciphertexts = engine.encapsulate(&mut rng, range.start).unwrap();
            encode_contribution::<K>(&ciphertexts)
        })
        .collect();

    let decoded: Vec<_> = contributions
        .iter()
        .enumerate()
        .map(|(p, bytes)| {
            let count = layout.contribution_range(p).unwrap().len();
            decode_contribution::<K>(bytes, count).unwrap()
        })
        .collect();
    let stream = assemble_stream::<K>(&layout, &decoded).unwrap();

    engines
        .into_iter()
        .zip(layout.ranges())
        .map(|(mut engine, range)| {
            engine.decapsulate(&stream, range.start).unwrap();
            assert!(engine.is_complete());
            engine.finish().unwrap()
        })
        .collect()
}

/// Find the key a given global slot holds for `peer`.
fn key_of(matrices: &[SharedKeyMatrix], own: usize, peer: usize) -> [u8; 32] {
    let matrix = matrices.iter().find(|m| m.slots().contains(own)).unwrap();
    *matrix.key_between(own, peer).unwrap().as_bytes()
}

/// INVARIANT: the 3 × 2 reference session has a 15-entry stream split 9/5/1
/// and participant 0's row 1 agrees with participant 1's row 0.
#[test]
fn reference_three_by_two() {
    let layout = SlotLayout::from_counts(&[2, 2, 2]).unwrap();
    assert_eq!(layout.stream_len(), 15);
    let sizes: Vec<_> = (0..3).map(|p| layout.contribution_range(p).unwrap().len()).collect();
    assert_eq!(sizes, vec![9, 5, 1]);

    let matrices = run_session::<MlKem768>(&[2, 2, 2], 42, ExchangeConfig::sequential());

    // participant 0 row 1 is global slot 1; participant 1 row 0 is global slot 2
    assert_eq!(matrices[0].get(1, 2), matrices[1].get(0, 1));
    assert!(!matrices[0].get(1, 2).unwrap().is_zero());

    for matrix in &matrices {
        assert_eq!((matrix.rows(), matrix.columns()), (2, 6));
    }
}

/// INVARIANT: every pair of slots across all participants agrees.
#[test]
fn symmetry_across_participants() {
    let matrices = run_session::<MlKem768>(&[3, 1, 2], 7, ExchangeConfig::default());
    let total = 6;
    for a in 0..total {
        for b in 0..total {
            assert_eq!(
                key_of(&matrices, a, b),
                key_of(&matrices, b, a),
                "slots {a} and {b} disagree: {} vs {}",
                hex::encode(key_of(&matrices, a, b)),
                hex::encode(key_of(&matrices, b, a)),
            );
        }
    }
}

/// INVARIANT: all non-zero keys are distinct.
#[test]
fn keys_are_collision_free() {
    let matrices = run_session::<MlKem768>(&[2, 3], 11, ExchangeConfig::default());
    let total = 5;
    let mut seen = HashSet::new();
    for a in 0..total {
        for b in (a + 1)..total {
            assert!(seen.insert(key_of(&matrices, a, b)), "duplicate key for ({a}, {b})");
        }
    }
    assert_eq!(seen.len(), 10);
}

/// INVARIANT: a lone slot produces an empty stream and a 1 × 1 zero matrix.
#[test]
fn single_slot_boundary() {
    let matrices = run_session::<MlKem768>(&[1], 3, ExchangeConfig::default());
    assert_eq!(matrices.len(), 1);
    assert_eq!((matrices[0].rows(), matrices[0].columns()), (1, 1));
    assert!(matrices[0].get(0, 0).unwrap().is_zero());
}

/// Zero-slot participants contribute nothing and own no rows.
#[test]
fn zero_slot_participant() {
    let matrices = run_session::<MlKem768>(&[2, 0, 1], 5, ExchangeConfig::default());
    assert_eq!(matrices[1].rows(), 0);
    assert_eq!(key_of(&matrices, 0, 2), key_of(&matrices, 2, 0));
}

/// The larger parameter set runs through the same engine unchanged.
#[test]
fn ml_kem_1024_session() {
    let matrices = run_session::<MlKem1024>(&[1, 2], 9, ExchangeConfig::default());
    assert_eq!(key_of(&matrices, 0, 2), key_of(&matrices, 2, 0));
    assert_eq!(key_of(&matrices, 1, 2), key_of(&matrices, 2, 1));
}

/// INVARIANT: identical seeds give identical sessions, whether pairs run in
/// parallel or not.
#[test]
fn deterministic_under_seed() {
    let forced = ExchangeConfig { parallel: true, min_parallel_pairs: 1 };
    let a = run_session::<MlKem768>(&[2, 2], 13, ExchangeConfig::sequential());
    let b = run_session::<MlKem768>(&[2, 2], 13, forced);
    assert_eq!(a, b);

    let c = run_session::<MlKem768>(&[2, 2], 14, ExchangeConfig::sequential());
    assert_ne!(a, c);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// INVARIANT: for any small layout, every self entry is zero and every
    /// other entry is filled and symmetric.
    #[test]
    fn prop_any_layout_completes(
        counts in prop::collection::vec(0usize..3, 1..4),
        seed in any::<u64>(),
    ) {
        let total: usize = counts.iter().sum();
        prop_assume!(total > 0);

        let matrices = run_session::<MlKem768>(&counts, seed, ExchangeConfig::default());
        for a in 0..total {
            for b in 0..total {
                let key = key_of(&matrices, a, b);
                prop_assert_eq!(key == [0u8; 32], a == b);
                prop_assert_eq!(key, key_of(&matrices, b, a));
            }
        }
    }
}
