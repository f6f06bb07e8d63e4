//! Per-pair randomness derivation using HKDF

use hkdf::Hkdf;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::kem::KemError;

/// Label used for pair seed derivation
pub const PAIR_SEED_LABEL: &[u8] = b"mixkxPairSeedV1";

/// Size of session and pair seeds in bytes.
pub const SEED_SIZE: usize = 32;

/// Draw a session seed from the caller's randomness source.
///
/// This is the only point where the caller's source is consumed during an
/// encapsulation pass. A failing source surfaces as
/// [`KemError::Randomness`] instead of a panic.
pub fn draw_session_seed<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<Zeroizing<[u8; SEED_SIZE]>, KemError> {
    let mut seed = Zeroizing::new([0u8; SEED_SIZE]);
    rng.try_fill_bytes(&mut seed[..])
        .map_err(|e| KemError::Randomness { reason: e.to_string() })?;
    Ok(seed)
}

/// Derive the seed for the pair `(lower, higher)` from a session seed.
///
/// The output is unique per `(session_seed, lower, higher)`, so every pair
/// gets an independent stream regardless of the order in which pairs are
/// processed.
pub fn derive_pair_seed(
    session_seed: &[u8; SEED_SIZE],
    lower: usize,
    higher: usize,
) -> Zeroizing<[u8; SEED_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(None, session_seed);

    // label || lower || higher
    let mut info = Vec::with_capacity(PAIR_SEED_LABEL.len() + 16);
    info.extend_from_slice(PAIR_SEED_LABEL);
    info.extend_from_slice(&(lower as u64).to_be_bytes());
    info.extend_from_slice(&(higher as u64).to_be_bytes());

    let mut seed = Zeroizing::new([0u8; SEED_SIZE]);
    let Ok(()) = hkdf.expand(&info, &mut seed[..]) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    seed
}

/// Deterministic generator for the pair `(lower, higher)`.
pub fn pair_rng(session_seed: &[u8; SEED_SIZE], lower: usize, higher: usize) -> ChaCha20Rng {
    ChaCha20Rng::from_seed(*derive_pair_seed(session_seed, lower, higher))
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use proptest::prelude::{any, prop_assert_ne, prop_assume, proptest};

    use super::*;

    struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!("only try_fill_bytes is used")
        }

        fn next_u64(&mut self) -> u64 {
            unreachable!("only try_fill_bytes is used")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!("only try_fill_bytes is used")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            let code = NonZeroU32::new(rand::Error::CUSTOM_START).unwrap();
            Err(rand::Error::from(code))
        }
    }

    impl CryptoRng for FailingRng {}

    #[test]
    fn derive_is_deterministic() {
        let session = [9u8; SEED_SIZE];
        assert_eq!(*derive_pair_seed(&session, 1, 4), *derive_pair_seed(&session, 1, 4));
    }

    #[test]
    fn different_pairs_produce_different_seeds() {
        let session = [9u8; SEED_SIZE];
        let a = derive_pair_seed(&session, 0, 1);
        let b = derive_pair_seed(&session, 0, 2);
        let c = derive_pair_seed(&session, 1, 2);
        assert_ne!(*a, *b);
        assert_ne!(*a, *c);
        assert_ne!(*b, *c);
    }

    #[test]
    fn pair_order_matters() {
        // (1, 2) and (2, 1) never both occur, but the encoding must not
        // collapse them either.
        let session = [3u8; SEED_SIZE];
        assert_ne!(*derive_pair_seed(&session, 1, 2), *derive_pair_seed(&session, 2, 1));
    }

    #[test]
    fn different_sessions_produce_different_seeds() {
        let a = derive_pair_seed(&[1u8; SEED_SIZE], 0, 1);
        let b = derive_pair_seed(&[2u8; SEED_SIZE], 0, 1);
        assert_ne!(*a, *b);
    }

    #[test]
    fn pair_rng_is_reproducible() {
        let session = [5u8; SEED_SIZE];
        let mut first = pair_rng(&session, 2, 7);
        let mut second = pair_rng(&session, 2, 7);
        assert_eq!(first.next_u64(), second.next_u64());
    }

    #[test]
    fn draw_session_seed_consumes_source() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let first = draw_session_seed(&mut rng).unwrap();
        let second = draw_session_seed(&mut rng).unwrap();
        assert_ne!(*first, *second);
    }

    #[test]
    fn draw_session_seed_reports_failing_source() {
        let result = draw_session_seed(&mut FailingRng);
        assert!(matches!(result, Err(KemError::Randomness { .. })));
    }

    #[test]
    fn boundary_indices() {
        let session = [0u8; SEED_SIZE];
        let _ = derive_pair_seed(&session, 0, usize::MAX);
        let _ = derive_pair_seed(&session, usize::MAX - 1, usize::MAX);
    }

    proptest! {
        #[test]
        fn distinct_pairs_never_share_a_seed(
            session in any::<[u8; SEED_SIZE]>(),
            a in (0usize..4096, 1usize..4096),
            b in (0usize..4096, 1usize..4096),
        ) {
            let a = (a.0, a.0 + a.1);
            let b = (b.0, b.0 + b.1);
            prop_assume!(a != b);
            prop_assert_ne!(
                *derive_pair_seed(&session, a.0, a.1),
                *derive_pair_seed(&session, b.0, b.1)
            );
        }
    }
}
