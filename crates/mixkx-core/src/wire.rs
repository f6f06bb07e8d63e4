//! Byte encoding for broadcast contributions.
//!
//! A contribution travels as its ciphertexts concatenated in stream order.
//! Every ciphertext has the fixed length [`Kem::CIPHERTEXT_SIZE`], so the
//! encoding carries no tags or length prefixes; the receiver already knows
//! how many ciphertexts each participant owes from the slot layout.

use mixkx_crypto::Kem;

use crate::{
    error::{ExchangeError, Phase},
    layout::SlotLayout,
};

/// Concatenate a contribution's ciphertexts.
pub fn encode_contribution<K: Kem>(ciphertexts: &[K::Ciphertext]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ciphertexts.len() * K::CIPHERTEXT_SIZE);
    for ciphertext in ciphertexts {
        bytes.extend_from_slice(&K::encode_ciphertext(ciphertext));
    }
    bytes
}

/// Split and decode a contribution holding `expected_count` ciphertexts.
pub fn decode_contribution<K: Kem>(
    bytes: &[u8],
    expected_count: usize,
) -> Result<Vec<K::Ciphertext>, ExchangeError> {
    let expected_len = expected_count.checked_mul(K::CIPHERTEXT_SIZE).unwrap_or(usize::MAX);
    if bytes.len() != expected_len {
        tracing::warn!(expected = expected_len, actual = bytes.len(), "contribution length mismatch");
        return Err(ExchangeError::ShapeMismatch {
            phase: Phase::Decapsulate,
            what: "contribution bytes",
            expected: expected_len,
            actual: bytes.len(),
        });
    }
    if expected_count == 0 {
        return Ok(Vec::new());
    }

    bytes
        .chunks_exact(K::CIPHERTEXT_SIZE)
        .enumerate()
        .map(|(index, chunk)| {
            K::decode_ciphertext(chunk).map_err(|source| {
                tracing::warn!(index, %source, "malformed ciphertext");
                ExchangeError::MalformedCiphertext { phase: Phase::Decapsulate, index, source }
            })
        })
        .collect()
}

/// Concatenate every participant's contribution into the full stream.
///
/// Each contribution must have exactly the length the layout assigns to its
/// participant, and there must be one contribution per participant.
pub fn assemble_stream<K: Kem>(
    layout: &SlotLayout,
    contributions: &[Vec<K::Ciphertext>],
) -> Result<Vec<K::Ciphertext>, ExchangeError> {
    if contributions.len() != layout.participants() {
        return Err(ExchangeError::ShapeMismatch {
            phase: Phase::Decapsulate,
            what: "contribution count",
            expected: layout.participants(),
            actual: contributions.len(),
        });
    }

    let mut stream = Vec::with_capacity(layout.stream_len());
    for (participant, contribution) in contributions.iter().enumerate() {
        let expected = layout.contribution_range(participant).map_or(0, |range| range.len());
        if contribution.len() != expected {
            tracing::warn!(participant, expected, actual = contribution.len(), "contribution size mismatch");
            return Err(ExchangeError::ShapeMismatch {
                phase: Phase::Decapsulate,
                what: "contribution length",
                expected,
                actual: contribution.len(),
            });
        }
        stream.extend_from_slice(contribution);
    }

    debug_assert_eq!(stream.len(), layout.stream_len());
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mixkx_crypto::MlKem768;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{error::ErrorKind, exchange::PairwiseExchange, roster::Roster};

    fn contribution(seed: u64, pairs: usize) -> Vec<<MlKem768 as Kem>::Ciphertext> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut keys = Vec::new();
        let mut secrets = Vec::new();
        for _ in 0..=pairs {
            let (pk, sk) = MlKem768::generate_keypair(&mut rng).unwrap();
            keys.push(pk);
            secrets.push(sk);
        }
        // slot 0 alone contributes one ciphertext per other slot
        secrets.truncate(1);
        let roster = Arc::new(Roster::new(keys).unwrap());
        let mut engine = PairwiseExchange::<MlKem768>::new(secrets, roster).unwrap();
        engine.encapsulate(&mut rng, 0).unwrap()
    }

    #[test]
    fn bytes_are_fixed_size_concatenation() {
        let ciphertexts = contribution(1, 3);
        let bytes = encode_contribution::<MlKem768>(&ciphertexts);
        assert_eq!(bytes.len(), 3 * MlKem768::CIPHERTEXT_SIZE);

        let decoded = decode_contribution::<MlKem768>(&bytes, 3).unwrap();
        assert_eq!(encode_contribution::<MlKem768>(&decoded), bytes);
    }

    #[test]
    fn wrong_byte_length_is_addressing_mismatch() {
        let bytes = encode_contribution::<MlKem768>(&contribution(2, 2));

        let err = decode_contribution::<MlKem768>(&bytes[..bytes.len() - 1], 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AddressingMismatch);
        assert!(err.is_fatal());

        let err = decode_contribution::<MlKem768>(&bytes, 3).unwrap_err();
        assert!(matches!(err, ExchangeError::ShapeMismatch { what: "contribution bytes", .. }));
    }

    #[test]
    fn empty_contribution() {
        assert!(encode_contribution::<MlKem768>(&[]).is_empty());
        assert!(decode_contribution::<MlKem768>(&[], 0).unwrap().is_empty());
        assert!(decode_contribution::<MlKem768>(&[0u8; 4], 0).is_err());
    }

    #[test]
    fn huge_count_does_not_overflow() {
        let err = decode_contribution::<MlKem768>(&[], usize::MAX).unwrap_err();
        assert!(matches!(err, ExchangeError::ShapeMismatch { expected: usize::MAX, .. }));
    }

    #[test]
    fn assemble_checks_each_contribution() {
        let layout = SlotLayout::from_counts(&[1, 1, 1]).unwrap();
        let first = contribution(3, 2);
        let second = contribution(4, 1);

        let stream =
            assemble_stream::<MlKem768>(&layout, &[first.clone(), second.clone(), Vec::new()])
                .unwrap();
        assert_eq!(stream.len(), 3);

        let err = assemble_stream::<MlKem768>(&layout, &[second.clone(), first.clone(), Vec::new()])
            .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::ShapeMismatch { what: "contribution length", expected: 2, actual: 1, .. }
        ));

        let err = assemble_stream::<MlKem768>(&layout, &[first, second]).unwrap_err();
        assert!(matches!(err, ExchangeError::ShapeMismatch { what: "contribution count", .. }));
    }
}
