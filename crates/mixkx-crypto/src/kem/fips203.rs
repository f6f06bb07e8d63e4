//! ML-KEM (FIPS 203) bindings
//!
//! Both parameter sets draw a 32-byte seed from the caller's source with
//! `try_fill_bytes` and run the primitive on a local `ChaCha20Rng`, so a
//! failing source is reported instead of panicking inside the primitive.

use ml_kem::{
    Ciphertext, EncodedSizeUser, KemCore,
    kem::{Decapsulate, Encapsulate},
};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::{Kem, KemError};
use crate::{SharedKey, seed::draw_session_seed};

fn local_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<ChaCha20Rng, KemError> {
    let seed = draw_session_seed(rng)?;
    Ok(ChaCha20Rng::from_seed(*seed))
}

macro_rules! ml_kem_binding {
    (
        $(#[$meta:meta])*
        $name:ident, $params:ty, $label:literal, public_key = $pk_size:literal, ciphertext = $ct_size:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Kem for $name {
            const NAME: &'static str = $label;
            const PUBLIC_KEY_SIZE: usize = $pk_size;
            const CIPHERTEXT_SIZE: usize = $ct_size;

            type PublicKey = <$params as KemCore>::EncapsulationKey;
            type SecretKey = <$params as KemCore>::DecapsulationKey;
            type Ciphertext = Ciphertext<$params>;

            fn generate_keypair<R: RngCore + CryptoRng>(
                rng: &mut R,
            ) -> Result<(Self::PublicKey, Self::SecretKey), KemError> {
                let mut rng = local_rng(rng)?;
                let (secret_key, public_key) = <$params as KemCore>::generate(&mut rng);
                Ok((public_key, secret_key))
            }

            fn encapsulate<R: RngCore + CryptoRng>(
                public_key: &Self::PublicKey,
                rng: &mut R,
            ) -> Result<(Self::Ciphertext, SharedKey), KemError> {
                let mut rng = local_rng(rng)?;
                let (ciphertext, secret) = public_key
                    .encapsulate(&mut rng)
                    .map_err(|_| KemError::Rejected { operation: "encapsulation" })?;
                let secret = SharedKey::from_slice(secret.as_slice())
                    .ok_or(KemError::Rejected { operation: "encapsulation" })?;
                Ok((ciphertext, secret))
            }

            fn decapsulate(
                secret_key: &Self::SecretKey,
                ciphertext: &Self::Ciphertext,
            ) -> Result<SharedKey, KemError> {
                let secret = secret_key
                    .decapsulate(ciphertext)
                    .map_err(|_| KemError::Rejected { operation: "decapsulation" })?;
                SharedKey::from_slice(secret.as_slice())
                    .ok_or(KemError::Rejected { operation: "decapsulation" })
            }

            fn encode_public_key(public_key: &Self::PublicKey) -> Vec<u8> {
                public_key.as_bytes().to_vec()
            }

            fn decode_public_key(bytes: &[u8]) -> Result<Self::PublicKey, KemError> {
                let invalid_length = KemError::InvalidLength {
                    what: "public key",
                    expected: Self::PUBLIC_KEY_SIZE,
                    actual: bytes.len(),
                };
                if bytes.len() != Self::PUBLIC_KEY_SIZE {
                    return Err(invalid_length);
                }

                let encoded = bytes.try_into().map_err(|_| invalid_length)?;
                let public_key =
                    <Self::PublicKey as EncodedSizeUser>::from_bytes(&encoded);

                // FIPS 203 encapsulation key check: decoding reduces every
                // coefficient mod q, so an unreduced input does not survive
                // a re-encode.
                if public_key.as_bytes().as_slice() != bytes {
                    return Err(KemError::InvalidPublicKey {
                        reason: "coefficient not reduced modulo q",
                    });
                }

                Ok(public_key)
            }

            fn encode_ciphertext(ciphertext: &Self::Ciphertext) -> Vec<u8> {
                ciphertext.as_slice().to_vec()
            }

            fn decode_ciphertext(bytes: &[u8]) -> Result<Self::Ciphertext, KemError> {
                let invalid_length = KemError::InvalidLength {
                    what: "ciphertext",
                    expected: Self::CIPHERTEXT_SIZE,
                    actual: bytes.len(),
                };
                if bytes.len() != Self::CIPHERTEXT_SIZE {
                    return Err(invalid_length);
                }
                bytes.try_into().map_err(|_| invalid_length)
            }
        }
    };
}

ml_kem_binding! {
    /// ML-KEM-768 (NIST security category 3).
    MlKem768, ml_kem::MlKem768, "ML-KEM-768", public_key = 1184, ciphertext = 1088
}

ml_kem_binding! {
    /// ML-KEM-1024 (NIST security category 5).
    MlKem1024, ml_kem::MlKem1024, "ML-KEM-1024", public_key = 1568, ciphertext = 1568
}
