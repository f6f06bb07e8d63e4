//! mixkx Cryptographic Primitives
//!
//! Key-encapsulation bindings and key material for the pairwise exchange.
//! Every operation takes its randomness from the caller so that sessions are
//! reproducible under a seeded generator.
//!
//! # Key Lifecycle
//!
//! Each message slot owns one KEM keypair. For every unordered pair of slots
//! the lower-indexed slot encapsulates against the higher-indexed slot's
//! public key, and both sides end up holding the same 32-byte [`SharedKey`].
//!
//! ```text
//! Caller RNG
//!        │
//!        ▼ try_fill_bytes
//! Session Seed (per participant, per call)
//!        │
//!        ▼ HKDF-Expand(label || m || k)
//! Pair Seed[m, k]
//!        │
//!        ▼ ChaCha20
//! KEM Encapsulate(pk[k]) → (Ciphertext, SharedKey)
//! ```
//!
//! Deriving one independent stream per pair lets the encapsulations run in
//! any order, or in parallel, while producing identical output.
//!
//! # Security
//!
//! - The all-zero [`SharedKey`] is reserved as the self-pair sentinel and is
//!   never a valid derived key
//! - Shared keys are zeroized on drop and compared in constant time
//! - Public keys are validated on decode (FIPS 203 modulus check for ML-KEM)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod kem;
pub mod seed;
pub mod shared_key;

pub use kem::{Kem, KemError, MlKem768, MlKem1024};
pub use seed::{PAIR_SEED_LABEL, SEED_SIZE, derive_pair_seed, draw_session_seed, pair_rng};
pub use shared_key::{SHARED_KEY_SIZE, SharedKey};
