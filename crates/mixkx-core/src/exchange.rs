//! Pairwise exchange engine.
//!
//! One [`PairwiseExchange`] per participant. It owns the participant's secret
//! keys and its [`SharedKeyMatrix`], and shares the public roster with every
//! other engine in the session.
//!
//! # Protocol
//!
//! ```text
//! Participant p                       Broadcast
//!  │
//!  ├─ encapsulate(rng, start) ──────▶ contribution p (pairs with m in own slots)
//!  │                                     │
//!  │                  concatenate in participant order
//!  │                                     │
//!  ├─ decapsulate(stream, start) ◀──── full stream (pairs with k in own slots)
//!  │
//!  └─ finish() → SharedKeyMatrix
//! ```
//!
//! # Invariants
//!
//! - The lower index of a pair encapsulates, the higher decapsulates
//! - Pair results are computed first and written afterwards, so a failing
//!   call never leaves a partially written phase behind
//! - The zero key is never accepted for a non-self pair

use std::sync::Arc;

use mixkx_crypto::{Kem, KemError, SharedKey, draw_session_seed, pair_rng};
use rand::{CryptoRng, RngCore};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    addressing::{PairIter, pair_position, stream_len},
    error::{ExchangeError, Phase},
    layout::SlotRange,
    matrix::SharedKeyMatrix,
    roster::Roster,
};

/// Tuning for pair processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Spread pair operations across the rayon pool
    pub parallel: bool,
    /// Below this many pairs a call stays on the calling thread
    pub min_parallel_pairs: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self { parallel: true, min_parallel_pairs: 64 }
    }
}

impl ExchangeConfig {
    /// Configuration that never leaves the calling thread.
    pub fn sequential() -> Self {
        Self { parallel: false, ..Self::default() }
    }

    fn runs_parallel(&self, pairs: usize) -> bool {
        self.parallel && pairs >= self.min_parallel_pairs
    }
}

/// One participant's side of the pairwise exchange.
pub struct PairwiseExchange<K: Kem> {
    secrets: Vec<K::SecretKey>,
    roster: Arc<Roster<K>>,
    config: ExchangeConfig,
    start: Option<usize>,
    matrix: Option<SharedKeyMatrix>,
    encapsulated: bool,
    decapsulated: bool,
}

impl<K: Kem> PairwiseExchange<K> {
    /// Create an engine from this participant's secret keys (in local slot
    /// order) and the session roster.
    pub fn new(secrets: Vec<K::SecretKey>, roster: Arc<Roster<K>>) -> Result<Self, ExchangeError> {
        Self::with_config(secrets, roster, ExchangeConfig::default())
    }

    /// Create an engine with explicit tuning.
    pub fn with_config(
        secrets: Vec<K::SecretKey>,
        roster: Arc<Roster<K>>,
        config: ExchangeConfig,
    ) -> Result<Self, ExchangeError> {
        if secrets.len() > roster.len() {
            return Err(ExchangeError::SlotRangeOutOfBounds {
                phase: Phase::Bootstrap,
                start: 0,
                count: secrets.len(),
                total: roster.len(),
            });
        }

        Ok(Self {
            secrets,
            roster,
            config,
            start: None,
            matrix: None,
            encapsulated: false,
            decapsulated: false,
        })
    }

    /// Shared public roster.
    pub fn roster(&self) -> &Arc<Roster<K>> {
        &self.roster
    }

    /// Start offset bound by the first successful phase call, if any.
    pub fn start(&self) -> Option<usize> {
        self.start
    }

    /// Number of local slots.
    pub fn slot_count(&self) -> usize {
        self.secrets.len()
    }

    /// Active tuning.
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Produce this participant's contribution to the ciphertext stream.
    ///
    /// Returns one ciphertext per pair `(m, k)` with `m` in the local slot
    /// range and `k > m`, in stream order. Fills the matching matrix
    /// entries. May run only once per engine.
    pub fn encapsulate<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        start: usize,
    ) -> Result<Vec<K::Ciphertext>, ExchangeError> {
        let phase = Phase::Encapsulate;
        if self.encapsulated {
            tracing::warn!(start, "encapsulate called twice");
            return Err(ExchangeError::PhaseRepeated { phase });
        }
        let slots = self.check_start(phase, start)?;
        let total = self.roster.len();

        let pairs: Vec<(usize, usize)> = PairIter::new(total, slots.globals()).collect();
        let parallel = self.config.runs_parallel(pairs.len());
        tracing::debug!(start, slots = slots.count, pairs = pairs.len(), parallel, "encapsulating");

        let session_seed = draw_session_seed(rng).map_err(|source| {
            tracing::warn!(%source, "randomness source failed");
            ExchangeError::Randomness { phase, source }
        })?;

        let roster = &self.roster;
        let results = map_pairs(parallel, &pairs, |&(m, k)| {
            let Some(public_key) = roster.get(k) else {
                unreachable!("pair iterator stays inside the roster");
            };
            let mut rng = pair_rng(&session_seed, m, k);
            let (ciphertext, key) =
                K::encapsulate(public_key, &mut rng).map_err(|source| match source {
                    KemError::Randomness { .. } => ExchangeError::Randomness { phase, source },
                    source => ExchangeError::Primitive { phase, lower: m, higher: k, source },
                })?;
            check_non_zero(phase, m, k, &key)?;
            tracing::trace!(m, k, "encapsulated pair");
            Ok((ciphertext, key))
        })?;

        let matrix = self.matrix.get_or_insert_with(|| SharedKeyMatrix::new(slots, total));
        let mut contribution = Vec::with_capacity(results.len());
        for (&(m, k), (ciphertext, key)) in pairs.iter().zip(results) {
            matrix.set(m - slots.start, k, key);
            contribution.push(ciphertext);
        }

        self.start = Some(start);
        self.encapsulated = true;
        Ok(contribution)
    }

    /// Consume the full ciphertext stream.
    ///
    /// Decapsulates every pair `(m, k)` with `k` in the local slot range and
    /// fills the matching matrix entries. The stream must hold exactly one
    /// ciphertext per unordered pair of the roster. Repeating the call with
    /// the same stream rewrites the same keys.
    pub fn decapsulate(
        &mut self,
        stream: &[K::Ciphertext],
        start: usize,
    ) -> Result<(), ExchangeError> {
        let phase = Phase::Decapsulate;
        let slots = self.check_start(phase, start)?;
        let total = self.roster.len();

        let expected = stream_len(total);
        if stream.len() != expected {
            tracing::warn!(expected, actual = stream.len(), "ciphertext stream length mismatch");
            return Err(ExchangeError::ShapeMismatch {
                phase,
                what: "ciphertext stream length",
                expected,
                actual: stream.len(),
            });
        }

        let pairs: Vec<(usize, usize)> =
            slots.globals().flat_map(|k| (0..k).map(move |m| (m, k))).collect();
        let parallel = self.config.runs_parallel(pairs.len());
        tracing::debug!(start, slots = slots.count, pairs = pairs.len(), parallel, "decapsulating");

        let secrets = &self.secrets;
        let keys = map_pairs(parallel, &pairs, |&(m, k)| {
            let Some(position) = pair_position(total, m, k) else {
                unreachable!("m < k < total always has a position");
            };
            let key = K::decapsulate(&secrets[k - slots.start], &stream[position])
                .map_err(|source| ExchangeError::Primitive { phase, lower: m, higher: k, source })?;
            check_non_zero(phase, m, k, &key)?;
            tracing::trace!(m, k, position, "decapsulated pair");
            Ok(key)
        })?;

        let matrix = self.matrix.get_or_insert_with(|| SharedKeyMatrix::new(slots, total));
        for (&(m, k), key) in pairs.iter().zip(keys) {
            matrix.set(k - slots.start, m, key);
        }

        self.start = Some(start);
        self.decapsulated = true;
        Ok(())
    }

    /// True once both phases have succeeded and every non-self entry holds
    /// a key.
    pub fn is_complete(&self) -> bool {
        self.encapsulated
            && self.decapsulated
            && self.matrix.as_ref().is_some_and(SharedKeyMatrix::is_complete)
    }

    /// Read access to the matrix, allocated by the first phase call.
    pub fn shared_keys(&self) -> Option<&SharedKeyMatrix> {
        self.matrix.as_ref()
    }

    /// Consume the engine and hand out the completed matrix.
    ///
    /// Fails unless both phases completed and the matrix passes its local
    /// integrity check.
    pub fn finish(self) -> Result<SharedKeyMatrix, ExchangeError> {
        if !self.encapsulated {
            return Err(ExchangeError::Incomplete { missing: Phase::Encapsulate });
        }
        if !self.decapsulated {
            return Err(ExchangeError::Incomplete { missing: Phase::Decapsulate });
        }
        let Some(matrix) = self.matrix else {
            return Err(ExchangeError::Incomplete { missing: Phase::Encapsulate });
        };

        matrix.check_integrity().inspect_err(|err| {
            tracing::warn!(%err, "matrix failed integrity check");
        })?;
        Ok(matrix)
    }

    /// Validate `start` against the roster and any earlier successful call.
    ///
    /// Only a successful phase binds the offset, so a failed call can be
    /// retried with a corrected one.
    fn check_start(&self, phase: Phase, start: usize) -> Result<SlotRange, ExchangeError> {
        let count = self.secrets.len();
        let total = self.roster.len();

        if let Some(bound) = self.start {
            if bound != start {
                tracing::warn!(bound, requested = start, "start offset changed between calls");
                return Err(ExchangeError::StartOffsetChanged { phase, bound, requested: start });
            }
        } else if start.checked_add(count).is_none_or(|end| end > total) {
            tracing::warn!(start, count, total, "slot range outside roster");
            return Err(ExchangeError::SlotRangeOutOfBounds { phase, start, count, total });
        }

        Ok(SlotRange::new(start, count))
    }
}

impl<K: Kem> std::fmt::Debug for PairwiseExchange<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairwiseExchange")
            .field("kem", &K::NAME)
            .field("slots", &self.secrets.len())
            .field("total", &self.roster.len())
            .field("start", &self.start)
            .field("encapsulated", &self.encapsulated)
            .field("decapsulated", &self.decapsulated)
            .finish_non_exhaustive()
    }
}

/// Run `op` over every pair and collect the results in pair order.
///
/// On failure the sequential path reports the first failing pair; the
/// parallel path reports whichever failure rayon observes first.
fn map_pairs<T, F>(parallel: bool, pairs: &[(usize, usize)], op: F) -> Result<Vec<T>, ExchangeError>
where
    T: Send,
    F: Fn(&(usize, usize)) -> Result<T, ExchangeError> + Sync + Send,
{
    if parallel { pairs.par_iter().map(op).collect() } else { pairs.iter().map(op).collect() }
}

fn check_non_zero(phase: Phase, m: usize, k: usize, key: &SharedKey) -> Result<(), ExchangeError> {
    if key.is_zero() {
        tracing::warn!(%phase, m, k, "kem produced the zero key");
        return Err(ExchangeError::ZeroSharedKey { phase, lower: m, higher: k });
    }
    Ok(())
}
