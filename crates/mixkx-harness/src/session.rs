//! Deterministic multi-participant session simulation.
//!
//! Runs every participant of a session in one process, with all randomness
//! derived from a single seed:
//!
//! ```text
//! seed ──▶ ChaCha20 ──┬─▶ keypairs (slot order)
//!                     └─▶ one encapsulation source per participant
//!
//! keygen ─▶ roster bytes ─▶ decode + fingerprint check (per participant)
//!        ─▶ encapsulate ─▶ contribution bytes ─▶ decode ─▶ assemble
//!        ─▶ decapsulate ─▶ finish
//! ```
//!
//! Per-participant sources are drawn before anything runs, so injecting a
//! fault into one participant never shifts the randomness of the others.

use std::{marker::PhantomData, sync::Arc};

use mixkx_core::{
    ExchangeConfig, ExchangeError, PairwiseExchange, Roster, SharedKeyMatrix, SlotLayout,
    assemble_stream, decode_contribution, encode_contribution,
};
use mixkx_crypto::{Kem, KemError};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::{
    fault::{FailingRng, Fault},
    invariants::SystemSnapshot,
};

/// Session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Slots owned by each participant, in participant order
    pub slot_counts: Vec<usize>,
    /// Seed for every random choice in the session
    pub seed: u64,
    /// Engine tuning shared by all participants
    pub exchange: ExchangeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { slot_counts: vec![2, 2, 2], seed: 0, exchange: ExchangeConfig::default() }
    }
}

/// Why a simulated session stopped.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Slot counts do not form a valid layout
    #[error("invalid layout: {0}")]
    Layout(#[source] ExchangeError),

    /// Keypair generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] KemError),

    /// A participant's contribution could not be received
    #[error("contribution from participant {sender}: {source}")]
    Broadcast {
        /// Participant that sent the contribution
        sender: usize,
        /// Error raised while decoding or assembling
        #[source]
        source: ExchangeError,
    },

    /// A participant's engine failed
    #[error("participant {participant}: {source}")]
    Participant {
        /// Participant whose engine failed
        participant: usize,
        /// Engine error
        #[source]
        source: ExchangeError,
    },
}

impl SessionError {
    /// Underlying exchange error, if the failure came from the engine or
    /// the wire helpers.
    pub fn exchange_error(&self) -> Option<&ExchangeError> {
        match self {
            Self::Layout(source)
            | Self::Broadcast { source, .. }
            | Self::Participant { source, .. } => Some(source),
            Self::KeyGeneration(_) => None,
        }
    }
}

/// Result of a completed session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Slot assignment
    pub layout: SlotLayout,
    /// Agreed roster fingerprint
    pub roster_fingerprint: [u8; 32],
    /// Length of the assembled stream
    pub stream_len: usize,
    /// Encoded size of each participant's broadcast
    pub contribution_bytes: Vec<usize>,
    /// Finished matrix of each participant
    pub matrices: Vec<SharedKeyMatrix>,
}

impl SessionOutcome {
    /// Copy the session state for invariant checking.
    pub fn snapshot(&self) -> SystemSnapshot {
        let mut snapshot = SystemSnapshot::from_matrices(&self.matrices, self.stream_len);
        snapshot.total = self.layout.total();
        snapshot
    }
}

/// Simulated session over KEM `K`.
pub struct SimSession<K: Kem> {
    config: SessionConfig,
    fault: Option<Fault>,
    _kem: PhantomData<fn() -> K>,
}

impl<K: Kem> SimSession<K> {
    /// Create a fault-free session.
    pub fn new(config: SessionConfig) -> Self {
        Self { config, fault: None, _kem: PhantomData }
    }

    /// Inject `fault` into the next run.
    #[must_use]
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Session parameters.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the whole exchange. Identical configurations give identical
    /// outcomes.
    pub fn run(&self) -> Result<SessionOutcome, SessionError> {
        let layout =
            SlotLayout::from_counts(&self.config.slot_counts).map_err(SessionError::Layout)?;
        let participants = layout.participants();
        tracing::debug!(
            participants,
            total = layout.total(),
            seed = self.config.seed,
            kem = K::NAME,
            fault = ?self.fault,
            "starting simulated session"
        );

        let mut master = ChaCha20Rng::seed_from_u64(self.config.seed);
        let mut encoded_roster = Vec::with_capacity(layout.total());
        let mut secrets = Vec::with_capacity(participants);
        for range in layout.ranges() {
            let mut own = Vec::with_capacity(range.count);
            for _ in 0..range.count {
                let (public_key, secret_key) =
                    K::generate_keypair(&mut master).map_err(SessionError::KeyGeneration)?;
                encoded_roster.push(K::encode_public_key(&public_key));
                own.push(secret_key);
            }
            secrets.push(own);
        }
        let mut sources: Vec<ChaCha20Rng> =
            (0..participants).map(|_| ChaCha20Rng::seed_from_u64(master.next_u64())).collect();

        let agreed = Roster::<K>::from_encoded(&encoded_roster)
            .map_err(|source| SessionError::Participant { participant: 0, source })?
            .fingerprint();

        let mut engines = Vec::with_capacity(participants);
        for (p, own) in secrets.into_iter().enumerate() {
            let engine = self
                .join(p, own, &encoded_roster, &agreed)
                .map_err(|source| SessionError::Participant { participant: p, source })?;
            engines.push(engine);
        }

        let mut broadcasts = Vec::with_capacity(participants);
        for (p, (engine, rng)) in engines.iter_mut().zip(&mut sources).enumerate() {
            let start = layout.ranges()[p].start;
            let result = if self.fault == Some(Fault::FailingRandomness { participant: p }) {
                engine.encapsulate(&mut FailingRng, start)
            } else {
                engine.encapsulate(rng, start)
            };
            let ciphertexts =
                result.map_err(|source| SessionError::Participant { participant: p, source })?;

            let mut bytes = encode_contribution::<K>(&ciphertexts);
            if self.fault == Some(Fault::CorruptContribution { participant: p })
                && bytes.pop().is_none()
            {
                bytes.push(0);
            }
            broadcasts.push(bytes);
        }
        let contribution_bytes = broadcasts.iter().map(Vec::len).collect();

        let mut contributions = Vec::with_capacity(participants);
        for (sender, bytes) in broadcasts.iter().enumerate() {
            let count = layout.contribution_range(sender).map_or(0, |range| range.len());
            let decoded = decode_contribution::<K>(bytes, count)
                .map_err(|source| SessionError::Broadcast { sender, source })?;
            contributions.push(decoded);
        }
        // every contribution was decoded to its layout length above
        let mut stream =
            assemble_stream::<K>(&layout, &contributions).map_err(SessionError::Layout)?;
        if self.fault == Some(Fault::TruncatedStream) {
            stream.pop();
        }

        let mut matrices = Vec::with_capacity(participants);
        for (p, mut engine) in engines.into_iter().enumerate() {
            let start = layout.ranges()[p].start;
            let failed = |source| SessionError::Participant { participant: p, source };
            engine.decapsulate(&stream, start).map_err(failed)?;
            matrices.push(engine.finish().map_err(failed)?);
        }

        tracing::debug!(stream = stream.len(), "simulated session complete");
        Ok(SessionOutcome {
            layout,
            roster_fingerprint: agreed,
            stream_len: stream.len(),
            contribution_bytes,
            matrices,
        })
    }

    /// Decode participant `p`'s copy of the roster, check it against the
    /// agreed fingerprint, and build its engine.
    fn join(
        &self,
        p: usize,
        secrets: Vec<K::SecretKey>,
        encoded_roster: &[Vec<u8>],
        agreed: &[u8; 32],
    ) -> Result<PairwiseExchange<K>, ExchangeError> {
        let mut copy = encoded_roster.to_vec();
        if self.fault == Some(Fault::DivergentRoster { participant: p }) {
            if copy.len() >= 2 {
                copy.swap(0, 1);
            } else {
                copy.clear();
            }
        }

        let roster = Roster::<K>::from_encoded(&copy)?;
        roster.ensure_fingerprint(agreed)?;
        PairwiseExchange::with_config(secrets, Arc::new(roster), self.config.exchange)
    }
}
