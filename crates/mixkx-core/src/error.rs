//! Error types for the pairwise exchange.
//!
//! Every failure carries the [`Phase`] it was raised in and maps onto one of
//! three [`ErrorKind`]s: primitive failures, addressing mismatches, and
//! integrity violations. None of them is retried inside the engine, and none
//! is ever downgraded to a zero key.

use std::fmt;

use mixkx_crypto::KemError;
use thiserror::Error;

/// Stage of the exchange an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Roster decoding, layout construction, engine construction
    Bootstrap,
    /// Producing this participant's ciphertexts
    Encapsulate,
    /// Consuming the assembled ciphertext stream
    Decapsulate,
    /// Handing out the completed matrix
    Finish,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bootstrap => "bootstrap",
            Self::Encapsulate => "encapsulate",
            Self::Decapsulate => "decapsulate",
            Self::Finish => "finish",
        })
    }
}

/// Coarse classification of an [`ExchangeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The KEM rejected its input, or the randomness source failed
    PrimitiveFailure,
    /// Stream, roster, or slot shapes disagree with the agreed session
    AddressingMismatch,
    /// A derived key is degenerate or inconsistent
    IntegrityViolation,
}

/// Errors that can occur while running the pairwise exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// A roster entry failed to decode or validate
    #[error("{phase}: public key for slot {slot} rejected: {source}")]
    InvalidPublicKey {
        /// Phase the key was decoded in
        phase: Phase,
        /// Global slot index of the rejected key
        slot: usize,
        /// Underlying KEM error
        source: KemError,
    },

    /// The KEM failed for a specific pair
    #[error("{phase}: kem failed for pair ({lower}, {higher}): {source}")]
    Primitive {
        /// Phase the failure occurred in
        phase: Phase,
        /// Lower global index of the pair
        lower: usize,
        /// Higher global index of the pair
        higher: usize,
        /// Underlying KEM error
        source: KemError,
    },

    /// A ciphertext in a received contribution failed to decode
    #[error("{phase}: ciphertext {index} is malformed: {source}")]
    MalformedCiphertext {
        /// Phase the ciphertext was decoded in
        phase: Phase,
        /// Index within the contribution
        index: usize,
        /// Underlying KEM error
        source: KemError,
    },

    /// The caller's randomness source failed
    #[error("{phase}: {source}")]
    Randomness {
        /// Phase the source was read in
        phase: Phase,
        /// Underlying error
        source: KemError,
    },

    /// A length or count disagrees with the agreed session shape
    #[error("{phase}: {what} mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Phase the mismatch was detected in
        phase: Phase,
        /// What was being measured
        what: &'static str,
        /// Value implied by the session
        expected: usize,
        /// Value observed
        actual: usize,
    },

    /// A participant's slot range does not fit inside the roster
    #[error("{phase}: {count} slots starting at {start} exceed roster of {total} slots")]
    SlotRangeOutOfBounds {
        /// Phase the range was checked in
        phase: Phase,
        /// First global index of the range
        start: usize,
        /// Number of slots in the range
        count: usize,
        /// Roster size
        total: usize,
    },

    /// The session has more slots than addressing supports
    #[error("{total} slots exceed the limit of {max}")]
    TooManySlots {
        /// Requested slot count
        total: usize,
        /// Supported maximum
        max: usize,
    },

    /// A later call used a different start offset than an earlier one
    #[error("{phase}: start offset {requested} differs from bound offset {bound}")]
    StartOffsetChanged {
        /// Phase of the offending call
        phase: Phase,
        /// Offset bound by the first call
        bound: usize,
        /// Offset passed to this call
        requested: usize,
    },

    /// Encapsulation was attempted twice on one engine
    #[error("{phase} already completed for this session")]
    PhaseRepeated {
        /// Phase that was repeated
        phase: Phase,
    },

    /// A phase required by the operation has not run
    #[error("{missing} has not completed")]
    Incomplete {
        /// Phase that is still outstanding
        missing: Phase,
    },

    /// Local roster does not hash to the agreed fingerprint
    #[error("roster fingerprint diverges from the agreed value")]
    RosterDivergence,

    /// A non-self pair produced the all-zero sentinel
    #[error("{phase}: zero shared key for pair ({lower}, {higher})")]
    ZeroSharedKey {
        /// Phase the key was produced in
        phase: Phase,
        /// Lower global index of the pair
        lower: usize,
        /// Higher global index of the pair
        higher: usize,
    },

    /// A slot's entry for itself is not the zero sentinel
    #[error("self entry for slot {slot} is not the zero sentinel")]
    NonZeroSelfKey {
        /// Global slot index
        slot: usize,
    },
}

impl ExchangeError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPublicKey { .. }
            | Self::Primitive { .. }
            | Self::MalformedCiphertext { .. }
            | Self::Randomness { .. } => ErrorKind::PrimitiveFailure,

            Self::ShapeMismatch { .. }
            | Self::SlotRangeOutOfBounds { .. }
            | Self::TooManySlots { .. }
            | Self::StartOffsetChanged { .. }
            | Self::PhaseRepeated { .. }
            | Self::Incomplete { .. }
            | Self::RosterDivergence => ErrorKind::AddressingMismatch,

            Self::ZeroSharedKey { .. } | Self::NonZeroSelfKey { .. } => {
                ErrorKind::IntegrityViolation
            },
        }
    }

    /// Phase the error was raised in.
    pub fn phase(&self) -> Phase {
        match self {
            Self::InvalidPublicKey { phase, .. }
            | Self::Primitive { phase, .. }
            | Self::MalformedCiphertext { phase, .. }
            | Self::Randomness { phase, .. }
            | Self::ShapeMismatch { phase, .. }
            | Self::SlotRangeOutOfBounds { phase, .. }
            | Self::StartOffsetChanged { phase, .. }
            | Self::PhaseRepeated { phase }
            | Self::ZeroSharedKey { phase, .. } => *phase,
            Self::TooManySlots { .. } | Self::RosterDivergence => Phase::Bootstrap,
            Self::Incomplete { .. } | Self::NonZeroSelfKey { .. } => Phase::Finish,
        }
    }

    /// Returns true if the session must be abandoned.
    ///
    /// Primitive failures outside decapsulation are not fatal: they may
    /// succeed once the whole session is restarted with a fresh randomness
    /// source. Anything raised while decapsulating means the broadcast stream
    /// itself is bad, addressing mismatches indicate a desynchronized peer,
    /// and integrity violations a broken primitive.
    pub fn is_fatal(&self) -> bool {
        self.phase() == Phase::Decapsulate || self.kind() != ErrorKind::PrimitiveFailure
    }

    /// Returns true for security-relevant faults that must never be ignored.
    pub fn is_security_fault(&self) -> bool {
        matches!(self.kind(), ErrorKind::IntegrityViolation)
    }
}
