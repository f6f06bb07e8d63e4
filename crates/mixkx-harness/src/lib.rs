//! Deterministic simulation harness for mixkx sessions.
//!
//! Runs all participants of a pairwise exchange in one process from a single
//! seed, so any failure reproduces from its configuration alone.
//!
//! # Fault Injection
//!
//! [`SimSession::with_fault`] injects one [`Fault`]: a truncated stream, a
//! divergent roster copy, a failing randomness source, or a damaged
//! broadcast. Each must surface as a typed error, never as a zero key.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks the cross-participant properties no single
//! engine can see: symmetry and collision-freedom of the assembled key
//! matrix. Use [`InvariantRegistry::standard()`] for the full set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod invariants;
pub mod session;

pub use fault::{FailingRng, Fault};
pub use invariants::{
    CollisionFreedom, Invariant, InvariantKind, InvariantRegistry, InvariantResult, KeyBytes,
    NonZeroOffDiagonal, ParticipantSnapshot, StreamShape, Symmetry, SystemSnapshot, Violation,
    ZeroDiagonal,
};
pub use session::{SessionConfig, SessionError, SessionOutcome, SimSession};
