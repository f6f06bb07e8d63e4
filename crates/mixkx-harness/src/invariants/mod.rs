//! Invariant checking for simulated sessions.
//!
//! Invariants are properties every finished exchange must satisfy, whatever
//! the layout, seed, or execution order. Local checks inside the engine can
//! only see one participant; these see the whole session at once.
//!
//! # Architecture
//!
//! A finished session is copied into a [`SystemSnapshot`], then every
//! registered [`Invariant`] runs against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = outcome.snapshot();
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{CollisionFreedom, NonZeroOffDiagonal, StreamShape, Symmetry, ZeroDiagonal};
pub use snapshot::{KeyBytes, ParticipantSnapshot, SystemSnapshot};

/// Identifies an invariant in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// Self entries hold the zero sentinel
    ZeroDiagonal,
    /// Every non-self entry holds a key
    NonZeroOffDiagonal,
    /// Both slots of a pair hold the same key
    Symmetry,
    /// No two pairs share a key
    CollisionFreedom,
    /// Stream and slot ranges match the triangular layout
    StreamShape,
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ZeroDiagonal => "zero-diagonal",
            Self::NonZeroOffDiagonal => "non-zero-off-diagonal",
            Self::Symmetry => "symmetry",
            Self::CollisionFreedom => "collision-freedom",
            Self::StreamShape => "stream-shape",
        })
    }
}

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Which invariant was violated.
    pub invariant: InvariantKind,
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against a session snapshot.
pub trait Invariant: Send + Sync {
    /// Invariant identity for error reporting.
    fn kind(&self) -> InvariantKind;

    /// Check the invariant against the snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing the first offending entry.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with every matrix invariant.
    ///
    /// Includes:
    /// - [`ZeroDiagonal`]: self entries are zero
    /// - [`NonZeroOffDiagonal`]: every other entry is filled
    /// - [`Symmetry`]: both sides of a pair agree
    /// - [`CollisionFreedom`]: no key is shared by two pairs
    /// - [`StreamShape`]: stream length and slot ranges fit the roster
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ZeroDiagonal);
        registry.add(NonZeroOffDiagonal);
        registry.add(Symmetry);
        registry.add(CollisionFreedom);
        registry.add(StreamShape);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        let snapshot = SystemSnapshot::empty();
        assert!(registry.check_all(&snapshot).is_ok());
    }

    #[test]
    fn violation_display_names_invariant() {
        let violation =
            Violation { invariant: InvariantKind::Symmetry, message: "slots 0 and 1".to_string() };
        assert_eq!(violation.to_string(), "symmetry: slots 0 and 1");
    }
}
