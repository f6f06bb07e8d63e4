//! Standard invariant checks.
//!
//! The first four are the matrix laws of the exchange. The last ties the
//! observed stream and slot ranges back to the roster size.

use std::collections::HashMap;

use mixkx_core::stream_len;

use super::{Invariant, InvariantKind, InvariantResult, KeyBytes, SystemSnapshot, Violation};

const ZERO: KeyBytes = [0u8; 32];

/// First four bytes in hex; enough to tell keys apart in a report.
fn short(key: &KeyBytes) -> String {
    hex::encode(&key[..4])
}

/// Every slot's entry for itself is the zero sentinel.
pub struct ZeroDiagonal;

impl Invariant for ZeroDiagonal {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ZeroDiagonal
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (own, peer, key) in state.entries() {
            if own == peer && key != ZERO {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("slot {own}: self entry is {}..", short(&key)),
                });
            }
        }
        Ok(())
    }
}

/// Every entry between two distinct slots holds a derived key.
///
/// A zero here means a pair was skipped or a failure was swallowed.
pub struct NonZeroOffDiagonal;

impl Invariant for NonZeroOffDiagonal {
    fn kind(&self) -> InvariantKind {
        InvariantKind::NonZeroOffDiagonal
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (own, peer, key) in state.entries() {
            if own != peer && key == ZERO {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("slot {own}: entry for slot {peer} is zero"),
                });
            }
        }
        Ok(())
    }
}

/// Both slots of a pair hold the same key, across participants.
pub struct Symmetry;

impl Invariant for Symmetry {
    fn kind(&self) -> InvariantKind {
        InvariantKind::Symmetry
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (own, peer, key) in state.entries() {
            if own >= peer {
                continue;
            }
            match state.key(peer, own) {
                Some(mirror) if mirror == key => {},
                Some(mirror) => {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!(
                            "slots {own} and {peer} disagree: {}.. vs {}..",
                            short(&key),
                            short(&mirror)
                        ),
                    });
                },
                None => {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!("slot {peer} has no owner to mirror slot {own}"),
                    });
                },
            }
        }
        Ok(())
    }
}

/// No two distinct pairs share a non-zero key.
pub struct CollisionFreedom;

impl Invariant for CollisionFreedom {
    fn kind(&self) -> InvariantKind {
        InvariantKind::CollisionFreedom
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut seen: HashMap<KeyBytes, (usize, usize)> = HashMap::new();
        for (own, peer, key) in state.entries() {
            if own == peer || key == ZERO {
                continue;
            }
            let pair = (own.min(peer), own.max(peer));
            if let Some(&first) = seen.get(&key) {
                if first != pair {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!(
                            "pairs {first:?} and {pair:?} share key {}..",
                            short(&key)
                        ),
                    });
                }
            } else {
                seen.insert(key, pair);
            }
        }
        Ok(())
    }
}

/// The stream has one entry per pair and participant ranges tile the
/// roster in order, each with a full-width row per slot.
pub struct StreamShape;

impl Invariant for StreamShape {
    fn kind(&self) -> InvariantKind {
        InvariantKind::StreamShape
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let expected = stream_len(state.total);
        if state.stream_len != expected {
            return Err(Violation {
                invariant: self.kind(),
                message: format!(
                    "stream has {} ciphertexts, {} slots need {expected}",
                    state.stream_len, state.total
                ),
            });
        }

        let mut next = 0;
        for (p, participant) in state.participants.iter().enumerate() {
            if participant.slots.start != next {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "participant {p} starts at {}, expected {next}",
                        participant.slots.start
                    ),
                });
            }
            if participant.rows.len() != participant.slots.count
                || participant.rows.iter().any(|row| row.len() != state.total)
            {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "participant {p}: matrix is not {} x {}",
                        participant.slots.count, state.total
                    ),
                });
            }
            next = participant.slots.end();
        }

        if next != state.total && !state.participants.is_empty() {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("participants cover {next} of {} slots", state.total),
            });
        }
        Ok(())
    }
}
