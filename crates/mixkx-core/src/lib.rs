//! mixkx Pairwise Exchange
//!
//! Establishes one 32-byte shared key for every unordered pair of message
//! slots in a mix session, in a single round of KEM encapsulations.
//!
//! # Architecture
//!
//! ```text
//! SlotLayout ──▶ start offset per participant
//!      │
//! Roster (Arc, shared) ──▶ PairwiseExchange (one per participant)
//!                              │ encapsulate ──▶ contribution ─┐
//!                              │                               ▼ broadcast
//!                              │ decapsulate ◀── assembled stream
//!                              ▼
//!                        SharedKeyMatrix
//! ```
//!
//! Pairs are addressed by a closed-form triangular numbering (see
//! [`addressing`]), so the stream carries no tags: a ciphertext's position
//! alone identifies its pair.
//!
//! # Errors
//!
//! Every operation returns [`ExchangeError`]. Errors are classified into
//! primitive failures, addressing mismatches, and integrity violations; see
//! [`ErrorKind`]. Nothing is retried and no failure turns into a zero key.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod addressing;
pub mod error;
pub mod exchange;
pub mod layout;
pub mod matrix;
pub mod roster;
pub mod wire;

pub use addressing::{
    MAX_SLOTS, PairIter, contribution_range, pair_at, pair_position, row_start, stream_len,
};
pub use error::{ErrorKind, ExchangeError, Phase};
pub use exchange::{ExchangeConfig, PairwiseExchange};
pub use layout::{SlotLayout, SlotRange};
pub use matrix::SharedKeyMatrix;
pub use roster::Roster;
pub use wire::{assemble_stream, decode_contribution, encode_contribution};
