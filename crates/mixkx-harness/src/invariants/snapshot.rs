//! Observable state snapshots for invariant checking.
//!
//! Snapshots copy every participant's matrix out of the live session so that
//! invariants see one consistent view, and so tests can tamper with a copy
//! without touching the engines.

use mixkx_core::{SharedKeyMatrix, SlotRange};

/// Raw bytes of one shared key.
pub type KeyBytes = [u8; 32];

/// Snapshot of a whole session after the exchange.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Number of global slots.
    pub total: usize,
    /// Length of the assembled ciphertext stream.
    pub stream_len: usize,
    /// Per-participant state in participant order.
    pub participants: Vec<ParticipantSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no participants).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the matrices of a finished session.
    pub fn from_matrices(matrices: &[SharedKeyMatrix], stream_len: usize) -> Self {
        let total = matrices.first().map_or(0, SharedKeyMatrix::columns);
        let participants = matrices.iter().map(ParticipantSnapshot::from_matrix).collect();
        Self { total, stream_len, participants }
    }

    /// Key held by global slot `own` for global slot `peer`.
    pub fn key(&self, own: usize, peer: usize) -> Option<KeyBytes> {
        let participant = self.participants.iter().find(|p| p.slots.contains(own))?;
        participant.key(own, peer)
    }

    /// Iterate `(own, peer, key)` over every entry of every participant.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, KeyBytes)> + '_ {
        self.participants.iter().flat_map(ParticipantSnapshot::entries)
    }
}

/// Snapshot of one participant's matrix.
#[derive(Debug, Clone, Default)]
pub struct ParticipantSnapshot {
    /// Global slots owned by this participant.
    pub slots: SlotRange,
    /// One row per owned slot, one column per global slot.
    pub rows: Vec<Vec<KeyBytes>>,
}

impl ParticipantSnapshot {
    /// Copy a matrix.
    pub fn from_matrix(matrix: &SharedKeyMatrix) -> Self {
        let rows =
            matrix.iter_rows().map(|(_, row)| row.iter().map(|key| *key.as_bytes()).collect()).collect();
        Self { slots: matrix.slots(), rows }
    }

    /// All-zero participant with `count` slots starting at `start` in a
    /// session of `total` slots.
    pub fn zeroed(start: usize, count: usize, total: usize) -> Self {
        Self { slots: SlotRange::new(start, count), rows: vec![vec![[0u8; 32]; total]; count] }
    }

    /// Key for owned global slot `own` and global slot `peer`.
    pub fn key(&self, own: usize, peer: usize) -> Option<KeyBytes> {
        self.rows.get(self.slots.local(own)?)?.get(peer).copied()
    }

    /// Overwrite one entry.
    pub fn with_key(mut self, own: usize, peer: usize, key: KeyBytes) -> Self {
        if let Some(entry) =
            self.slots.local(own).and_then(|row| self.rows.get_mut(row)).and_then(|row| row.get_mut(peer))
        {
            *entry = key;
        }
        self
    }

    fn entries(&self) -> impl Iterator<Item = (usize, usize, KeyBytes)> + '_ {
        self.slots.globals().zip(&self.rows).flat_map(|(own, row)| {
            row.iter().enumerate().map(move |(peer, key)| (own, peer, *key))
        })
    }
}
