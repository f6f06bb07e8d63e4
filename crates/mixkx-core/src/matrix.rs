//! Shared-key matrix: one participant's slab of the global pair table.
//!
//! Rows are the participant's own slots, columns are every global slot.
//! Storage is a single flat arena indexed by `(row, column)`; no two
//! participants ever alias the same storage.

use std::fmt;

use mixkx_crypto::SharedKey;

use crate::{
    error::{ExchangeError, Phase},
    layout::SlotRange,
};

/// Pairwise keys held by one participant.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKeyMatrix {
    slots: SlotRange,
    columns: usize,
    cells: Vec<SharedKey>,
}

impl SharedKeyMatrix {
    /// Allocate a matrix filled with the zero sentinel.
    pub fn new(slots: SlotRange, columns: usize) -> Self {
        Self { slots, columns, cells: vec![SharedKey::ZERO; slots.count * columns] }
    }

    /// Global slots owned by this matrix's rows.
    pub fn slots(&self) -> SlotRange {
        self.slots
    }

    /// Number of rows (local slots).
    pub fn rows(&self) -> usize {
        self.slots.count
    }

    /// Number of columns (global slots).
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Key at local row `row`, global column `column`.
    pub fn get(&self, row: usize, column: usize) -> Option<&SharedKey> {
        if row >= self.rows() || column >= self.columns {
            return None;
        }
        self.cells.get(row * self.columns + column)
    }

    /// Key between the owned global slot `own` and any global slot `peer`.
    pub fn key_between(&self, own: usize, peer: usize) -> Option<&SharedKey> {
        self.get(self.slots.local(own)?, peer)
    }

    /// Full row for local slot `row`.
    pub fn row(&self, row: usize) -> Option<&[SharedKey]> {
        if row >= self.rows() {
            return None;
        }
        let start = row * self.columns;
        self.cells.get(start..start + self.columns)
    }

    /// Rows paired with the global index of the slot they belong to.
    pub fn iter_rows(&self) -> impl Iterator<Item = (usize, &[SharedKey])> + '_ {
        self.slots.globals().filter_map(move |global| {
            let row = self.row(global - self.slots.start)?;
            Some((global, row))
        })
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, key: SharedKey) {
        debug_assert!(row < self.rows() && column < self.columns);
        debug_assert_ne!(self.slots.start + row, column, "self entry is reserved");
        self.cells[row * self.columns + column] = key;
    }

    /// Number of non-self entries still holding the zero sentinel.
    pub fn missing_entries(&self) -> usize {
        self.iter_rows()
            .map(|(own, row)| {
                row.iter().enumerate().filter(|&(peer, key)| peer != own && key.is_zero()).count()
            })
            .sum()
    }

    /// Whether every non-self entry holds a derived key.
    pub fn is_complete(&self) -> bool {
        self.missing_entries() == 0
    }

    /// Check the local invariants: self entries are the zero sentinel and
    /// every other entry is non-zero.
    pub fn check_integrity(&self) -> Result<(), ExchangeError> {
        for (own, row) in self.iter_rows() {
            for (peer, key) in row.iter().enumerate() {
                if peer == own {
                    if !key.is_zero() {
                        return Err(ExchangeError::NonZeroSelfKey { slot: own });
                    }
                } else if key.is_zero() {
                    return Err(ExchangeError::ZeroSharedKey {
                        phase: Phase::Finish,
                        lower: own.min(peer),
                        higher: own.max(peer),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SharedKeyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyMatrix")
            .field("slots", &self.slots)
            .field("columns", &self.columns)
            .field("missing", &self.missing_entries())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use mixkx_crypto::SHARED_KEY_SIZE;

    use super::*;

    fn key(byte: u8) -> SharedKey {
        SharedKey::from_bytes([byte; SHARED_KEY_SIZE])
    }

    #[test]
    fn new_matrix_is_all_zero() {
        let matrix = SharedKeyMatrix::new(SlotRange::new(2, 2), 6);
        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.columns(), 6);
        assert_eq!(matrix.missing_entries(), 10);
        assert!(!matrix.is_complete());
        assert!(matrix.get(1, 5).unwrap().is_zero());
    }

    #[test]
    fn out_of_range_access_is_none() {
        let matrix = SharedKeyMatrix::new(SlotRange::new(0, 2), 3);
        assert!(matrix.get(2, 0).is_none());
        assert!(matrix.get(0, 3).is_none());
        assert!(matrix.row(2).is_none());
        assert!(matrix.key_between(2, 0).is_none());
    }

    #[test]
    fn filled_matrix_passes_integrity() {
        let mut matrix = SharedKeyMatrix::new(SlotRange::new(1, 2), 3);
        // own slot 1: peers 0 and 2; own slot 2: peers 0 and 1
        matrix.set(0, 0, key(1));
        matrix.set(0, 2, key(2));
        matrix.set(1, 0, key(3));
        matrix.set(1, 1, key(2));

        assert!(matrix.is_complete());
        assert!(matrix.check_integrity().is_ok());
        assert_eq!(matrix.key_between(1, 2), matrix.key_between(2, 1));
    }

    #[test]
    fn missing_entry_is_integrity_violation() {
        let mut matrix = SharedKeyMatrix::new(SlotRange::new(0, 1), 3);
        matrix.set(0, 1, key(1));

        assert_eq!(matrix.missing_entries(), 1);
        let err = matrix.check_integrity().unwrap_err();
        assert!(matches!(err, ExchangeError::ZeroSharedKey { lower: 0, higher: 2, .. }));
        assert!(err.is_security_fault());
    }

    #[test]
    fn single_slot_matrix_is_trivially_complete() {
        let matrix = SharedKeyMatrix::new(SlotRange::new(0, 1), 1);
        assert!(matrix.is_complete());
        assert!(matrix.check_integrity().is_ok());
        assert!(matrix.get(0, 0).unwrap().is_zero());
    }

    #[test]
    fn iter_rows_reports_global_indices() {
        let matrix = SharedKeyMatrix::new(SlotRange::new(4, 2), 6);
        let globals: Vec<_> = matrix.iter_rows().map(|(global, row)| (global, row.len())).collect();
        assert_eq!(globals, vec![(4, 6), (5, 6)]);
    }

    #[test]
    fn empty_matrix() {
        let matrix = SharedKeyMatrix::new(SlotRange::new(3, 0), 3);
        assert_eq!(matrix.rows(), 0);
        assert!(matrix.is_complete());
        assert_eq!(matrix.iter_rows().count(), 0);
    }
}
