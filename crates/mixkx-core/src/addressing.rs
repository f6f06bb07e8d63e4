//! Slot addressing: triangular numbering of unordered slot pairs.
//!
//! Every unordered pair of distinct global slot indices `(m, k)`, `m < k`,
//! owns exactly one position in the ciphertext stream. Pairs are ordered by
//! ascending `m`, then ascending `k`:
//!
//! ```text
//! total = 4
//!
//!   pos:   0     1     2     3     4     5
//!   pair: (0,1) (0,2) (0,3) (1,2) (1,3) (2,3)
//!         └── row 0 ──┘ └ row 1 ┘ └row 2┘
//! ```
//!
//! The mapping depends only on the roster size, so every participant
//! locates every pair without any tag on the wire. All functions are total:
//! out-of-range input yields `None`, never a panic.

use std::ops::Range;

/// Largest roster size the exchange accepts.
///
/// Keeps every stream position comfortably inside `usize` and bounds the
/// quadratic stream to something a session could actually broadcast.
pub const MAX_SLOTS: usize = 1 << 16;

/// Number of unordered pairs among `total` slots: `total * (total - 1) / 2`.
///
/// Saturates at `usize::MAX` for rosters far beyond [`MAX_SLOTS`].
pub fn stream_len(total: usize) -> usize {
    let total = total as u128;
    let len = total * total.saturating_sub(1) / 2;
    usize::try_from(len).unwrap_or(usize::MAX)
}

/// Stream position of the first pair whose lower index is `m`.
///
/// Equals the number of pairs with a smaller lower index:
/// `Σ_{i<m} (total - 1 - i)`. `row_start(total, total)` is the stream
/// length. Returns `None` if `m > total`.
pub fn row_start(total: usize, m: usize) -> Option<usize> {
    if m > total {
        return None;
    }
    usize::try_from(row_start_wide(total as u128, m as u128)).ok()
}

// m * (2 * total - m - 1) / 2 for m <= total. The two factors have opposite
// parity, so halving the even one first keeps the product below 2^128 for
// any usize total.
fn row_start_wide(total: u128, m: u128) -> u128 {
    if m == 0 {
        return 0;
    }
    let span = 2 * total - m - 1;
    if m % 2 == 0 { (m / 2) * span } else { m * (span / 2) }
}

/// Stream position of the unordered pair `{a, b}`.
///
/// Accepts either order. Returns `None` for a self-pair or an index outside
/// the roster.
pub fn pair_position(total: usize, a: usize, b: usize) -> Option<usize> {
    let (m, k) = if a < b { (a, b) } else { (b, a) };
    if m == k || k >= total {
        return None;
    }
    Some(row_start(total, m)? + (k - m - 1))
}

/// Canonical pair `(m, k)`, `m < k`, stored at stream position `pos`.
///
/// Inverse of [`pair_position`]. Returns `None` if `pos` is past the end of
/// the stream.
pub fn pair_at(total: usize, pos: usize) -> Option<(usize, usize)> {
    if pos >= stream_len(total) {
        return None;
    }

    // Largest m with row_start(m) <= pos. row_start(0) = 0 <= pos and
    // row_start(total - 1) = stream_len > pos bracket the search.
    let wide_total = total as u128;
    let wide_pos = pos as u128;
    let (mut lo, mut hi) = (0u128, wide_total - 1);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if row_start_wide(wide_total, mid) <= wide_pos {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let m = lo as usize;
    let offset = (wide_pos - row_start_wide(wide_total, lo)) as usize;
    Some((m, m + 1 + offset))
}

/// Stream range produced by the owner of slots `[start, start + count)`.
///
/// The owner of the lower index produces every pair, so a contiguous slot
/// range produces a contiguous run of the stream.
pub fn contribution_range(total: usize, start: usize, count: usize) -> Option<Range<usize>> {
    let end = start.checked_add(count)?;
    Some(row_start(total, start)?..row_start(total, end)?)
}

/// Iterator over canonical pairs `(m, k)` whose lower index lies in a slot
/// range, in stream order.
#[derive(Debug, Clone)]
pub struct PairIter {
    total: usize,
    lower: Range<usize>,
    m: usize,
    k: usize,
}

impl PairIter {
    /// Pairs whose lower index lies in `lower`.
    pub fn new(total: usize, lower: Range<usize>) -> Self {
        let end = lower.end.min(total);
        let start = lower.start.min(end);
        Self { total, lower: start..end, m: start, k: start.saturating_add(1) }
    }

    /// Every pair in the stream.
    pub fn all(total: usize) -> Self {
        Self::new(total, 0..total)
    }
}

impl Iterator for PairIter {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.m < self.lower.end {
            if self.k < self.total {
                let pair = (self.m, self.k);
                self.k += 1;
                return Some(pair);
            }
            self.m += 1;
            self.k = self.m + 1;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.m < self.lower.end {
            let rest_of_row = self.total.saturating_sub(self.k);
            let later_rows = contribution_range(self.total, self.m + 1, self.lower.end - self.m - 1)
                .map_or(0, |range| range.len());
            rest_of_row + later_rows
        } else {
            0
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PairIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_len_is_triangular() {
        assert_eq!(stream_len(0), 0);
        assert_eq!(stream_len(1), 0);
        assert_eq!(stream_len(2), 1);
        assert_eq!(stream_len(6), 15);
        assert_eq!(stream_len(MAX_SLOTS), MAX_SLOTS * (MAX_SLOTS - 1) / 2);
    }

    #[test]
    fn stream_len_saturates() {
        assert_eq!(stream_len(usize::MAX), usize::MAX);
    }

    #[test]
    fn huge_rosters_do_not_overflow() {
        assert_eq!(row_start(usize::MAX, usize::MAX), None);
        assert_eq!(row_start(usize::MAX, usize::MAX - 1), None);
        assert_eq!(row_start(usize::MAX, 1), Some(usize::MAX - 1));
        assert_eq!(pair_position(usize::MAX, 0, 1), Some(0));
        assert!(pair_at(usize::MAX, usize::MAX - 1).is_some());
    }

    #[test]
    fn positions_for_six_slots() {
        // Row 0 holds (0,1)..(0,5), row 1 starts at 5.
        assert_eq!(pair_position(6, 0, 1), Some(0));
        assert_eq!(pair_position(6, 0, 5), Some(4));
        assert_eq!(pair_position(6, 1, 2), Some(5));
        assert_eq!(pair_position(6, 2, 3), Some(9));
        assert_eq!(pair_position(6, 4, 5), Some(14));
    }

    #[test]
    fn position_is_order_independent() {
        assert_eq!(pair_position(6, 4, 1), pair_position(6, 1, 4));
    }

    #[test]
    fn self_pairs_and_out_of_range_have_no_position() {
        assert_eq!(pair_position(6, 3, 3), None);
        assert_eq!(pair_position(6, 0, 6), None);
        assert_eq!(pair_position(1, 0, 0), None);
        assert_eq!(pair_position(0, 0, 1), None);
    }

    #[test]
    fn pair_at_inverts_position() {
        let total = 9;
        for pos in 0..stream_len(total) {
            let (m, k) = pair_at(total, pos).unwrap();
            assert!(m < k && k < total);
            assert_eq!(pair_position(total, m, k), Some(pos));
        }
        assert_eq!(pair_at(total, stream_len(total)), None);
    }

    #[test]
    fn pair_at_empty_stream() {
        assert_eq!(pair_at(0, 0), None);
        assert_eq!(pair_at(1, 0), None);
        assert_eq!(pair_at(2, 0), Some((0, 1)));
    }

    #[test]
    fn row_start_endpoints() {
        assert_eq!(row_start(6, 0), Some(0));
        assert_eq!(row_start(6, 1), Some(5));
        assert_eq!(row_start(6, 5), Some(15));
        assert_eq!(row_start(6, 6), Some(15));
        assert_eq!(row_start(6, 7), None);
    }

    #[test]
    fn contributions_for_three_by_two() {
        assert_eq!(contribution_range(6, 0, 2), Some(0..9));
        assert_eq!(contribution_range(6, 2, 2), Some(9..14));
        assert_eq!(contribution_range(6, 4, 2), Some(14..15));
        assert_eq!(contribution_range(6, 5, 2), None);
        assert_eq!(contribution_range(6, usize::MAX, 2), None);
    }

    #[test]
    fn empty_contribution() {
        assert_eq!(contribution_range(6, 3, 0), Some(12..12));
    }

    #[test]
    fn pair_iter_matches_stream_order() {
        let total = 7;
        let pairs: Vec<_> = PairIter::all(total).collect();
        assert_eq!(pairs.len(), stream_len(total));
        for (pos, &(m, k)) in pairs.iter().enumerate() {
            assert_eq!(pair_position(total, m, k), Some(pos));
        }
    }

    #[test]
    fn pair_iter_covers_contribution() {
        let total = 6;
        let pairs: Vec<_> = PairIter::new(total, 2..4).collect();
        assert_eq!(pairs, vec![(2, 3), (2, 4), (2, 5), (3, 4), (3, 5)]);
        let range = contribution_range(total, 2, 2).unwrap();
        assert_eq!(pairs.len(), range.len());
        assert_eq!(pair_position(total, 2, 3), Some(range.start));
    }

    #[test]
    fn pair_iter_size_hint_is_exact() {
        let mut iter = PairIter::new(6, 0..2);
        assert_eq!(iter.len(), 9);
        iter.next();
        assert_eq!(iter.len(), 8);
        for _ in 0..4 {
            iter.next();
        }
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.by_ref().count(), 4);
        assert_eq!(iter.len(), 0);
    }

    #[test]
    fn pair_iter_last_slot_is_empty() {
        assert_eq!(PairIter::new(6, 5..6).count(), 0);
        assert_eq!(PairIter::new(1, 0..1).count(), 0);
        assert_eq!(PairIter::new(0, 0..0).count(), 0);
    }

    #[test]
    fn pair_iter_clamps_range() {
        assert_eq!(PairIter::new(3, 1..10).count(), 1);
        assert_eq!(PairIter::new(3, 5..10).count(), 0);
    }
}
