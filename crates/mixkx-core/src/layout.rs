//! Slot layout: contiguous global ranges assigned by concatenation.

use std::ops::Range;

use crate::{
    addressing::{self, MAX_SLOTS},
    error::ExchangeError,
};

/// Contiguous range of global slot indices owned by one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SlotRange {
    /// First global index
    pub start: usize,
    /// Number of slots
    pub count: usize,
}

impl SlotRange {
    /// Create a range of `count` slots starting at `start`.
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// One past the last global index.
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    /// Whether `global` is owned by this range.
    pub fn contains(&self, global: usize) -> bool {
        global >= self.start && global < self.end()
    }

    /// Local row index of `global`, if owned.
    pub fn local(&self, global: usize) -> Option<usize> {
        self.contains(global).then(|| global - self.start)
    }

    /// Global indices in ascending order.
    pub fn globals(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Assignment of global slot ranges to participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLayout {
    ranges: Vec<SlotRange>,
    total: usize,
}

impl SlotLayout {
    /// Concatenate per-participant slot counts into global ranges.
    ///
    /// Participants with zero slots are allowed. They own no rows and
    /// contribute no ciphertexts.
    pub fn from_counts(counts: &[usize]) -> Result<Self, ExchangeError> {
        let mut ranges = Vec::with_capacity(counts.len());
        let mut total = 0usize;
        for &count in counts {
            let start = total;
            total = total.checked_add(count).unwrap_or(usize::MAX);
            if total > MAX_SLOTS {
                return Err(ExchangeError::TooManySlots { total, max: MAX_SLOTS });
            }
            ranges.push(SlotRange { start, count });
        }
        Ok(Self { ranges, total })
    }

    /// Total number of slots, `M_total`.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of participants.
    pub fn participants(&self) -> usize {
        self.ranges.len()
    }

    /// Range of participant `p`.
    pub fn range(&self, p: usize) -> Option<SlotRange> {
        self.ranges.get(p).copied()
    }

    /// All ranges in participant order.
    pub fn ranges(&self) -> &[SlotRange] {
        &self.ranges
    }

    /// Participant and local row owning `global`.
    pub fn owner_of(&self, global: usize) -> Option<(usize, usize)> {
        if global >= self.total {
            return None;
        }
        let p = self.ranges.partition_point(|range| range.end() <= global);
        let local = self.ranges.get(p)?.local(global)?;
        Some((p, local))
    }

    /// Ciphertext stream range participant `p` produces.
    pub fn contribution_range(&self, p: usize) -> Option<Range<usize>> {
        let range = self.range(p)?;
        addressing::contribution_range(self.total, range.start, range.count)
    }

    /// Length of the full ciphertext stream.
    pub fn stream_len(&self) -> usize {
        addressing::stream_len(self.total)
    }
}
