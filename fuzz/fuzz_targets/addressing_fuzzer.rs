//! Fuzz target for slot addressing
//!
//! # Strategy
//!
//! - Arbitrary roster sizes up to and past the slot limit
//! - Arbitrary index pairs, including self-pairs and out-of-range indices
//! - Arbitrary stream positions, including past the end
//! - Arbitrary slot layouts built from participant counts
//!
//! # Invariants
//!
//! - `pair_at(pair_position(m, k)) == (min, max)` for every valid pair
//! - `pair_position(pair_at(pos)) == pos` for every valid position
//! - Self-pairs and out-of-range input yield `None`
//! - Contributions tile the stream exactly
//! - NEVER panic, whatever the input

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mixkx_core::{
    MAX_SLOTS, PairIter, SlotLayout, contribution_range, pair_at, pair_position, row_start,
    stream_len,
};

#[derive(Debug, Arbitrary)]
enum AddressingOp {
    Pair { total: u32, a: u32, b: u32 },
    Position { total: u32, pos: u64 },
    Raw { total: usize, a: usize, b: usize, pos: usize },
    Layout { counts: Vec<u8> },
}

fuzz_target!(|op: AddressingOp| {
    match op {
        AddressingOp::Pair { total, a, b } => {
            let total = total as usize % (MAX_SLOTS + 1);
            let (a, b) = (a as usize, b as usize);
            match pair_position(total, a, b) {
                Some(pos) => {
                    assert!(a != b && a < total && b < total);
                    assert!(pos < stream_len(total));
                    assert_eq!(pair_at(total, pos), Some((a.min(b), a.max(b))));
                }
                None => assert!(a == b || a >= total || b >= total),
            }
        }

        AddressingOp::Position { total, pos } => {
            let total = total as usize % (MAX_SLOTS + 1);
            let pos = pos as usize;
            match pair_at(total, pos) {
                Some((m, k)) => {
                    assert!(m < k && k < total);
                    assert_eq!(pair_position(total, m, k), Some(pos));
                }
                None => assert!(pos >= stream_len(total)),
            }
        }

        AddressingOp::Raw { total, a, b, pos } => {
            // totals far past the limit must still be handled without panics
            let _ = stream_len(total);
            let _ = row_start(total, a);
            let _ = pair_position(total, a, b);
            let _ = contribution_range(total, a, b);
            let _ = pair_at(total, pos);
        }

        AddressingOp::Layout { counts } => {
            let counts: Vec<usize> = counts.into_iter().map(usize::from).collect();
            let Ok(layout) = SlotLayout::from_counts(&counts) else {
                return;
            };

            let mut next = 0;
            for (p, range) in layout.ranges().iter().enumerate() {
                let contribution = layout.contribution_range(p).unwrap();
                assert_eq!(contribution.start, next);
                assert_eq!(PairIter::new(layout.total(), range.globals()).len(), contribution.len());
                next = contribution.end;
            }
            assert_eq!(next, layout.stream_len());
        }
    }
});
