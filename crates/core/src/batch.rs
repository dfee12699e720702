//! Chunking arithmetic for bulk mutations.
//!
//! Bulk state changes over large ID sets are issued to the store in
//! bounded-size batches. The slicing itself is pure; the sequential
//! issue-and-aggregate loop lives with the callers in `opsdesk-api`.

use crate::types::DbId;

/// Default number of ids per store call.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Outcome of a batched bulk mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Total affected rows reported by the store, summed across batches.
    pub count: u64,
    /// Number of batches issued.
    pub batches: u64,
}

/// Split `ids` into `ceil(len / batch_size)` contiguous chunks.
///
/// An empty slice yields no chunks. `batch_size` is floored to 1 so a
/// degenerate size can never loop forever.
pub fn chunks(ids: &[DbId], batch_size: usize) -> impl Iterator<Item = &[DbId]> {
    ids.chunks(batch_size.max(1))
}

/// The number of chunks [`chunks`] will yield.
pub fn chunk_count(len: usize, batch_size: usize) -> u64 {
    (len.div_ceil(batch_size.max(1))) as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_yield_no_chunks() {
        assert_eq!(chunks(&[], 10).count(), 0);
        assert_eq!(chunk_count(0, 10), 0);
    }

    #[test]
    fn exact_multiple_splits_evenly() {
        let ids: Vec<DbId> = (1..=10).collect();
        let got: Vec<&[DbId]> = chunks(&ids, 5).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], &ids[..5]);
        assert_eq!(got[1], &ids[5..]);
        assert_eq!(chunk_count(10, 5), 2);
    }

    #[test]
    fn remainder_gets_a_short_final_chunk() {
        let ids: Vec<DbId> = (1..=11).collect();
        let got: Vec<&[DbId]> = chunks(&ids, 5).collect();
        assert_eq!(got.len(), 3);
        assert_eq!(got[2], &[11]);
        assert_eq!(chunk_count(11, 5), 3);
    }

    #[test]
    fn chunks_are_contiguous_and_complete() {
        let ids: Vec<DbId> = (1..=23).collect();
        let rejoined: Vec<DbId> = chunks(&ids, 7).flatten().copied().collect();
        assert_eq!(rejoined, ids);
    }

    #[test]
    fn zero_batch_size_is_floored_to_one() {
        let ids: Vec<DbId> = vec![1, 2, 3];
        assert_eq!(chunks(&ids, 0).count(), 3);
        assert_eq!(chunk_count(3, 0), 3);
    }
}
