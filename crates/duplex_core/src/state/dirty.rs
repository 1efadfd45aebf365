//! # Dirty Tracking
//!
//! Solves the cold back buffer problem:
//!
//! ```text
//! tick n:    sim edits A in back slot        back: A'   front: A
//! swap:      roles flip                      back: A    front: A'   <- stale!
//! re-sync:   copy dirty slots front → back   back: A'   front: A'
//! ```
//!
//! Only slots touched by `edit_dynamic` since the last swap are copied.
//! Bits are set by the simulation thread and drained by the swap, which
//! never overlap (the store's phase word orders them), so relaxed atomics
//! are enough.

use std::sync::atomic::{AtomicU64, Ordering};

/// Bitset: 1 = edited since last swap. 64 slots per word.
pub(crate) struct DirtySet {
    words: Box<[AtomicU64]>,
}

impl DirtySet {
    /// Creates a clean set covering `capacity` slots.
    pub(crate) fn new(capacity: usize) -> Self {
        let word_count = capacity.div_ceil(64);
        Self {
            words: (0..word_count).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Marks a slot index as dirty.
    ///
    /// O(1) - single bit operation.
    #[inline]
    pub(crate) fn mark(&self, index: usize) {
        let word = index / 64;
        let bit = index % 64;
        self.words[word].fetch_or(1u64 << bit, Ordering::Relaxed);
    }

    /// Checks if a slot index is dirty.
    #[cfg(test)]
    pub(crate) fn is_dirty(&self, index: usize) -> bool {
        self.words[index / 64].load(Ordering::Relaxed) & (1u64 << (index % 64)) != 0
    }

    /// Clears the set, calling `f` for every index that was dirty.
    ///
    /// Returns the number of dirty slots visited.
    pub(crate) fn drain(&self, mut f: impl FnMut(usize)) -> usize {
        let mut visited = 0;
        for (word_index, word) in self.words.iter().enumerate() {
            let mut bits = word.swap(0, Ordering::Relaxed);
            while bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                f(word_index * 64 + bit);
                bits &= bits - 1;
                visited += 1;
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_drain() {
        let set = DirtySet::new(200);
        set.mark(3);
        set.mark(64);
        set.mark(199);
        set.mark(3);
        assert!(set.is_dirty(64));
        assert!(!set.is_dirty(65));

        let mut seen = Vec::new();
        assert_eq!(set.drain(|i| seen.push(i)), 3);
        assert_eq!(seen, vec![3, 64, 199]);

        assert_eq!(set.drain(|_| panic!("set should be clean")), 0);
    }

    #[test]
    fn test_empty_capacity() {
        let set = DirtySet::new(0);
        assert_eq!(set.drain(|_| {}), 0);
    }
}
