//! Compact unordered-pair sets used as the per-axis candidate move index.
//!
//! Each pair of row indices is packed into one `u64` (`first << 32 | second`) so that the
//! whole index is a flat vector: uniform sampling is an index into it and purging a row is a
//! single linear scan.

/// A multiset of unordered row pairs with swap-with-last deletion.
///
/// Callers never rely on iteration order; removals reorder the remaining pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairSet {
    pairs: Vec<u64>,
}

#[inline(always)]
fn pack(first: usize, second: usize) -> u64 {
    debug_assert!(first <= u32::MAX as usize && second <= u32::MAX as usize);
    ((first as u64) << 32) | second as u64
}

impl PairSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Adds the pair `(first, second)`. Duplicates are not suppressed.
    #[inline]
    pub fn insert(&mut self, first: usize, second: usize) {
        self.pairs.push(pack(first, second));
    }

    /// Removes one occurrence of the pair, in either order. Returns whether a pair was removed.
    pub fn remove_pair(&mut self, first: usize, second: usize) -> bool {
        let fwd = pack(first, second);
        let rev = pack(second, first);
        if let Some(pos) = self.pairs.iter().position(|&p| p == fwd || p == rev) {
            self.pairs.swap_remove(pos);
            true
        } else {
            false
        }
    }

    /// Removes every pair that mentions `row`.
    pub fn remove_all(&mut self, row: usize) {
        let row = row as u64;
        let mut i = 0;
        while i < self.pairs.len() {
            let p = self.pairs[i];
            if p >> 32 == row || p & 0xFFFF_FFFF == row {
                self.pairs.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Returns whether the pair is present, in either order.
    pub fn contains(&self, first: usize, second: usize) -> bool {
        let fwd = pack(first, second);
        let rev = pack(second, first);
        self.pairs.iter().any(|&p| p == fwd || p == rev)
    }

    /// Number of stored pairs.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns whether the set holds no pairs.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Removes all pairs, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// First row of the `i`-th pair.
    #[inline(always)]
    pub fn first(&self, i: usize) -> usize {
        (self.pairs[i] >> 32) as usize
    }

    /// Second row of the `i`-th pair.
    #[inline(always)]
    pub fn second(&self, i: usize) -> usize {
        (self.pairs[i] & 0xFFFF_FFFF) as usize
    }

    /// The `i`-th pair as `(first, second)`.
    #[inline(always)]
    pub fn get(&self, i: usize) -> (usize, usize) {
        (self.first(i), self.second(i))
    }

    /// Iterates the stored pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pairs
            .iter()
            .map(|&p| ((p >> 32) as usize, (p & 0xFFFF_FFFF) as usize))
    }
}

// ============================================================================
// Tests
// ============================================================================
