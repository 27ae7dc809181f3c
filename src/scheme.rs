//! The decomposition engine: a scheme's terms plus the per-axis candidate move index.
//!
//! Representation:
//! - `terms[r]` is the `r`-th rank-1 term `(a, b, c)`.
//! - `index[k]` holds every unordered pair of rows whose factors agree on axis `k`. Such a
//!   pair admits a flip on axis `k`; a pair that agrees on two axes can be merged away.
//!
//! Every mutating operation keeps the scheme correct (the terms still sum to the
//! multiplication tensor) and keeps the index exact. Correctness is only verified on load;
//! the moves preserve it algebraically.
//!
//! Row removal swaps the last term into the vacated slot and then rebuilds the whole index
//! in `O(rank^2)`: the swap renames a row, which may appear in arbitrarily many pairs.

use crate::bits::{BitVector, cells};
use crate::error::SchemeError;
use crate::pairs::PairSet;
use crate::tensor::{Axis, Dims, Term, first_defect, verify};

// ============================================================================
// Decomposition
// ============================================================================

/// A bilinear scheme for one `(n, m, l)` instance together with its flip index.
#[derive(Clone, Debug)]
pub struct Decomposition<B: BitVector> {
    dims: Dims,
    terms: Vec<Term<B>>,
    index: [PairSet; 3],
}

impl<B: BitVector> Decomposition<B> {
    /// Wraps `terms` and builds the candidate index.
    ///
    /// The terms are not verified; call [`Decomposition::is_correct`] for that.
    ///
    /// # Errors
    /// Returns an error if the instance's factors do not fit in `B`.
    pub fn from_terms(dims: Dims, terms: Vec<Term<B>>) -> Result<Self, SchemeError> {
        if !dims.fits::<B>() {
            return Err(SchemeError::WidthMismatch {
                needed: dims.max_product(),
                available: B::BITS,
            });
        }
        let mut terms = terms;
        terms.reserve(dims.max_rank().saturating_sub(terms.len()));
        let mut scheme = Self {
            dims,
            terms,
            index: [PairSet::new(), PairSet::new(), PairSet::new()],
        };
        scheme.rebuild_index();
        Ok(scheme)
    }

    /// The schoolbook scheme `sum a_ij * b_jk * c_ki` of rank `n*m*l`.
    ///
    /// # Errors
    /// Returns an error if the instance's factors do not fit in `B`.
    pub fn standard(dims: Dims) -> Result<Self, SchemeError> {
        Self::from_terms(dims, standard_terms(dims, |_, _, _| true))
    }

    /// Re-embeds this scheme into the larger instance `target` and completes it with the
    /// schoolbook terms for every product `a_ij * b_jk` outside the current instance.
    ///
    /// The result is correct for `target` whenever `self` is correct for its own instance, and
    /// has rank `rank + target.max_rank() - dims.max_rank()`.
    ///
    /// # Errors
    /// Returns an error if `target` is smaller than the current instance in some dimension,
    /// or if its factors do not fit in `W`.
    pub fn expand<W: BitVector>(&self, target: Dims) -> Result<Decomposition<W>, SchemeError> {
        let from = self.dims;
        if !target.contains(&from) {
            return Err(SchemeError::Shrink {
                from_n: from.n,
                from_m: from.m,
                from_l: from.l,
                n: target.n,
                m: target.m,
                l: target.l,
            });
        }

        let mut terms: Vec<Term<W>> = Vec::with_capacity(target.max_rank());
        for term in &self.terms {
            let mut out = [W::ZERO; 3];
            for axis in Axis::ALL {
                let (rows, cols) = from.shape(axis);
                let (_, new_cols) = target.shape(axis);
                for (i, j) in cells(term[axis.index()], rows, cols) {
                    out[axis.index()].set_cell(new_cols, i, j);
                }
            }
            terms.push(out);
        }
        terms.extend(standard_terms::<W>(target, |i, j, k| {
            i > from.n || j > from.m || k > from.l
        }));

        Decomposition::from_terms(target, terms)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The instance this scheme multiplies.
    #[inline(always)]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Number of terms.
    #[inline(always)]
    pub fn rank(&self) -> usize {
        self.terms.len()
    }

    /// Capacity available to [`Decomposition::split`]: the schoolbook rank `n*m*l`.
    #[inline(always)]
    pub fn max_rank(&self) -> usize {
        self.dims.max_rank()
    }

    /// All terms in row order.
    #[inline(always)]
    pub fn terms(&self) -> &[Term<B>] {
        &self.terms
    }

    /// Factor of `row` on `axis`.
    #[inline(always)]
    pub fn get(&self, row: usize, axis: Axis) -> B {
        self.terms[row][axis.index()]
    }

    /// Mutable factor of `row` on `axis`.
    ///
    /// This bypasses the candidate index and the correctness guarantees; callers must restore
    /// both (e.g. through [`Decomposition::rebuild_index`]).
    #[inline(always)]
    pub fn get_mut(&mut self, row: usize, axis: Axis) -> &mut B {
        &mut self.terms[row][axis.index()]
    }

    /// The candidate pairs for `axis`.
    #[inline(always)]
    pub fn index(&self, axis: Axis) -> &PairSet {
        &self.index[axis.index()]
    }

    /// Total number of candidate flips over all three axes.
    #[inline]
    pub fn candidate_count(&self) -> usize {
        self.index.iter().map(PairSet::len).sum()
    }

    /// The `r`-th candidate when the three axis indices are concatenated in order `a, b, c`.
    ///
    /// # Panics
    /// Panics if `r >= self.candidate_count()`.
    pub fn candidate(&self, r: usize) -> (Axis, usize, usize) {
        let mut r = r;
        for axis in Axis::ALL {
            let set = &self.index[axis.index()];
            if r < set.len() {
                let (r1, r2) = set.get(r);
                return (axis, r1, r2);
            }
            r -= set.len();
        }
        panic!("candidate index out of range");
    }

    /// Full verification against the multiplication tensor.
    pub fn is_correct(&self) -> bool {
        verify(self.dims, &self.terms)
    }

    /// Like [`Decomposition::is_correct`], but explains the first failing tensor cell.
    ///
    /// # Errors
    /// Returns [`SchemeError::Incorrect`] if the scheme does not sum to the tensor.
    pub fn check(&self) -> Result<(), SchemeError> {
        match first_defect(self.dims, &self.terms) {
            None => Ok(()),
            Some((p, q)) => Err(SchemeError::Incorrect(format!(
                "rank-{} scheme for ({}) disagrees with the tensor at cell ({p}, {q})",
                self.rank(),
                self.dims
            ))),
        }
    }

    // ------------------------------------------------------------------------
    // Index maintenance
    // ------------------------------------------------------------------------

    /// Recomputes all three candidate indices from scratch in `O(rank^2)`.
    pub fn rebuild_index(&mut self) {
        for axis in Axis::ALL {
            let k = axis.index();
            let set = &mut self.index[k];
            set.clear();
            for i in 0..self.terms.len() {
                for j in (i + 1)..self.terms.len() {
                    if self.terms[i][k] == self.terms[j][k] {
                        set.insert(i, j);
                    }
                }
            }
        }
    }

    /// Removes `row` by moving the last term into its slot, then rebuilds the index.
    ///
    /// This costs `O(rank^2)` on every call.
    pub fn remove_row(&mut self, row: usize) {
        debug_assert!(row < self.terms.len());
        self.terms.swap_remove(row);
        self.rebuild_index();
    }

    // ------------------------------------------------------------------------
    // Moves
    // ------------------------------------------------------------------------

    /// Flips rows `r1` and `r2`, which must agree on `axis`.
    ///
    /// With `next = axis.next()` and `prev = axis.prev()`, sets `r1.prev ^= r2.prev` and
    /// `r2.next ^= r1.next`. Both terms share their `axis` factor `x`, so
    /// `x*y1*z1 + x*y2*z2 = x*y1*(z1+z2) + x*(y1+y2)*z2` over GF(2) and the scheme stays
    /// correct. Only the two changed factors are rescanned, in `O(rank)`.
    ///
    /// If `do_reduce` is set and the flip makes some pair agree on two axes, one merge is
    /// performed through [`Decomposition::reduce`] and `true` is returned. Further mergeable
    /// pairs, if any, are left for later flips or an explicit [`Decomposition::reduce_all`].
    pub fn flip(&mut self, axis: Axis, r1: usize, r2: usize, do_reduce: bool) -> bool {
        debug_assert_ne!(r1, r2);
        debug_assert_eq!(self.get(r1, axis), self.get(r2, axis), "flip rows must share axis");

        let a = axis.index();
        let next = axis.next().index();
        let prev = axis.prev().index();

        let v = self.terms[r2][prev];
        self.terms[r1][prev] ^= v;
        let v = self.terms[r1][next];
        self.terms[r2][next] ^= v;

        self.index[prev].remove_all(r1);
        self.index[next].remove_all(r2);

        let t1 = self.terms[r1];
        let t2 = self.terms[r2];
        let mut reducible = false;
        for (i, t) in self.terms.iter().enumerate() {
            if i != r1 && t[prev] == t1[prev] {
                self.index[prev].insert(r1, i);
                reducible |= t[a] == t1[a] || t[next] == t1[next];
            }
            if i != r2 && t[next] == t2[next] {
                self.index[next].insert(r2, i);
                reducible |= t[a] == t2[a] || t[prev] == t2[prev];
            }
        }

        if do_reduce && reducible {
            self.reduce();
            return true;
        }
        false
    }

    /// Splits `row1` against `row2` on `axis`, increasing the rank by one.
    ///
    /// Appends the term `(row1.axis + row2.axis, row1.others)` and sets `row1.axis` to
    /// `row2.axis`; the two resulting terms sum to the old `row1`. The index is patched in
    /// `O(rank)`.
    ///
    /// Returns `false` and leaves the scheme untouched if it is already at
    /// [`Decomposition::max_rank`].
    #[must_use]
    pub fn split(&mut self, axis: Axis, row1: usize, row2: usize) -> bool {
        if self.terms.len() >= self.max_rank() {
            return false;
        }
        let k = axis.index();

        let mut fresh = self.terms[row1];
        fresh[k] = self.terms[row1][k] ^ self.terms[row2][k];
        self.terms[row1][k] = self.terms[row2][k];
        self.terms.push(fresh);
        let new_row = self.terms.len() - 1;

        self.index[k].remove_all(row1);
        let t1 = self.terms[row1];
        for i in 0..new_row {
            let t = self.terms[i];
            if i != row1 && t[k] == t1[k] {
                self.index[k].insert(i, row1);
            }
            for (set, (&x, &y)) in self.index.iter_mut().zip(t.iter().zip(fresh.iter())) {
                if x == y {
                    set.insert(i, new_row);
                }
            }
        }
        true
    }

    /// Merges the first pair of rows found that agree on two axes.
    ///
    /// The partner's factor on the third axis is added into the kept row and the partner is
    /// removed (an `O(rank^2)` index rebuild). Returns whether a merge happened; callers loop
    /// to reach a fixpoint.
    pub fn reduce(&mut self) -> bool {
        match self.find_mergeable() {
            Some((keep, drop, third)) => {
                let v = self.terms[drop][third.index()];
                self.terms[keep][third.index()] ^= v;
                self.remove_row(drop);
                true
            }
            None => false,
        }
    }

    /// Reduces until no pair agrees on two axes; returns the number of merges.
    pub fn reduce_all(&mut self) -> usize {
        let mut merges = 0;
        while self.reduce() {
            merges += 1;
        }
        merges
    }

    /// Removes every term with a zero factor (such a term contributes nothing).
    pub fn remove_zero_rows(&mut self) {
        let mut i = 0;
        while i < self.terms.len() {
            if self.terms[i].iter().any(|v| v.is_zero()) {
                self.remove_row(i);
            } else {
                i += 1;
            }
        }
    }

    /// Scans the `a` pairs for agreement on `b` then `c`, then the `b` pairs for `c`.
    fn find_mergeable(&self) -> Option<(usize, usize, Axis)> {
        for axis in [Axis::A, Axis::B] {
            let set = &self.index[axis.index()];
            for (r1, r2) in set.iter() {
                for other in &Axis::ALL[axis.index() + 1..] {
                    if self.terms[r1][other.index()] == self.terms[r2][other.index()] {
                        let third = Axis::from_index(3 - axis.index() - other.index());
                        return Some((r1, r2, third));
                    }
                }
            }
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn index_is_exact(&self) -> bool {
        for axis in Axis::ALL {
            let k = axis.index();
            let set = &self.index[k];
            let mut equal_pairs = 0;
            for i in 0..self.terms.len() {
                for j in (i + 1)..self.terms.len() {
                    let equal = self.terms[i][k] == self.terms[j][k];
                    if equal != set.contains(i, j) {
                        return false;
                    }
                    equal_pairs += usize::from(equal);
                }
            }
            if set.len() != equal_pairs || set.iter().any(|(u, v)| u == v) {
                return false;
            }
        }
        true
    }
}

/// Schoolbook terms `a_ij * b_jk * c_ki` for the `(i, j, k)` accepted by `keep`.
fn standard_terms<B: BitVector>(
    dims: Dims,
    keep: impl Fn(usize, usize, usize) -> bool,
) -> Vec<Term<B>> {
    let Dims { n, m, l } = dims;
    let mut terms = Vec::with_capacity(dims.max_rank());
    for i in 1..=n {
        for j in 1..=m {
            for k in 1..=l {
                if !keep(i, j, k) {
                    continue;
                }
                let mut term = [B::ZERO; 3];
                term[Axis::A.index()].set_cell(m, i, j);
                term[Axis::B.index()].set_cell(l, j, k);
                term[Axis::C.index()].set_cell(n, k, i);
                terms.push(term);
            }
        }
    }
    terms
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse_scheme;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    const STRASSEN: &str = include_str!("../schemes/strassen_2x2x2.exp");

    fn standard(n: usize, m: usize, l: usize) -> Decomposition<u64> {
        Decomposition::standard(Dims::new(n, m, l).unwrap()).unwrap()
    }

    fn strassen() -> Decomposition<u64> {
        let dims = Dims::new(2, 2, 2).unwrap();
        let terms = parse_scheme(STRASSEN, dims, false).unwrap();
        Decomposition::from_terms(dims, terms).unwrap()
    }

    /// Sum of all term contributions as a flat grid; equal grids mean equal tensors.
    fn contribution(s: &Decomposition<u64>) -> Vec<u64> {
        let d = s.dims();
        let (rows, cols) = (d.n * d.m, d.m * d.l);
        let mut grid = vec![0u64; rows * cols];
        for t in s.terms() {
            for p in 0..rows {
                for q in 0..cols {
                    if t[0].test(p) && t[1].test(q) {
                        grid[p * cols + q] ^= t[2];
                    }
                }
            }
        }
        grid
    }

    fn random_flip<R: Rng>(s: &mut Decomposition<u64>, rng: &mut R, do_reduce: bool) -> bool {
        let total = s.candidate_count();
        if total == 0 {
            return false;
        }
        let (axis, r1, r2) = s.candidate(rng.random_range(0..total));
        if rng.random_bool(0.5) {
            s.flip(axis, r1, r2, do_reduce)
        } else {
            s.flip(axis, r2, r1, do_reduce)
        }
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    #[test]
    fn strassen_is_correct_with_exact_index() {
        let s = strassen();
        assert_eq!(s.rank(), 7);
        assert_eq!(s.max_rank(), 8);
        assert!(s.is_correct());
        assert!(s.check().is_ok());
        assert!(s.index_is_exact());
    }

    #[test]
    fn standard_scheme_is_correct() {
        for (n, m, l) in [(1, 1, 1), (2, 2, 2), (3, 2, 4), (3, 3, 3)] {
            let s = Decomposition::<u64>::standard(Dims::new(n, m, l).unwrap()).unwrap();
            assert_eq!(s.rank(), n * m * l);
            assert!(s.is_correct());
            assert!(s.index_is_exact());
        }
    }

    #[test]
    fn from_terms_rejects_narrow_storage() {
        let dims = Dims::new(9, 9, 1).unwrap();
        assert!(matches!(
            Decomposition::<u64>::standard(dims),
            Err(SchemeError::WidthMismatch { needed: 81, available: 64 })
        ));
        assert!(Decomposition::<u128>::standard(dims).is_ok());
    }

    #[test]
    fn check_reports_corruption() {
        let mut s = strassen();
        *s.get_mut(0, Axis::C) ^= 1;
        assert!(!s.is_correct());
        assert!(matches!(s.check(), Err(SchemeError::Incorrect(_))));
    }

    // -------------------------------------------------------------------------
    // Flip
    // -------------------------------------------------------------------------

    #[test]
    fn strassen_is_a_dead_end() {
        // No two Strassen terms share a factor, so no flip applies.
        let s = strassen();
        assert_eq!(s.candidate_count(), 0);
    }

    #[test]
    fn flip_changes_only_next_and_prev_factors() {
        let mut s = standard(2, 2, 2);
        let mut rng = XorShiftRng::seed_from_u64(0xF11B);
        for _ in 0..200 {
            let total = s.candidate_count();
            let (axis, r1, r2) = s.candidate(rng.random_range(0..total));
            let before = s.clone();
            let before_sum = contribution(&s);

            assert!(!s.flip(axis, r1, r2, false));

            let next = axis.next();
            let prev = axis.prev();
            assert_eq!(s.get(r1, prev), before.get(r1, prev) ^ before.get(r2, prev));
            assert_eq!(s.get(r2, next), before.get(r2, next) ^ before.get(r1, next));
            assert_eq!(s.get(r1, axis), before.get(r1, axis));
            assert_eq!(s.get(r2, axis), before.get(r2, axis));
            assert_eq!(s.get(r1, next), before.get(r1, next));
            assert_eq!(s.get(r2, prev), before.get(r2, prev));
            for row in (0..s.rank()).filter(|&r| r != r1 && r != r2) {
                assert_eq!(s.terms()[row], before.terms()[row]);
            }
            assert_eq!(contribution(&s), before_sum, "flip changed the tensor");
            assert!(s.index_is_exact());
        }
    }

    #[test]
    fn flip_twice_on_same_orientation_restores_terms() {
        // r1.prev ^= r2.prev then r2.next ^= r1.next only touch factors the other flip reads
        // unchanged, so repeating the same flip undoes it.
        let mut s = standard(2, 3, 2);
        let total = s.candidate_count();
        assert!(total > 0);
        let (axis, r1, r2) = s.candidate(0);
        let before = s.terms().to_vec();
        s.flip(axis, r1, r2, false);
        s.flip(axis, r1, r2, false);
        assert_eq!(s.terms(), &before[..]);
        assert!(s.index_is_exact());
    }

    #[test]
    fn flip_with_reduce_reports_and_lowers_rank() {
        let mut rng = XorShiftRng::seed_from_u64(0x5EED);
        let mut s = standard(2, 2, 2);
        let mut reduced = false;
        for _ in 0..10_000 {
            let rank = s.rank();
            if random_flip(&mut s, &mut rng, true) {
                assert!(s.rank() < rank);
                reduced = true;
                break;
            }
            assert_eq!(s.rank(), rank);
        }
        assert!(reduced, "no reduction found from the standard 2x2x2 scheme");
        assert!(s.is_correct());
        assert!(s.index_is_exact());
    }

    #[test]
    fn reducing_flip_merges_exactly_once() {
        for seed in 0..4u64 {
            let mut rng = XorShiftRng::seed_from_u64(seed);
            let mut s = standard(3, 3, 3);
            let mut merges = 0;
            for _ in 0..20_000 {
                if s.rank() >= 2 && s.rank() < s.max_rank() && rng.random_range(0..50) == 0 {
                    let r1 = rng.random_range(0..s.rank());
                    let mut r2 = rng.random_range(0..s.rank());
                    while r2 == r1 {
                        r2 = rng.random_range(0..s.rank());
                    }
                    let axis = Axis::from_index(rng.random_range(0..3));
                    if s.split(axis, r1, r2) {
                        s.flip(axis, r1, r2, false);
                    }
                }
                let before = s.rank();
                if random_flip(&mut s, &mut rng, true) {
                    assert_eq!(s.rank(), before - 1, "seed {seed}: one flip merged more than once");
                    merges += 1;
                } else {
                    assert_eq!(s.rank(), before);
                }
            }
            assert!(merges > 0, "seed {seed}: walk never reduced");
            assert!(s.is_correct());
            assert!(s.index_is_exact());
        }
    }

    // -------------------------------------------------------------------------
    // Split
    // -------------------------------------------------------------------------

    #[test]
    fn split_adds_one_term_and_keeps_tensor() {
        let mut s = strassen();
        let before_sum = contribution(&s);
        let before_row1 = s.terms()[2];
        let row2_a = s.get(5, Axis::A);

        assert!(s.split(Axis::A, 2, 5));

        assert_eq!(s.rank(), 8);
        assert_eq!(s.get(2, Axis::A), row2_a);
        assert_eq!(s.get(7, Axis::A), before_row1[0] ^ row2_a);
        assert_eq!(s.get(7, Axis::B), before_row1[1]);
        assert_eq!(s.get(7, Axis::C), before_row1[2]);
        assert_eq!(contribution(&s), before_sum);
        assert!(s.is_correct());
        assert!(s.index_is_exact());
    }

    #[test]
    fn split_at_capacity_is_refused() {
        let mut s = standard(2, 2, 2);
        let before = s.terms().to_vec();
        assert!(!s.split(Axis::B, 0, 1));
        assert_eq!(s.terms(), &before[..]);
    }

    // -------------------------------------------------------------------------
    // Reduce and cleanup
    // -------------------------------------------------------------------------

    #[test]
    fn reduce_merges_pair_equal_on_two_axes() {
        let dims = Dims::new(2, 2, 2).unwrap();
        let mut terms = strassen().terms().to_vec();
        // Split term 0 into two terms that agree on b and c.
        let [a, b, c] = terms[0];
        terms[0] = [a ^ 0b0001, b, c];
        terms.push([0b0001, b, c]);
        let mut s = Decomposition::from_terms(dims, terms).unwrap();
        assert!(s.is_correct());

        assert!(s.reduce());
        assert_eq!(s.rank(), 7);
        assert!(s.is_correct());
        assert!(s.index_is_exact());
        assert!(!s.reduce(), "Strassen has no mergeable pair");
        assert_eq!(s.rank(), 7);
    }

    #[test]
    fn reduce_on_standard_scheme_never_grows() {
        // The 2x2x2 schoolbook scheme has no pair agreeing on two axes.
        let mut s = standard(2, 2, 2);
        assert!(!s.reduce());
        assert_eq!(s.rank(), 8);
    }

    #[test]
    fn duplicate_terms_merge_into_zero_row_then_vanish() {
        let dims = Dims::new(2, 2, 2).unwrap();
        let mut terms = strassen().terms().to_vec();
        let dup = terms[4];
        terms.push(dup);
        terms.push(dup);
        let mut s = Decomposition::from_terms(dims, terms).unwrap();
        assert!(s.is_correct());

        s.reduce_all();
        s.remove_zero_rows();
        assert_eq!(s.rank(), 7);
        assert!(s.is_correct());
        assert!(s.index_is_exact());
    }

    #[test]
    fn remove_zero_rows_is_idempotent() {
        let dims = Dims::new(2, 2, 2).unwrap();
        let mut terms = strassen().terms().to_vec();
        terms.insert(1, [0, 0b1, 0b10]);
        terms.push([0b11, 0, 0b1]);
        terms.push([0b11, 0b1, 0]);
        let mut s = Decomposition::from_terms(dims, terms).unwrap();

        s.remove_zero_rows();
        assert_eq!(s.rank(), 7);
        assert!(s.is_correct());
        let once = s.terms().to_vec();
        s.remove_zero_rows();
        assert_eq!(s.terms(), &once[..]);
        assert!(s.index_is_exact());
    }

    #[test]
    fn remove_row_swaps_last_into_slot() {
        let mut s = strassen();
        let last = *s.terms().last().unwrap();
        s.remove_row(1);
        assert_eq!(s.rank(), 6);
        assert_eq!(s.terms()[1], last);
        assert!(s.index_is_exact());
    }

    // -------------------------------------------------------------------------
    // Expansion
    // -------------------------------------------------------------------------

    #[test]
    fn expand_strassen_to_larger_instances() {
        let s = strassen();
        let target = Dims::new(3, 2, 3).unwrap();
        let big = s.expand::<u64>(target).unwrap();
        assert_eq!(big.rank(), 7 + 18 - 8);
        assert!(big.is_correct());
        assert!(big.index_is_exact());

        let wide = Dims::new(9, 2, 9).unwrap();
        let big = s.expand::<u128>(wide).unwrap();
        assert_eq!(big.rank(), 7 + 162 - 8);
        assert!(big.is_correct());
    }

    #[test]
    fn expand_rejects_smaller_target() {
        let s = strassen();
        assert!(matches!(
            s.expand::<u64>(Dims::new(1, 2, 2).unwrap()),
            Err(SchemeError::Shrink { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Random operation sequences
    // -------------------------------------------------------------------------

    #[test]
    fn random_moves_preserve_correctness_and_index() {
        let mut rng = XorShiftRng::seed_from_u64(0xC0FFEE);
        let mut s = standard(2, 2, 3);

        for step in 0..3_000 {
            match rng.random_range(0..10) {
                0 if s.rank() >= 2 => {
                    let r1 = rng.random_range(0..s.rank());
                    let mut r2 = rng.random_range(0..s.rank());
                    while r2 == r1 {
                        r2 = rng.random_range(0..s.rank());
                    }
                    let axis = Axis::from_index(rng.random_range(0..3));
                    let _ = s.split(axis, r1, r2);
                }
                1 => {
                    let rank = s.rank();
                    if s.reduce() {
                        assert_eq!(s.rank(), rank - 1);
                    } else {
                        assert_eq!(s.rank(), rank);
                    }
                }
                2 => s.remove_zero_rows(),
                _ => {
                    let do_reduce = rng.random_bool(0.5);
                    random_flip(&mut s, &mut rng, do_reduce);
                }
            }
            assert!(s.rank() <= 20);
            assert!(s.is_correct(), "scheme broken at step {step}");
            assert!(s.index_is_exact(), "index stale at step {step}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn flip_sequences_keep_invariants(seed in any::<u64>(), moves in 1usize..200) {
            let mut rng = XorShiftRng::seed_from_u64(seed);
            let mut s = standard(2, 2, 2);
            for _ in 0..moves {
                let rank = s.rank();
                let reduced = random_flip(&mut s, &mut rng, true);
                prop_assert!(s.rank() <= rank);
                prop_assert_eq!(reduced, s.rank() < rank);
            }
            prop_assert!(s.is_correct());
            prop_assert!(s.index_is_exact());
        }
    }
}
