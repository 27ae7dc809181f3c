//! Fixed-width GF(2) bit vectors addressing the cells of a small matrix.
//!
//! A matrix factor of a scheme is stored as a single unsigned integer: cell `(i, j)` of a
//! matrix with `cols` columns (1-indexed, as in the scheme files) lives at bit
//! `cols * (i - 1) + (j - 1)`. Addition over GF(2) is XOR.
//!
//! The engine is generic over [`BitVector`], implemented for `u64` and `u128`; the width is
//! picked per instance by [`crate::tensor::Dims::width`].

use std::fmt::Debug;
use std::ops::{BitAnd, BitOr, BitXor, BitXorAssign};

// ============================================================================
// BitVector
// ============================================================================

/// A fixed-width bit set over GF(2).
///
/// Implementors are plain unsigned integers, so equality, XOR and zero tests are single
/// instructions in the hot loop.
pub trait BitVector:
    Copy
    + Eq
    + Debug
    + Default
    + BitXor<Output = Self>
    + BitXorAssign
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + 'static
{
    /// Number of addressable bits.
    const BITS: usize;

    /// The all-zero vector.
    const ZERO: Self;

    /// Returns a vector with only bit `idx` set.
    fn bit(idx: usize) -> Self;

    /// Returns whether bit `idx` is set.
    fn test(self, idx: usize) -> bool;

    /// Returns whether no bit is set.
    #[inline(always)]
    fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Wrapping integer addition (used only for filename hashing).
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Shift left by one, dropping the top bit.
    fn shl1(self) -> Self;

    /// Integer remainder by a 64-bit modulus.
    fn rem_u64(self, modulus: u64) -> u64;

    /// Zero-extends a `u64`.
    fn from_u64(v: u64) -> Self;

    /// Sets cell `(row, col)` (1-indexed) of a matrix with `cols` columns.
    #[inline(always)]
    fn set_cell(&mut self, cols: usize, row: usize, col: usize) {
        *self = *self | Self::bit(cell_index(cols, row, col));
    }

    /// Clears cell `(row, col)` (1-indexed) of a matrix with `cols` columns.
    #[inline(always)]
    fn clear_cell(&mut self, cols: usize, row: usize, col: usize) {
        if self.cell(cols, row, col) {
            *self ^= Self::bit(cell_index(cols, row, col));
        }
    }

    /// Returns whether cell `(row, col)` (1-indexed) of a matrix with `cols` columns is set.
    #[inline(always)]
    fn cell(self, cols: usize, row: usize, col: usize) -> bool {
        self.test(cell_index(cols, row, col))
    }
}

macro_rules! impl_bit_vector {
    ($ty:ty) => {
        impl BitVector for $ty {
            const BITS: usize = <$ty>::BITS as usize;
            const ZERO: Self = 0;

            #[inline(always)]
            fn bit(idx: usize) -> Self {
                debug_assert!(idx < <Self as BitVector>::BITS, "bit {idx} out of range");
                (1 as $ty) << idx
            }

            #[inline(always)]
            fn test(self, idx: usize) -> bool {
                debug_assert!(idx < <Self as BitVector>::BITS, "bit {idx} out of range");
                (self >> idx) & 1 != 0
            }

            #[inline(always)]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$ty>::wrapping_add(self, rhs)
            }

            #[inline(always)]
            fn shl1(self) -> Self {
                self << 1
            }

            #[inline(always)]
            fn rem_u64(self, modulus: u64) -> u64 {
                (self % (modulus as $ty)) as u64
            }

            #[inline(always)]
            fn from_u64(v: u64) -> Self {
                v as $ty
            }
        }
    };
}

impl_bit_vector!(u64);
impl_bit_vector!(u128);

/// Bit position of the 1-indexed cell `(row, col)` in a matrix with `cols` columns.
#[inline(always)]
pub const fn cell_index(cols: usize, row: usize, col: usize) -> usize {
    debug_assert!(row >= 1 && col >= 1);
    cols * (row - 1) + (col - 1)
}

/// Iterates the 1-indexed cells set in `v`, interpreted as a `rows x cols` matrix, in
/// row-major order.
pub fn cells<B: BitVector>(
    v: B,
    rows: usize,
    cols: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (1..=rows)
        .flat_map(move |i| (1..=cols).map(move |j| (i, j)))
        .filter(move |&(i, j)| v.cell(cols, i, j))
}

// ============================================================================
// Tests
// ============================================================================
