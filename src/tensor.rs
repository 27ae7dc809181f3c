//! Matrix multiplication instances, the reference tensor, and full scheme verification.
//!
//! An instance `(n, m, l)` multiplies an `n x m` matrix `A` by an `m x l` matrix `B`.
//! A scheme term is a triple `(a, b, c)` of factors over the three axes:
//!
//! | axis | matrix | shape   | bit of cell `(i, j)` |
//! |------|--------|---------|----------------------|
//! | `a`  | `A`    | `n x m` | `m (i-1) + (j-1)`    |
//! | `b`  | `B`    | `m x l` | `l (i-1) + (j-1)`    |
//! | `c`  | `C^T`  | `l x n` | `n (i-1) + (j-1)`    |
//!
//! The schoolbook term for the product entry `a_ij b_jk` is `a_ij * b_jk * c_ki`.

use crate::bits::BitVector;
use crate::error::SchemeError;
use std::fmt;

/// One rank-1 term: factors on axes `a`, `b`, `c` in that order.
pub type Term<B> = [B; 3];

// ============================================================================
// Axis
// ============================================================================

/// One of the three tensor axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Left factor, `n x m`.
    A,
    /// Right factor, `m x l`.
    B,
    /// Result factor, `l x n`.
    C,
}

impl Axis {
    /// All axes in cyclic order.
    pub const ALL: [Axis; 3] = [Axis::A, Axis::B, Axis::C];

    /// Position of this axis inside a [`Term`].
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The axis for a term position `0..3`.
    ///
    /// # Panics
    /// Panics if `idx >= 3`.
    #[inline(always)]
    pub const fn from_index(idx: usize) -> Axis {
        match idx {
            0 => Axis::A,
            1 => Axis::B,
            2 => Axis::C,
            _ => panic!("axis index out of range"),
        }
    }

    /// Next axis in the cycle `a -> b -> c -> a`.
    #[inline(always)]
    pub const fn next(self) -> Axis {
        match self {
            Axis::A => Axis::B,
            Axis::B => Axis::C,
            Axis::C => Axis::A,
        }
    }

    /// Previous axis in the cycle (the one after [`Axis::next`]).
    #[inline(always)]
    pub const fn prev(self) -> Axis {
        match self {
            Axis::A => Axis::C,
            Axis::B => Axis::A,
            Axis::C => Axis::B,
        }
    }

    /// The monomial letter used for this axis in scheme files.
    pub const fn letter(self) -> char {
        match self {
            Axis::A => 'a',
            Axis::B => 'b',
            Axis::C => 'c',
        }
    }
}

// ============================================================================
// Dims
// ============================================================================

/// Storage width needed for an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    /// Every factor fits in a `u64`.
    W64,
    /// Every factor fits in a `u128`.
    W128,
}

impl Width {
    /// Number of bits per factor.
    pub const fn bits(self) -> usize {
        match self {
            Width::W64 => 64,
            Width::W128 => 128,
        }
    }
}

/// Largest dimension product any supported width can hold.
pub const MAX_PRODUCT: usize = 128;

/// The shape `(n, m, l)` of a matrix multiplication instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dims {
    /// Rows of the left matrix.
    pub n: usize,
    /// Columns of the left / rows of the right matrix.
    pub m: usize,
    /// Columns of the right matrix.
    pub l: usize,
}

impl Dims {
    /// Validates and builds an instance.
    ///
    /// # Errors
    /// Returns an error if a dimension is zero or a pairwise product exceeds [`MAX_PRODUCT`].
    pub fn new(n: usize, m: usize, l: usize) -> Result<Self, SchemeError> {
        if n == 0 || m == 0 || l == 0 {
            return Err(SchemeError::ZeroDimension { n, m, l });
        }
        let dims = Self { n, m, l };
        if dims.max_product() > MAX_PRODUCT {
            return Err(SchemeError::TooBig {
                n,
                m,
                l,
                max: MAX_PRODUCT,
            });
        }
        Ok(dims)
    }

    /// Largest of `n*m`, `m*l` and `l*n`, i.e. the number of bits a factor needs.
    #[inline]
    pub fn max_product(&self) -> usize {
        (self.n * self.m).max(self.m * self.l).max(self.l * self.n)
    }

    /// The narrowest storage width that holds every factor of this instance.
    pub fn width(&self) -> Width {
        if self.max_product() <= Width::W64.bits() {
            Width::W64
        } else {
            Width::W128
        }
    }

    /// Returns whether factors of this instance fit in `B`.
    #[inline]
    pub fn fits<B: BitVector>(&self) -> bool {
        self.max_product() <= B::BITS
    }

    /// Rank of the schoolbook scheme, which is also the capacity of a decomposition.
    #[inline]
    pub fn max_rank(&self) -> usize {
        self.n * self.m * self.l
    }

    /// Whether scheme files for this instance need two-digit coordinates.
    #[inline]
    pub fn is_large_format(&self) -> bool {
        self.n > 9 || self.m > 9 || self.l > 9
    }

    /// `(rows, cols)` of the matrix addressed by `axis`.
    #[inline]
    pub fn shape(&self, axis: Axis) -> (usize, usize) {
        match axis {
            Axis::A => (self.n, self.m),
            Axis::B => (self.m, self.l),
            Axis::C => (self.l, self.n),
        }
    }

    /// Whether `other` fits inside this instance in every dimension.
    pub fn contains(&self, other: &Dims) -> bool {
        other.n <= self.n && other.m <= self.m && other.l <= self.l
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.n, self.m, self.l)
    }
}

// ============================================================================
// Reference tensor and verification
// ============================================================================

/// Builds the matrix multiplication tensor as an `n*m x m*l` grid (row-major) of
/// `c`-factors.
///
/// Cell `(m*i + j, l*j + k)` holds bit `n*k + i` for every `i < n`, `j < m`, `k < l`; every
/// other cell is zero.
pub fn reference_tensor<B: BitVector>(dims: Dims) -> Vec<B> {
    debug_assert!(dims.fits::<B>());
    let Dims { n, m, l } = dims;
    let cols = m * l;
    let mut grid = vec![B::ZERO; n * m * cols];
    for i in 0..n {
        for j in 0..m {
            for k in 0..l {
                grid[(m * i + j) * cols + (l * j + k)] = B::bit(n * k + i);
            }
        }
    }
    grid
}

/// Returns the first grid cell `(p, q)` where the scheme disagrees with the reference tensor,
/// or `None` if the scheme is a correct multiplication scheme.
///
/// Costs `O(rank * n*m * m*l)`.
pub fn first_defect<B: BitVector>(dims: Dims, terms: &[Term<B>]) -> Option<(usize, usize)> {
    let rows = dims.n * dims.m;
    let cols = dims.m * dims.l;
    let mut grid = reference_tensor::<B>(dims);

    for term in terms {
        let [a, b, c] = *term;
        for p in 0..rows {
            if !a.test(p) {
                continue;
            }
            let row = &mut grid[p * cols..(p + 1) * cols];
            for (q, cell) in row.iter_mut().enumerate() {
                if b.test(q) {
                    *cell ^= c;
                }
            }
        }
    }

    grid.iter()
        .position(|cell| !cell.is_zero())
        .map(|idx| (idx / cols, idx % cols))
}

/// Checks that `terms` XOR-sum to the matrix multiplication tensor for `dims`.
#[inline]
pub fn verify<B: BitVector>(dims: Dims, terms: &[Term<B>]) -> bool {
    first_defect(dims, terms).is_none()
}

// ============================================================================
// Tests
// ============================================================================
