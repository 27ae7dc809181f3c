//! Error type shared by the loader, the serializer and instance validation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before or after a search; the search loop itself never fails.
#[derive(Debug, Error)]
pub enum SchemeError {
    /// A dimension is zero.
    #[error("dimensions must be positive, got ({n}, {m}, {l})")]
    ZeroDimension {
        /// Rows of the left matrix.
        n: usize,
        /// Shared inner dimension.
        m: usize,
        /// Columns of the right matrix.
        l: usize,
    },

    /// Some pairwise dimension product does not fit in the widest supported bit vector.
    #[error("instance ({n}, {m}, {l}) too big: all dimension products must be at most {max}")]
    TooBig {
        /// Rows of the left matrix.
        n: usize,
        /// Shared inner dimension.
        m: usize,
        /// Columns of the right matrix.
        l: usize,
        /// Largest supported product.
        max: usize,
    },

    /// A scheme line could not be parsed.
    #[error("line {line}: {reason}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// The scheme does not compute the matrix product.
    #[error("incorrect scheme: {0}")]
    Incorrect(String),

    /// A target instance for expansion is smaller than the source instance.
    #[error("cannot expand ({from_n}, {from_m}, {from_l}) into smaller instance ({n}, {m}, {l})")]
    Shrink {
        /// Source rows.
        from_n: usize,
        /// Source inner dimension.
        from_m: usize,
        /// Source columns.
        from_l: usize,
        /// Target rows.
        n: usize,
        /// Target inner dimension.
        m: usize,
        /// Target columns.
        l: usize,
    },

    /// The requested bit width cannot hold the instance.
    #[error("instance needs {needed} bits per factor, storage holds {available}")]
    WidthMismatch {
        /// Largest dimension product of the instance.
        needed: usize,
        /// Bits in the chosen storage type.
        available: usize,
    },

    /// Reading or writing a scheme file failed.
    #[error("{path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl SchemeError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SchemeError::Io {
            path: path.into(),
            source,
        }
    }
}
