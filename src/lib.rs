//! # Flip-Graph Search
//!
//! Local search for low-rank bilinear schemes for matrix multiplication over GF(2).
//!
//! A scheme for multiplying an `n x m` matrix by an `m x l` matrix is a list of rank-1 terms
//! `(a, b, c)` whose sum equals the matrix multiplication tensor. Two terms sharing a factor
//! can be **flipped** into a different pair without changing the sum; occasionally a flip makes
//! two terms mergeable, which **reduces** the rank. This crate provides:
//! - A compact bit-vector scheme representation with an incremental candidate-flip index.
//! - The flip / split / reduce moves, all preserving correctness.
//! - A seeded random-walk driver with optional diversification and restarts.
//! - The scheme text format (`.exp` / `.lexp`) and content-derived output names.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flipgraph::search::{run_file, SearchConfig};
//! use flipgraph::tensor::Dims;
//!
//! let cfg = SearchConfig {
//!     steps: 1_000_000,
//!     split: true,
//!     seed: Some(12345),
//!     ..Default::default()
//! };
//! let dims = Dims::new(3, 3, 3).unwrap();
//! let report = run_file("k000000000000000.exp", dims, &cfg).unwrap();
//! println!("{},{}", report.path.display(), report.outcome.final_rank);
//! ```
//!
//! ## Validating Known Schemes
//!
//! ```
//! use flipgraph::validate::validate_known_schemes;
//!
//! validate_known_schemes().expect("all bundled schemes should be valid");
//! ```
//!
//! ## Working with Schemes Directly
//!
//! ```
//! use flipgraph::scheme::Decomposition;
//! use flipgraph::tensor::{Axis, Dims};
//!
//! let dims = Dims::new(2, 2, 2).unwrap();
//! let mut scheme = Decomposition::<u64>::standard(dims).unwrap();
//! assert_eq!(scheme.rank(), 8);
//!
//! // Every candidate flip keeps the scheme correct.
//! let (axis, r1, r2) = scheme.candidate(0);
//! scheme.flip(axis, r1, r2, false);
//! assert!(scheme.is_correct());
//! assert_eq!(Axis::ALL.len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`bits`]: Fixed-width bit vectors (`u64`, `u128`) holding one factor each.
//! - [`tensor`]: Instances, axes, the reference tensor and full verification.
//! - [`pairs`]: Packed unordered-pair sets backing the candidate index.
//! - [`scheme`]: The decomposition engine and its moves.
//! - [`search`]: Random-walk driver and run configuration.
//! - [`format`]: Scheme file parsing, writing and naming.
//! - [`validate`]: Deterministic validation of bundled schemes.
//!
//! ## Performance Notes
//!
//! - Instances whose dimension products are at most 64 use `u64` factors; up to 128 use `u128`.
//! - A flip rescans only the two changed factors in `O(rank)`; removing a row rebuilds the
//!   index in `O(rank^2)`, which is rare compared to flips.
//! - For maximum performance, compile with: `RUSTFLAGS="-C target-cpu=native" cargo build --release`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::inline_always)] // Intentional for hot-path code
#![allow(clippy::many_single_char_names)] // Mathematical variable names
#![allow(clippy::needless_range_loop)] // Often clearer for matrix indexing
#![allow(clippy::doc_markdown)]
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod bits;
pub mod error;
pub mod format;
pub mod pairs;
pub mod scheme;
pub mod search;
pub mod tensor;
pub mod validate;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::bits::BitVector;
    pub use crate::error::SchemeError;
    pub use crate::format::{derive_filename, load, save};
    pub use crate::scheme::Decomposition;
    pub use crate::search::{run_file, run_search, SearchConfig, SearchOutcome, StopReason};
    pub use crate::tensor::{Axis, Dims, Term};
    pub use crate::validate::validate_known_schemes;
}
