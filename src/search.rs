//! Random-walk driver over the flip graph (diversifying split, flip walk, restarts).
//!
//! A run is single-threaded and fully determined by the seed, the configuration and the input
//! scheme: every random decision is drawn from one [`SmallRng`] in a fixed order.

use crate::bits::BitVector;
use crate::error::SchemeError;
use crate::format;
use crate::scheme::Decomposition;
use crate::tensor::{Axis, Dims, Width};
use rand::prelude::*;
use rand::rngs::SmallRng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Search configuration parameters.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Flip budget of one random-walk attempt.
    pub steps: u64,
    /// Diversify with a split before walking.
    pub split: bool,
    /// Keep walking after a reduction as long as reductions keep coming.
    pub restart: bool,
    /// Uninformed flips applied right after a diversifying split.
    pub split_distance: usize,
    /// Verify the input scheme before searching.
    pub check_correctness: bool,
    /// Optional deterministic seed.
    pub seed: Option<u64>,
    /// Directory the final scheme is written to.
    pub output_dir: PathBuf,
    /// Upper bound on diversification retries. `None` retries until a split survives
    /// reduction, which may not terminate on tiny instances.
    pub split_retry_limit: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            steps: 10_000_000,
            split: false,
            restart: false,
            split_distance: 10,
            check_correctness: true,
            seed: None,
            output_dir: PathBuf::from("."),
            split_retry_limit: None,
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// What a single diversifying split did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitAttempt {
    /// The split survived cleanup; the rank is one higher than before.
    Kept,
    /// Cleanup reduced the scheme again, so the split did not diversify it.
    Undone,
    /// The scheme is at full rank (or has fewer than two rows); nothing was changed.
    AtCapacity,
}

/// How the diversification phase ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diversification {
    /// Splitting was not requested.
    Disabled,
    /// The scheme could not be split.
    Skipped,
    /// A split survived after `tries` attempts.
    Applied {
        /// Attempts including the successful one.
        tries: usize,
    },
    /// The retry limit was reached without a surviving split.
    GaveUp {
        /// Attempts made.
        tries: usize,
    },
}

/// Why the walk stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// No pair of rows shares a factor, so no flip exists.
    DeadEnd,
    /// An attempt used its full flip budget without reducing.
    BudgetExhausted,
    /// The rank dropped below its starting value and restarts are off.
    Reduced,
}

/// Summary of one [`random_path`] run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Rank before diversification.
    pub initial_rank: usize,
    /// Rank at termination.
    pub final_rank: usize,
    /// Result of the diversification phase.
    pub diversification: Diversification,
    /// Random-walk attempts started.
    pub attempts: usize,
    /// Flips performed by the walk (diversification flips excluded).
    pub flips: u64,
    /// Attempts that ended in a reduction.
    pub reductions: usize,
    /// Termination cause.
    pub stop: StopReason,
}

/// A finished run: the outcome plus where the scheme went.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Seed actually used (drawn at random when none was configured).
    pub seed: u64,
    /// Search statistics.
    pub outcome: SearchOutcome,
    /// Path of the written scheme.
    pub path: PathBuf,
}

// ============================================================================
// Public API
// ============================================================================

/// Loads, verifies, searches and saves a scheme file, choosing the storage width from `dims`.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, the scheme is incorrect (when
/// checking is enabled), or the result cannot be written. No search is attempted on an
/// incorrect scheme.
pub fn run_file(
    path: impl AsRef<Path>,
    dims: Dims,
    cfg: &SearchConfig,
) -> Result<RunReport, SchemeError> {
    match dims.width() {
        Width::W64 => run_file_as::<u64>(path.as_ref(), dims, cfg),
        Width::W128 => run_file_as::<u128>(path.as_ref(), dims, cfg),
    }
}

fn run_file_as<B: BitVector>(
    path: &Path,
    dims: Dims,
    cfg: &SearchConfig,
) -> Result<RunReport, SchemeError> {
    let mut scheme = format::load::<B>(path, dims)?;
    if cfg.check_correctness {
        scheme.check()?;
    }
    info!(file = %path.display(), dims = %dims, rank = scheme.rank(), "loaded scheme");
    run_search(&mut scheme, cfg)
}

/// Searches from `scheme` in place and writes the result into `cfg.output_dir`.
///
/// # Errors
/// Returns an error if the resulting scheme cannot be written.
pub fn run_search<B: BitVector>(
    scheme: &mut Decomposition<B>,
    cfg: &SearchConfig,
) -> Result<RunReport, SchemeError> {
    let seed = cfg.seed.unwrap_or_else(random_u64);
    let mut rng = seeded_rng(seed);
    info!(
        seed,
        steps = cfg.steps,
        split = cfg.split,
        restart = cfg.restart,
        split_distance = cfg.split_distance,
        "starting search"
    );

    let outcome = random_path(scheme, &mut rng, cfg);
    let path = persist(scheme, &cfg.output_dir)?;
    info!(
        rank = outcome.final_rank,
        initial_rank = outcome.initial_rank,
        stop = ?outcome.stop,
        attempts = outcome.attempts,
        flips = outcome.flips,
        path = %path.display(),
        "search finished"
    );
    Ok(RunReport {
        seed,
        outcome,
        path,
    })
}

/// Writes `scheme` under its content-derived name inside `dir` and returns the path.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn persist<B: BitVector>(
    scheme: &Decomposition<B>,
    dir: &Path,
) -> Result<PathBuf, SchemeError> {
    let large = scheme.dims().is_large_format();
    let path = dir.join(format::derive_filename(scheme, large));
    format::save(scheme, &path)?;
    Ok(path)
}

/// Runs diversification followed by the flip walk and its restart policy.
///
/// Each attempt walks for up to `cfg.steps` flips and stops at the first reduction. The run
/// ends when an attempt exhausts its budget, when no flip is available, or (with restarts off)
/// once the rank is below the rank recorded before diversification.
pub fn random_path<B: BitVector, R: Rng>(
    scheme: &mut Decomposition<B>,
    rng: &mut R,
    cfg: &SearchConfig,
) -> SearchOutcome {
    let initial_rank = scheme.rank();
    let diversification = if cfg.split {
        diversify(scheme, rng, cfg)
    } else {
        Diversification::Disabled
    };

    let mut attempts = 0;
    let mut flips = 0u64;
    let mut reductions = 0;

    let stop = 'search: loop {
        attempts += 1;
        let mut reduced = false;
        for _ in 0..cfg.steps {
            if scheme.candidate_count() == 0 {
                break 'search StopReason::DeadEnd;
            }
            flips += 1;
            if random_flip(scheme, rng, true) {
                reduced = true;
                break;
            }
        }
        if !reduced {
            break StopReason::BudgetExhausted;
        }

        reductions += 1;
        debug!(rank = scheme.rank(), attempt = attempts, flips, "reduction");
        if !cfg.restart && scheme.rank() < initial_rank {
            break StopReason::Reduced;
        }
    };

    SearchOutcome {
        initial_rank,
        final_rank: scheme.rank(),
        diversification,
        attempts,
        flips,
        reductions,
        stop,
    }
}

/// Splits repeatedly until a split survives cleanup (or the retry limit is hit).
pub fn diversify<B: BitVector, R: Rng>(
    scheme: &mut Decomposition<B>,
    rng: &mut R,
    cfg: &SearchConfig,
) -> Diversification {
    let mut tries = 0;
    loop {
        if cfg.split_retry_limit.is_some_and(|limit| tries >= limit) {
            warn!(tries, rank = scheme.rank(), "split retry limit reached");
            return Diversification::GaveUp { tries };
        }
        tries += 1;
        match random_split(scheme, rng, cfg.split_distance) {
            SplitAttempt::Kept => {
                debug!(tries, rank = scheme.rank(), "split kept");
                return Diversification::Applied { tries };
            }
            SplitAttempt::Undone => {
                debug!(tries, rank = scheme.rank(), "split undone by reduction, retrying");
            }
            SplitAttempt::AtCapacity => {
                warn!(rank = scheme.rank(), "scheme at maximal rank, skipping split");
                return Diversification::Skipped;
            }
        }
    }
}

/// One diversifying split: split two random rows on a random axis, flip them, perform
/// `split_distance` uninformed flips, then drop zero rows and reduce to a fixpoint.
pub fn random_split<B: BitVector, R: Rng>(
    scheme: &mut Decomposition<B>,
    rng: &mut R,
    split_distance: usize,
) -> SplitAttempt {
    if scheme.rank() >= scheme.max_rank() || scheme.rank() < 2 {
        return SplitAttempt::AtCapacity;
    }
    let (row1, row2) = random_pair(rng, scheme.rank());
    let axis = Axis::from_index(rng.random_range(0..3));
    if !scheme.split(axis, row1, row2) {
        return SplitAttempt::AtCapacity;
    }

    if rng.random_bool(0.5) {
        scheme.flip(axis, row1, row2, false);
    } else {
        scheme.flip(axis, row2, row1, false);
    }
    for _ in 0..split_distance {
        random_flip(scheme, rng, false);
    }

    let split_rank = scheme.rank();
    scheme.remove_zero_rows();
    scheme.reduce_all();
    if scheme.rank() < split_rank {
        SplitAttempt::Undone
    } else {
        SplitAttempt::Kept
    }
}

/// Flips a candidate pair drawn uniformly from the three axis indices, with the primary row
/// chosen by a fair coin. Returns whether a reduction happened (always `false` when no
/// candidate exists).
pub fn random_flip<B: BitVector, R: Rng>(
    scheme: &mut Decomposition<B>,
    rng: &mut R,
    do_reduce: bool,
) -> bool {
    let total = scheme.candidate_count();
    if total == 0 {
        return false;
    }
    let (axis, r1, r2) = scheme.candidate(rng.random_range(0..total));
    if rng.random_bool(0.5) {
        scheme.flip(axis, r1, r2, do_reduce)
    } else {
        scheme.flip(axis, r2, r1, do_reduce)
    }
}

// ============================================================================
// Helpers
// ============================================================================

#[inline]
fn random_pair<R: Rng>(rng: &mut R, n: usize) -> (usize, usize) {
    debug_assert!(n >= 2);
    let u = rng.random_range(0..n);
    let mut v = rng.random_range(0..n);
    while v == u {
        v = rng.random_range(0..n);
    }
    (u, v)
}

fn random_u64() -> u64 {
    rand::random::<u64>()
}

/// The generator a run with `seed` draws from.
///
/// The seed goes through one SplitMix64 round first, so `--seed 1` and `--seed 2` start from
/// unrelated states.
pub fn seeded_rng(seed: u64) -> SmallRng {
    const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
    let mixed = [(30, 0xBF58_476D_1CE4_E5B9), (27, 0x94D0_49BB_1331_11EB)]
        .into_iter()
        .fold(seed.wrapping_add(GAMMA), |z, (shift, mul): (u32, u64)| {
            (z ^ (z >> shift)).wrapping_mul(mul)
        });
    SmallRng::seed_from_u64(mixed ^ (mixed >> 31))
}

// ============================================================================
// Tests
// ============================================================================
