//! Fast deterministic validation of known small schemes.

use crate::format::parse_scheme;
use crate::scheme::Decomposition;
use crate::tensor::Dims;

// ============================================================================
// Public API
// ============================================================================

/// Validates:
/// - the bundled rank-7 Strassen scheme for `(2, 2, 2)`
/// - the schoolbook schemes for a handful of small instances
/// - Strassen expanded to `(2, 2, 3)` and `(3, 3, 3)`
///
/// # Errors
/// Returns an error message if any scheme fails validation.
pub fn validate_known_schemes() -> Result<(), String> {
    let strassen = validate_scheme_text(
        include_str!("../schemes/strassen_2x2x2.exp"),
        "strassen_2x2x2.exp",
        dims(2, 2, 2)?,
        7,
    )?;

    for (n, m, l) in [(1, 1, 1), (2, 2, 2), (2, 3, 4), (3, 3, 3), (4, 4, 4)] {
        let d = dims(n, m, l)?;
        let scheme = Decomposition::<u64>::standard(d).map_err(|e| format!("standard {d}: {e}"))?;
        expect_correct(&scheme, &format!("standard {d}"), d.max_rank())?;
    }

    for (n, m, l) in [(2, 2, 3), (3, 3, 3)] {
        let d = dims(n, m, l)?;
        let expanded = strassen
            .expand::<u64>(d)
            .map_err(|e| format!("strassen -> {d}: {e}"))?;
        expect_correct(&expanded, &format!("strassen -> {d}"), 7 + d.max_rank() - 8)?;
    }

    Ok(())
}

/// Parses a scheme and checks it against the tensor and the expected rank.
///
/// # Errors
/// Returns an error message if parsing fails, the scheme is incorrect, or its rank differs.
pub fn validate_scheme_text(
    text: &str,
    name: &str,
    dims: Dims,
    rank: usize,
) -> Result<Decomposition<u64>, String> {
    let terms = parse_scheme::<u64>(text, dims, dims.is_large_format())
        .map_err(|e| format!("{name}: {e}"))?;
    let scheme = Decomposition::from_terms(dims, terms).map_err(|e| format!("{name}: {e}"))?;
    expect_correct(&scheme, name, rank)?;
    Ok(scheme)
}

// ============================================================================
// Internal
// ============================================================================

fn dims(n: usize, m: usize, l: usize) -> Result<Dims, String> {
    Dims::new(n, m, l).map_err(|e| e.to_string())
}

fn expect_correct(scheme: &Decomposition<u64>, name: &str, rank: usize) -> Result<(), String> {
    if scheme.rank() != rank {
        return Err(format!(
            "{name}: expected rank {rank}, but found {}",
            scheme.rank()
        ));
    }
    scheme.check().map_err(|e| format!("{name}: {e}"))
}

// ============================================================================
// Tests
// ============================================================================
