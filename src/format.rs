//! Scheme text files: parsing, writing, and content-derived output names.
//!
//! One term per line, three factors separated by `*`, each factor a `+`-separated sum of
//! monomials in parentheses:
//!
//! ```text
//! (a11+a22)*(b11+b22)*(c11+c22)
//! ```
//!
//! The small format (`.exp`) uses one digit per coordinate. The large format (`.lexp`),
//! needed once a dimension exceeds 9, uses two zero-padded digits: `a0121` is `a_{1,21}`.
//! Lines without a `*` are ignored.

use crate::bits::{BitVector, cells};
use crate::error::SchemeError;
use crate::scheme::Decomposition;
use crate::tensor::{Axis, Dims, Term};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

/// Extension of small-format scheme files.
pub const SMALL_EXTENSION: &str = "exp";

/// Extension of large-format scheme files.
pub const LARGE_EXTENSION: &str = "lexp";

/// Modulus of the rolling filename hash (`2^63 - 1`).
const NAME_HASH_MODULUS: u64 = 9_223_372_036_854_775_807;

// ============================================================================
// Parsing
// ============================================================================

/// Returns whether `path` names a large-format (`.lexp`) file.
pub fn is_large_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == LARGE_EXTENSION)
}

/// Parses a whole scheme.
///
/// # Errors
/// Returns an error for a line with fewer than two `*` separators, or with a monomial whose
/// coordinates are unreadable or outside the matrix for `dims`.
pub fn parse_scheme<B: BitVector>(
    text: &str,
    dims: Dims,
    large: bool,
) -> Result<Vec<Term<B>>, SchemeError> {
    let mut terms = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if !line.contains('*') {
            continue;
        }
        terms.push(parse_term(line, dims, large).map_err(|reason| SchemeError::Parse {
            line: idx + 1,
            reason,
        })?);
    }
    Ok(terms)
}

fn parse_term<B: BitVector>(line: &str, dims: Dims, large: bool) -> Result<Term<B>, String> {
    let mut parts = line.splitn(3, '*');
    let mut term = [B::ZERO; 3];
    for axis in Axis::ALL {
        let part = parts
            .next()
            .ok_or_else(|| format!("expected three '*'-separated factors in {line:?}"))?;
        term[axis.index()] = parse_factor(part, axis, dims, large)?;
    }
    Ok(term)
}

/// Parses one factor such as `(a11+a22)` for `axis`.
///
/// # Errors
/// Returns a description of the first malformed or out-of-range monomial.
pub fn parse_factor<B: BitVector>(
    text: &str,
    axis: Axis,
    dims: Dims,
    large: bool,
) -> Result<B, String> {
    let (rows, cols) = dims.shape(axis);
    let letter = axis.letter() as u8;
    let digits = if large { 2 } else { 1 };
    let bytes = text.as_bytes();

    let mut v = B::ZERO;
    for (pos, _) in bytes.iter().enumerate().filter(|&(_, &b)| b == letter) {
        let coords = bytes
            .get(pos + 1..pos + 1 + 2 * digits)
            .ok_or_else(|| format!("truncated monomial at {:?}", &text[pos..]))?;
        let (i, j) = coords.split_at(digits);
        let (i, j) = (read_number(i), read_number(j));
        match (i, j) {
            (Some(i), Some(j)) if (1..=rows).contains(&i) && (1..=cols).contains(&j) => {
                v.set_cell(cols, i, j);
            }
            (Some(i), Some(j)) => {
                return Err(format!(
                    "{}{i},{j} outside the {rows}x{cols} matrix",
                    axis.letter()
                ));
            }
            _ => {
                return Err(format!(
                    "malformed monomial at {:?}",
                    String::from_utf8_lossy(&bytes[pos..pos + 1 + 2 * digits])
                ));
            }
        }
    }
    Ok(v)
}

fn read_number(digits: &[u8]) -> Option<usize> {
    digits.iter().try_fold(0usize, |acc, &d| {
        d.is_ascii_digit().then(|| acc * 10 + usize::from(d - b'0'))
    })
}

/// Loads a scheme file; the format follows the file extension.
///
/// The scheme is not verified here.
///
/// # Errors
/// Returns an error if the file cannot be read, a line is malformed, or the instance does
/// not fit in `B`.
pub fn load<B: BitVector>(
    path: impl AsRef<Path>,
    dims: Dims,
) -> Result<Decomposition<B>, SchemeError> {
    let path = path.as_ref();
    let mut text = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut text))
        .map_err(|e| SchemeError::io(path, e))?;
    let terms = parse_scheme(&text, dims, is_large_path(path))?;
    Decomposition::from_terms(dims, terms)
}

// ============================================================================
// Writing
// ============================================================================

/// Writes one factor of `axis`, e.g. `(a11+a22)`.
fn write_factor<B: BitVector, W: fmt::Write>(
    w: &mut W,
    v: B,
    axis: Axis,
    dims: Dims,
    large: bool,
) -> fmt::Result {
    let (rows, cols) = dims.shape(axis);
    w.write_char('(')?;
    for (idx, (i, j)) in cells(v, rows, cols).enumerate() {
        if idx > 0 {
            w.write_char('+')?;
        }
        if large {
            write!(w, "{}{i:02}{j:02}", axis.letter())?;
        } else {
            write!(w, "{}{i}{j}", axis.letter())?;
        }
    }
    w.write_char(')')
}

fn write_terms<B: BitVector, W: fmt::Write>(
    w: &mut W,
    terms: &[Term<B>],
    dims: Dims,
    large: bool,
) -> fmt::Result {
    for term in terms {
        for axis in Axis::ALL {
            if axis != Axis::A {
                w.write_char('*')?;
            }
            write_factor(w, term[axis.index()], axis, dims, large)?;
        }
        w.write_char('\n')?;
    }
    Ok(())
}

/// Renders a scheme in either format.
pub fn render<B: BitVector>(scheme: &Decomposition<B>, large: bool) -> String {
    let mut out = String::with_capacity(scheme.rank() * 32);
    // Writing into a String cannot fail.
    let _ = write_terms(&mut out, scheme.terms(), scheme.dims(), large);
    out
}

/// Writes a scheme to `w` in either format.
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_to<B: BitVector, W: Write>(
    scheme: &Decomposition<B>,
    mut w: W,
    large: bool,
) -> io::Result<()> {
    w.write_all(render(scheme, large).as_bytes())?;
    w.flush()
}

/// Saves a scheme; the format follows the file extension.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn save<B: BitVector>(
    scheme: &Decomposition<B>,
    path: impl AsRef<Path>,
) -> Result<(), SchemeError> {
    let path = path.as_ref();
    File::create(path)
        .and_then(|f| write_to(scheme, BufWriter::new(f), is_large_path(path)))
        .map_err(|e| SchemeError::io(path, e))
}

/// Deterministic content-derived file name, e.g. `k00001f3a9c07b12.exp`.
///
/// Every term is folded into a rolling accumulator (`s += a + b + c; s <<= 1;
/// s %= 2^63 - 1`, wrapping in the storage width), printed as 15 hex digits.
pub fn derive_filename<B: BitVector>(scheme: &Decomposition<B>, large: bool) -> String {
    let mut s = B::ZERO;
    for &[a, b, c] in scheme.terms() {
        s = s.wrapping_add(a.wrapping_add(b).wrapping_add(c));
        s = s.shl1();
        s = B::from_u64(s.rem_u64(NAME_HASH_MODULUS));
    }
    let ext = if large { LARGE_EXTENSION } else { SMALL_EXTENSION };
    format!("k{:015x}.{ext}", s.rem_u64(NAME_HASH_MODULUS))
}

impl<B: BitVector> fmt::Display for Decomposition<B> {
    /// Writes the scheme in the format its instance needs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_terms(f, self.terms(), self.dims(), self.dims().is_large_format())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const STRASSEN: &str = include_str!("../schemes/strassen_2x2x2.exp");

    fn dims(n: usize, m: usize, l: usize) -> Dims {
        Dims::new(n, m, l).unwrap()
    }

    #[test]
    fn parses_strassen() {
        let terms = parse_scheme::<u64>(STRASSEN, dims(2, 2, 2), false).unwrap();
        assert_eq!(terms.len(), 7);
        // (a11+a22)*(b11+b22)*(c11+c22)
        assert_eq!(terms[0], [0b1001, 0b1001, 0b1001]);
        // (a21+a22)*(b11)*(c12+c22)
        assert_eq!(terms[1], [0b1100, 0b0001, 0b1010]);
    }

    #[test]
    fn dimension_order_sizes_each_axis() {
        // (2, 3, 4): a is 2 x 3, b is 3 x 4, c is 4 x 2.
        let line = "(a23)*(b34)*(c42)\n";
        let terms = parse_scheme::<u64>(line, dims(2, 3, 4), false).unwrap();
        assert_eq!(terms[0], [1 << 5, 1 << 11, 1 << 7]);

        // Reversed, b becomes 3 x 2 and b34 falls outside it.
        let err = parse_scheme::<u64>(line, dims(4, 3, 2), false).unwrap_err();
        assert!(err.to_string().contains("outside"), "{err}");
    }

    #[test]
    fn factor_uses_axis_width() {
        // b is m x l = 2 x 3, so b23 is bit 3*(2-1) + (3-1) = 5.
        let v: u64 = parse_factor("(b23)", Axis::B, dims(4, 2, 3), false).unwrap();
        assert_eq!(v, 1 << 5);
        // c is l x n = 3 x 4, so c34 is bit 4*2 + 3 = 11.
        let v: u64 = parse_factor("(c34)", Axis::C, dims(4, 2, 3), false).unwrap();
        assert_eq!(v, 1 << 11);
    }

    #[test]
    fn lines_without_separator_are_skipped() {
        let text = "# comment\n\n(a11)*(b11)*(c11)\ntrailing\n";
        let terms = parse_scheme::<u64>(text, dims(1, 1, 1), false).unwrap();
        assert_eq!(terms, vec![[1, 1, 1]]);
    }

    #[test]
    fn malformed_lines_report_line_number() {
        let text = "(a11)*(b11)*(c11)\n(a1x)*(b11)*(c11)\n";
        match parse_scheme::<u64>(text, dims(1, 1, 1), false) {
            Err(SchemeError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
        let text = "(a11)*(b11)\n";
        assert!(matches!(
            parse_scheme::<u64>(text, dims(1, 1, 1), false),
            Err(SchemeError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let err = parse_factor::<u64>("(a31)", Axis::A, dims(2, 2, 2), false).unwrap_err();
        assert!(err.contains("outside"));
        let err = parse_factor::<u64>("(a10)", Axis::A, dims(2, 2, 2), false).unwrap_err();
        assert!(err.contains("outside"));
        assert!(parse_factor::<u64>("(a1", Axis::A, dims(2, 2, 2), false).is_err());
    }

    #[test]
    fn large_format_round_trips() {
        let d = dims(10, 2, 3);
        let scheme = Decomposition::<u128>::standard(d).unwrap();
        let text = render(&scheme, true);
        assert!(text.starts_with("(a0101)*(b0101)*(c0101)\n"));
        let terms = parse_scheme::<u128>(&text, d, true).unwrap();
        assert_eq!(terms, scheme.terms());
    }

    #[test]
    fn render_matches_file_layout() {
        let d = dims(2, 2, 2);
        let terms = parse_scheme::<u64>(STRASSEN, d, false).unwrap();
        let scheme = Decomposition::from_terms(d, terms).unwrap();
        assert_eq!(render(&scheme, false), STRASSEN);
        assert_eq!(scheme.to_string(), STRASSEN);
    }

    #[test]
    fn zero_factor_renders_as_empty_parentheses() {
        let d = dims(1, 1, 1);
        let scheme = Decomposition::<u64>::from_terms(d, vec![[1, 0, 1]]).unwrap();
        let text = render(&scheme, false);
        assert_eq!(text, "(a11)*()*(c11)\n");
        assert_eq!(parse_scheme::<u64>(&text, d, false).unwrap(), vec![[1, 0, 1]]);
    }

    #[test]
    fn derived_name_is_deterministic_and_content_sensitive() {
        let d = dims(2, 2, 2);
        let terms = parse_scheme::<u64>(STRASSEN, d, false).unwrap();
        let a = Decomposition::from_terms(d, terms.clone()).unwrap();
        let b = Decomposition::from_terms(d, terms).unwrap();
        let name = derive_filename(&a, false);
        assert_eq!(name, derive_filename(&b, false));
        assert_eq!(name.len(), "k".len() + 15 + ".exp".len());
        assert!(name.starts_with('k') && name.ends_with(".exp"));
        assert!(derive_filename(&a, true).ends_with(".lexp"));

        let standard = Decomposition::<u64>::standard(d).unwrap();
        assert_ne!(name, derive_filename(&standard, false));
    }

    #[test]
    fn derived_name_matches_hand_computation() {
        // One term (1, 1, 1): s = (0 + 3) << 1 = 6.
        let scheme = Decomposition::<u64>::from_terms(dims(1, 1, 1), vec![[1, 1, 1]]).unwrap();
        assert_eq!(derive_filename(&scheme, false), "k000000000000006.exp");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let d = dims(3, 2, 2);
        let scheme = Decomposition::<u64>::standard(d).unwrap();

        for name in ["s.exp", "s.lexp"] {
            let path = dir.path().join(name);
            save(&scheme, &path).unwrap();
            let loaded: Decomposition<u64> = load(&path, d).unwrap();
            assert_eq!(loaded.terms(), scheme.terms());
        }
        let large = std::fs::read_to_string(dir.path().join("s.lexp")).unwrap();
        assert!(large.starts_with("(a0101)"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load::<u64>(dir.path().join("missing.exp"), dims(2, 2, 2)).unwrap_err();
        assert!(matches!(err, SchemeError::Io { .. }));
    }
}
