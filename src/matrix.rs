//! Symmetric matrix reconstruction from triangular descriptors
use crate::{
    diagnostics::{DiagnosticKind, Diagnostics},
    error::MatrixError,
    fields::Fields,
};

use nalgebra::DMatrix;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Maximal number of values packed in one descriptor line
pub const MAX_PACKED_VALUES: usize = 3;

/// Stored triangle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Triangle {
    #[default]
    Lower,
    Upper,
    /// Unrecognized flag
    Unknown(String),
}

impl FromStr for Triangle {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L" | "l" => Ok(Self::Lower),
            "U" | "u" => Ok(Self::Upper),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}

impl Display for Triangle {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Lower => write!(f, "L"),
            Self::Upper => write!(f, "U"),
            Self::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// One descriptor: up to 3 consecutive values of row `row`,
/// starting at column `col`. Indexes are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixEntry {
    pub row: usize,
    pub col: usize,
    /// NaN marks a missing value
    pub values: [f64; MAX_PACKED_VALUES],
}

impl MatrixEntry {
    /// Builds a new entry, missing values are NaN
    pub fn new(row: usize, col: usize, values: &[f64]) -> Self {
        let mut packed = [f64::NAN; MAX_PACKED_VALUES];
        for (slot, value) in packed.iter_mut().zip(values.iter()) {
            *slot = *value;
        }
        Self {
            row,
            col,
            values: packed,
        }
    }
    /// Builds an entry from parsed [Fields]: negative or missing
    /// indexes are rejected, missing values become NaN.
    pub fn from_fields(
        fields: &Fields,
        row: &str,
        col: &str,
        values: &[&str],
    ) -> Result<Self, MatrixError> {
        let index = |name: &str| {
            fields
                .integer(name)
                .filter(|i| *i >= 0)
                .map(|i| i as usize)
                .unwrap_or(0)
        };
        let (r, c) = (index(row), index(col));
        if r == 0 || c == 0 {
            return Err(MatrixError::NullIndex { row: r, col: c });
        }
        let values: Vec<f64> = values
            .iter()
            .map(|name| fields.float(name).unwrap_or(f64::NAN))
            .collect();
        Ok(Self::new(r, c, &values))
    }
    /// Iterates (0-based row, 0-based col, value) of the non NaN values
    fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .map(move |(k, v)| (self.row - 1, self.col - 1 + k, *v))
    }
}

/// Rebuilds a dense symmetric matrix.
/// `size` is the companion record count, when known. Otherwise the highest
/// row index is used: this under-counts when trailing all-zero rows were
/// omitted by the producer.
pub fn reconstruct(
    entries: &[MatrixEntry],
    triangle: &Triangle,
    size: Option<usize>,
    max_dimension: usize,
    diagnostics: &mut Diagnostics,
) -> Result<DMatrix<f64>, MatrixError> {
    let size = match size {
        Some(size) => size,
        None => {
            let size = entries
                .iter()
                .map(|e| e.row)
                .max()
                .ok_or(MatrixError::Empty)?;
            diagnostics.warning(
                DiagnosticKind::MatrixSizeInferred(size),
                None,
                format!(
                    "matrix size inferred from highest row index: {}x{} (may under-count)",
                    size, size
                ),
            );
            size
        },
    };

    // verify everything before allocating
    if size > max_dimension {
        return Err(MatrixError::TooLarge {
            size,
            limit: max_dimension,
        });
    }
    for entry in entries {
        if entry.row == 0 || entry.col == 0 {
            return Err(MatrixError::NullIndex {
                row: entry.row,
                col: entry.col,
            });
        }
        for (row, col, _) in entry.cells() {
            if row >= size || col >= size {
                return Err(MatrixError::OutOfBounds {
                    row: row + 1,
                    col: col + 1,
                    size,
                });
            }
        }
    }

    let mut m = DMatrix::<f64>::zeros(size, size);
    for entry in entries {
        for (row, col, value) in entry.cells() {
            m[(row, col)] = value;
        }
    }
    Ok(symmetrize(&m, triangle, diagnostics))
}

/// Mirrors the stored triangle
pub fn symmetrize(m: &DMatrix<f64>, triangle: &Triangle, diagnostics: &mut Diagnostics) -> DMatrix<f64> {
    let n = m.nrows();
    match triangle {
        Triangle::Lower => DMatrix::from_fn(n, n, |i, j| if i >= j { m[(i, j)] } else { m[(j, i)] }),
        Triangle::Upper => DMatrix::from_fn(n, n, |i, j| if i <= j { m[(i, j)] } else { m[(j, i)] }),
        Triangle::Unknown(flag) => {
            diagnostics.warning(
                DiagnosticKind::MatrixOrientation(flag.clone()),
                None,
                format!("unknown triangle flag \"{}\": using M + Mt - diag(M)", flag),
            );
            DMatrix::from_fn(n, n, |i, j| {
                if i == j {
                    m[(i, i)]
                } else {
                    m[(i, j)] + m[(j, i)]
                }
            })
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::options::DEFAULT_MAX_MATRIX_DIMENSION;

    #[test]
    fn lower_2x2() {
        let entries = vec![
            MatrixEntry::new(1, 1, &[1.0]),
            MatrixEntry::new(2, 1, &[-0.25]),
            MatrixEntry::new(2, 2, &[3.0]),
        ];
        let mut diags = Diagnostics::default();
        let m = reconstruct(
            &entries,
            &Triangle::Lower,
            Some(2),
            DEFAULT_MAX_MATRIX_DIMENSION,
            &mut diags,
        )
        .unwrap();
        assert_eq!(m, DMatrix::from_row_slice(2, 2, &[1.0, -0.25, -0.25, 3.0]));
        assert!(diags.is_empty());
    }

    #[test]
    fn packed_values_advance_along_row() {
        // upper triangle of a 3x3, packed on one line per row
        let entries = vec![
            MatrixEntry::new(1, 1, &[1.0, 2.0, 3.0]),
            MatrixEntry::new(2, 2, &[4.0, 5.0]),
            MatrixEntry::new(3, 3, &[6.0, f64::NAN, f64::NAN]),
        ];
        let mut diags = Diagnostics::default();
        let m = reconstruct(&entries, &Triangle::Upper, Some(3), 100, &mut diags).unwrap();
        assert_eq!(
            m,
            DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 5.0, 3.0, 5.0, 6.0])
        );
    }

    #[test]
    fn size_inference() {
        let entries = vec![MatrixEntry::new(3, 1, &[1.0]), MatrixEntry::new(2, 2, &[2.0])];
        let mut diags = Diagnostics::default();
        let m = reconstruct(&entries, &Triangle::Lower, None, 100, &mut diags).unwrap();
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m[(0, 2)], 1.0);
        assert!(diags.contains(&DiagnosticKind::MatrixSizeInferred(3)));
        // trailing null rows are lost: documented limitation
        let entries = vec![MatrixEntry::new(1, 1, &[1.0])];
        let m = reconstruct(&entries, &Triangle::Lower, None, 100, &mut diags).unwrap();
        assert_eq!(m.shape(), (1, 1));
    }

    #[test]
    fn unknown_orientation() {
        let entries = vec![
            MatrixEntry::new(1, 1, &[1.0, 2.0]),
            MatrixEntry::new(2, 1, &[0.5, 4.0]),
        ];
        let mut diags = Diagnostics::default();
        let m = reconstruct(&entries, &"X".parse().unwrap(), Some(2), 100, &mut diags).unwrap();
        assert_eq!(m, DMatrix::from_row_slice(2, 2, &[1.0, 2.5, 2.5, 4.0]));
        assert!(diags.contains(&DiagnosticKind::MatrixOrientation("X".to_string())));
    }

    #[test]
    fn bounds_are_checked_before_allocation() {
        let mut diags = Diagnostics::default();
        let entries = vec![MatrixEntry::new(1_000_000, 1, &[1.0])];
        assert_eq!(
            reconstruct(&entries, &Triangle::Lower, None, 10_000, &mut diags),
            Err(MatrixError::TooLarge {
                size: 1_000_000,
                limit: 10_000
            })
        );
        let entries = vec![MatrixEntry::new(2, 2, &[1.0, 2.0])];
        assert_eq!(
            reconstruct(&entries, &Triangle::Lower, Some(2), 100, &mut diags),
            Err(MatrixError::OutOfBounds {
                row: 2,
                col: 3,
                size: 2
            })
        );
        let entries = vec![MatrixEntry::new(0, 1, &[1.0])];
        assert_eq!(
            reconstruct(&entries, &Triangle::Lower, Some(2), 100, &mut diags),
            Err(MatrixError::NullIndex { row: 0, col: 1 })
        );
        assert_eq!(
            reconstruct(&[], &Triangle::Lower, None, 100, &mut diags),
            Err(MatrixError::Empty)
        );
        let m = reconstruct(&[], &Triangle::Lower, Some(2), 100, &mut diags).unwrap();
        assert_eq!(m, DMatrix::zeros(2, 2));
    }
}
