//! Small dense linear-algebra helpers used to derive least-squares filter coefficients.
//!
//! Matrices are stored in [`nalgebra::DMatrix`]; inversion is done here by
//! Gauss-Jordan elimination so the singular threshold is under our control.

use nalgebra::DMatrix;

use crate::error::{Result, TraceError};

/// Pivots with a smaller magnitude are treated as zero.
pub const SINGULAR_THRESHOLD: f64 = 1e-15;

/// Builds the polynomial design matrix: one row per offset, column `p` holds `offset^p`.
pub fn vandermonde(offsets: &[f64], poly_order: usize) -> DMatrix<f64> {
    DMatrix::from_fn(offsets.len(), poly_order + 1, |row, power| {
        offsets[row].powi(power as i32)
    })
}

/// Returns `AᵗA`.
pub fn normal_matrix(a: &DMatrix<f64>) -> DMatrix<f64> {
    a.transpose() * a
}

/// Inverts a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// At each column the row with the largest absolute value in that column is
/// swapped into the pivot position. A pivot below [`SINGULAR_THRESHOLD`]
/// yields [`TraceError::DegenerateMatrix`]; a non-square input yields
/// [`TraceError::NotSquare`].
pub fn invert(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(TraceError::NotSquare {
            rows: n,
            cols: matrix.ncols(),
        });
    }

    let mut work = matrix.clone();
    let mut inverse = DMatrix::<f64>::identity(n, n);

    for col in 0..n {
        let mut pivot_row = col;
        for row in (col + 1)..n {
            if work[(row, col)].abs() > work[(pivot_row, col)].abs() {
                pivot_row = row;
            }
        }

        let pivot = work[(pivot_row, col)];
        if !(pivot.abs() >= SINGULAR_THRESHOLD) {
            return Err(TraceError::DegenerateMatrix { column: col, pivot });
        }

        if pivot_row != col {
            work.swap_rows(pivot_row, col);
            inverse.swap_rows(pivot_row, col);
        }

        for j in 0..n {
            work[(col, j)] /= pivot;
            inverse[(col, j)] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = work[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                work[(row, j)] -= factor * work[(col, j)];
                inverse[(row, j)] -= factor * inverse[(col, j)];
            }
        }
    }

    Ok(inverse)
}

/// Computes the least-squares pseudo-inverse `(AᵗA)⁻¹ Aᵗ` of a design matrix.
pub fn pseudo_inverse(a: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let inverse = invert(&normal_matrix(a))?;
    Ok(inverse * a.transpose())
}
