//! Dense row-major matrices with Gauss-Jordan inversion.

use crate::error::{JjsimError, Result};

use super::SINGULAR_TOLERANCE;

/// A dense real matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Elements (row-major)
    data: Vec<f64>,
    /// Number of rows
    rows: usize,
    /// Number of columns
    cols: usize,
}

impl Matrix {
    /// Create a zero matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Create the `n × n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build a matrix from a list of rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(JjsimError::dimension_mismatch("matrix row", n_cols, row.len()));
            }
            data.extend(row);
        }
        Ok(Self {
            data,
            rows: n_rows,
            cols: n_cols,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Check if the matrix is square.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Get element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Set element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row as a slice.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Matrix-vector product `M · v`.
    pub fn mul_vec(&self, v: &[f64]) -> Result<Vec<f64>> {
        if v.len() != self.cols {
            return Err(JjsimError::dimension_mismatch(
                "matrix-vector product",
                self.cols,
                v.len(),
            ));
        }
        Ok((0..self.rows)
            .map(|r| self.row(r).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Matrix-matrix product `self · other`.
    pub fn mul_mat(&self, other: &Matrix) -> Result<Matrix> {
        if other.rows != self.cols {
            return Err(JjsimError::dimension_mismatch(
                "matrix-matrix product",
                self.cols,
                other.rows,
            ));
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    out.data[i * other.cols + j] += a * other.get(k, j);
                }
            }
        }
        Ok(out)
    }

    /// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
    ///
    /// The augmented matrix `[M | I]` is reduced until the left half is the
    /// identity; the right half is then the inverse. A pivot whose magnitude
    /// is at or below [`SINGULAR_TOLERANCE`] makes the matrix singular.
    pub fn invert(&self) -> Result<Matrix> {
        if !self.is_square() {
            return Err(JjsimError::dimension_mismatch(
                "matrix inversion (columns)",
                self.rows,
                self.cols,
            ));
        }

        let n = self.rows;
        let w = 2 * n;

        // Augmented [M | I]
        let mut aug = vec![0.0; n * w];
        for i in 0..n {
            aug[i * w..i * w + n].copy_from_slice(self.row(i));
            aug[i * w + n + i] = 1.0;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = aug[k * w + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = aug[i * w + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val <= SINGULAR_TOLERANCE {
                return Err(JjsimError::SingularMatrix {
                    pivot: k,
                    magnitude: max_val,
                });
            }

            // Swap rows if needed
            if max_row != k {
                for j in 0..w {
                    aug.swap(k * w + j, max_row * w + j);
                }
            }

            // Normalize the pivot row
            let pivot = aug[k * w + k];
            for j in 0..w {
                aug[k * w + j] /= pivot;
            }

            // Eliminate the pivot column from every other row
            for i in 0..n {
                if i == k {
                    continue;
                }
                let factor = aug[i * w + k];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..w {
                    aug[i * w + j] -= factor * aug[k * w + j];
                }
            }
        }

        let mut inverse = Matrix::zeros(n, n);
        for i in 0..n {
            inverse.data[i * n..(i + 1) * n].copy_from_slice(&aug[i * w + n..(i + 1) * w]);
        }
        Ok(inverse)
    }
}
