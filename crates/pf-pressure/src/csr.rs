//! Compressed sparse row storage for the pressure system.

use crate::error::{PressureError, PressureResult};
use nalgebra::DMatrix;

/// Square sparse matrix in CSR layout with sorted column indices per row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsrMatrix {
    pub n: usize,
    pub row_ptr: Vec<usize>,
    pub col_idx: Vec<usize>,
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// Zero-valued matrix with the given per-row column sets.
    pub fn from_pattern(n: usize, rows: &[Vec<usize>]) -> Self {
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for row in rows.iter().take(n) {
            let mut cols = row.clone();
            cols.sort_unstable();
            cols.dedup();
            col_idx.extend(cols);
            row_ptr.push(col_idx.len());
        }
        while row_ptr.len() < n + 1 {
            row_ptr.push(col_idx.len());
        }
        let nnz = col_idx.len();
        Self {
            n,
            row_ptr,
            col_idx,
            values: vec![0.0; nnz],
        }
    }

    /// Build from `(row, col, value)` triplets, summing duplicates.
    pub fn from_triplets(n: usize, triplets: &[(usize, usize, f64)]) -> PressureResult<Self> {
        let mut rows = vec![Vec::new(); n];
        for &(r, c, _) in triplets {
            if r >= n || c >= n {
                return Err(PressureError::OutsidePattern { row: r, col: c });
            }
            rows[r].push(c);
        }
        let mut m = Self::from_pattern(n, &rows);
        for &(r, c, v) in triplets {
            m.add(r, c, v)?;
        }
        Ok(m)
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn position(&self, row: usize, col: usize) -> Option<usize> {
        let start = *self.row_ptr.get(row)?;
        let end = *self.row_ptr.get(row + 1)?;
        self.col_idx[start..end]
            .binary_search(&col)
            .ok()
            .map(|k| start + k)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.position(row, col).map_or(0.0, |k| self.values[k])
    }

    /// Add `v` to an entry of the pattern.
    pub fn add(&mut self, row: usize, col: usize, v: f64) -> PressureResult<()> {
        let k = self
            .position(row, col)
            .ok_or(PressureError::OutsidePattern { row, col })?;
        self.values[k] += v;
        Ok(())
    }

    pub fn clear_values(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// `y = A x`
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        for (row, yi) in y.iter_mut().enumerate().take(self.n) {
            let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
            *yi = self.col_idx[start..end]
                .iter()
                .zip(&self.values[start..end])
                .map(|(&c, &a)| a * x[c])
                .sum();
        }
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.get(i, i)).collect()
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.n, self.n);
        for row in 0..self.n {
            for k in self.row_ptr[row]..self.row_ptr[row + 1] {
                dense[(row, self.col_idx[k])] += self.values[k];
            }
        }
        dense
    }
}

/// Matrix, right-hand side and solution buffer of one pressure system.
#[derive(Clone, Debug, Default)]
pub struct LinearSystem {
    pub matrix: CsrMatrix,
    pub rhs: Vec<f64>,
    pub x: Vec<f64>,
}

impl LinearSystem {
    pub fn with_pattern(matrix: CsrMatrix) -> Self {
        let n = matrix.n;
        Self {
            matrix,
            rhs: vec![0.0; n],
            x: vec![0.0; n],
        }
    }

    pub fn size(&self) -> usize {
        self.matrix.n
    }

    /// Zero matrix values and right-hand side, keeping the pattern.
    pub fn reset(&mut self) {
        self.matrix.clear_values();
        self.rhs.iter_mut().for_each(|v| *v = 0.0);
    }

    /// `A x - b` at the current solution buffer.
    pub fn residual(&self) -> Vec<f64> {
        let mut r = vec![0.0; self.size()];
        self.matrix.mul_vec(&self.x, &mut r);
        for (ri, bi) in r.iter_mut().zip(&self.rhs) {
            *ri -= bi;
        }
        r
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use nalgebra::DVector;
    use proptest::prelude::*;

    fn triplets(n: usize) -> impl Strategy<Value = Vec<(usize, usize, f64)>> {
        prop::collection::vec((0..n, 0..n, -1e3_f64..1e3), 0..3 * n)
    }

    proptest! {
        #[test]
        fn mul_vec_agrees_with_dense_product(
            (n, entries, x) in (1_usize..8).prop_flat_map(|n| {
                (Just(n), triplets(n), prop::collection::vec(-1e3_f64..1e3, n))
            })
        ) {
            let m = CsrMatrix::from_triplets(n, &entries).unwrap();
            let mut y = vec![0.0; n];
            m.mul_vec(&x, &mut y);
            let dense = m.to_dense() * DVector::from_column_slice(&x);
            for i in 0..n {
                prop_assert!((y[i] - dense[i]).abs() <= 1e-9 * (1.0 + dense[i].abs()));
            }
        }
    }
}
