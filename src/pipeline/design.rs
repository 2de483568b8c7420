use std::ops::Range;

use super::lineshape::LineShape;
use crate::error::FitError;

/// Column-major design matrix: one line-shape basis vector per column.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    n_rows: usize,
    n_cols: usize,
    /// First sample index represented by row 0
    first_row: usize,
    data: Vec<f64>,
}

impl DesignMatrix {
    /// Build an `n_rows × frequencies.len()` matrix over samples `0..n_rows`.
    pub fn build(frequencies: &[f64], decays: &[f64], n_rows: usize) -> Result<Self, FitError> {
        Self::build_rows(frequencies, decays, 0..n_rows)
    }

    /// Build a matrix whose rows are the sample indices in `rows`.
    pub fn build_rows(frequencies: &[f64], decays: &[f64], rows: Range<usize>) -> Result<Self, FitError> {
        if frequencies.len() != decays.len() {
            return Err(FitError::InvalidArgument(format!(
                "design matrix: {} frequencies but {} decays",
                frequencies.len(),
                decays.len()
            )));
        }
        let n_rows = rows.len();
        let n_cols = frequencies.len();
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (&f, &d) in frequencies.iter().zip(decays) {
            let shape = LineShape::new(f, d)?;
            data.extend(rows.clone().map(|i| shape.value(i as f64)));
        }
        Ok(Self {
            n_rows,
            n_cols,
            first_row: rows.start,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn first_row(&self) -> usize {
        self.first_row
    }

    pub fn column(&self, j: usize) -> &[f64] {
        &self.data[j * self.n_rows..(j + 1) * self.n_rows]
    }

    /// `A·x` over the matrix rows
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_rows];
        for (j, &xj) in x.iter().enumerate().take(self.n_cols) {
            if xj == 0.0 {
                continue;
            }
            for (o, &a) in out.iter_mut().zip(self.column(j)) {
                *o += xj * a;
            }
        }
        out
    }

    /// Gram matrix `AᵀA` (row-major, `n_cols × n_cols`) and `Aᵀb`.
    pub fn normal_equations(&self, b: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let k = self.n_cols;
        let mut gram = vec![0.0; k * k];
        for i in 0..k {
            for j in i..k {
                let v = dot(self.column(i), self.column(j));
                gram[i * k + j] = v;
                gram[j * k + i] = v;
            }
        }
        let atb = (0..k).map(|j| dot(self.column(j), b)).collect();
        (gram, atb)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
