//! Item × item Pearson correlation over latent vectors.
//!
//! Each latent row is standardised once (mean removed, scaled to unit norm), after
//! which every coefficient is a plain dot product. Only the upper triangle is
//! computed and mirrored, so `C[i][j]` and `C[j][i]` are the same `f64`.
//!
//! A row with zero variance cannot be standardised; all of its coefficients,
//! including the diagonal, are `NaN`. `NaN` never passes a `> threshold` test, so
//! such items drop out of recommendations while remaining visible in score
//! listings.
//!
//! Cost is O(n² · k) time and O(n²) memory, the dominant term for large catalogues.

use log::{debug, info};
use rayon::prelude::*;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{RecError, Result};
use crate::operators::{dot, standardise};
use crate::reduction::LatentMatrix;

/// Square, symmetric matrix of pairwise item correlations in `[-1, 1]`.
#[derive(Clone, Debug)]
pub struct CorrelationMatrix {
    pub matrix: DenseMatrix<f64>,
    n: usize,
}

impl CorrelationMatrix {
    /// Number of items on each axis.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n, self.n)
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        *self.matrix.get((i, j))
    }

    /// Copy of row `i`.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.matrix.get_row(i).iterator(0).copied().collect()
    }
}

/// Correlation of every pair of latent rows.
pub fn correlate(latent: &LatentMatrix) -> Result<CorrelationMatrix> {
    pearson_rows(&latent.rows())
}

/// Pearson correlation between every pair of `rows`.
pub fn pearson_rows(rows: &[Vec<f64>]) -> Result<CorrelationMatrix> {
    let n = rows.len();
    if n == 0 {
        return Err(RecError::EmptyInput("no rows to correlate"));
    }
    let width = rows[0].len();
    if width == 0 {
        return Err(RecError::EmptyInput("rows to correlate have no columns"));
    }
    if let Some(bad) = rows.iter().find(|r| r.len() != width) {
        return Err(RecError::DimensionMismatch {
            expected: width,
            actual: bad.len(),
        });
    }
    info!("Computing {}x{} correlation matrix over {} dims", n, n, width);

    let standardised: Vec<Vec<f64>> = rows.par_iter().map(|r| standardise(r)).collect();
    let degenerate = standardised
        .iter()
        .filter(|r| r.first().is_some_and(|x| x.is_nan()))
        .count();
    if degenerate > 0 {
        debug!("{} zero-variance rows yield NaN correlations", degenerate);
    }

    // upper triangle, row i holds (i..n)
    let upper: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (i..n)
                .map(|j| dot(&standardised[i], &standardised[j]).clamp(-1.0, 1.0))
                .collect()
        })
        .collect();

    let mut flat = vec![0.0; n * n];
    for (i, tail) in upper.iter().enumerate() {
        for (offset, &c) in tail.iter().enumerate() {
            let j = i + offset;
            flat[i * n + j] = c;
            flat[j * n + i] = c;
        }
    }

    Ok(CorrelationMatrix {
        matrix: DenseMatrix::from_iterator(flat.into_iter(), n, n, 0),
        n,
    })
}
