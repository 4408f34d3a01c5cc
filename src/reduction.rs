//! # Truncated SVD for item latent factors
//!
//! Projects the items × users matrix `X` onto its top `k` singular directions and
//! returns `U_k · Σ_k` (one `k`-dimensional vector per item, row order preserved).
//!
//! ## Solvers
//!
//! - [`SvdSolver::Exact`] runs a full, deterministic SVD through smartcore and keeps
//!   the leading `k` triplets. The decomposition is always taken on the tall
//!   orientation; a wide `X` is transposed first and the factors swapped, since
//!   `Xᵀ = V Σ Uᵀ`.
//! - [`SvdSolver::Randomized`] follows Halko, Martinsson & Tropp (2011): sketch the
//!   range of `X` with a Gaussian test matrix, refine it with power iterations,
//!   then run the exact solver on the small projected matrix `B = Qᵀ X`. The test
//!   matrix is drawn from a `ChaCha8Rng` seeded from the configuration, so two runs
//!   with the same seed agree bit for bit.
//!
//! ## Sign convention
//!
//! Singular vectors are defined up to sign and the Pearson correlation between two
//! latent rows changes when a single component flips. Each component is therefore
//! oriented so that the largest-magnitude entry of its left singular vector is
//! positive, which makes the output independent of the solver's internal choice.
//!
//! ## Rank
//!
//! `k` must satisfy `0 < k < min(rows, cols)`; the check runs before any numeric
//! work and fails with [`RecError::InvalidRank`].

use log::{debug, info, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::{
    arrays::{Array, Array2},
    matrix::DenseMatrix,
};
use smartcore::linalg::traits::svd::SVDDecomposable;

use crate::error::{RecError, Result};
use crate::operators::{dot, norm, variance};

/// Numeric strategy used by [`TruncatedSvd`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SvdSolver {
    #[default]
    Exact,
    Randomized {
        oversamples: usize,
        power_iterations: usize,
        seed: u64,
    },
}

impl SvdSolver {
    /// Randomized solver with 10 oversamples and 5 power iterations.
    pub fn randomized(seed: u64) -> Self {
        SvdSolver::Randomized {
            oversamples: 10,
            power_iterations: 5,
            seed,
        }
    }
}

/// Items mapped into the latent space.
#[derive(Clone, Debug)]
pub struct LatentMatrix {
    /// n_items × k, `U_k · Σ_k`
    pub embedding: DenseMatrix<f64>,
    pub singular_values: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl LatentMatrix {
    /// (n_items, k)
    pub fn shape(&self) -> (usize, usize) {
        self.embedding.shape()
    }

    pub fn n_components(&self) -> usize {
        self.singular_values.len()
    }

    /// Share of the input's total column variance carried by each component.
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        self.embedding.get_row(i).iterator(0).copied().collect()
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.shape().0).map(|i| self.row(i)).collect()
    }
}

/// Truncated singular value decomposition with a fixed component count.
#[derive(Clone, Debug)]
pub struct TruncatedSvd {
    pub n_components: usize,
    pub solver: SvdSolver,
}

impl TruncatedSvd {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            solver: SvdSolver::Exact,
        }
    }

    pub fn with_solver(mut self, solver: SvdSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Fails with `InvalidRank` unless `0 < k < min(rows, cols)`.
    pub fn validate_rank(&self, rows: usize, cols: usize) -> Result<()> {
        let k = self.n_components;
        if k == 0 || k >= rows.min(cols) {
            return Err(RecError::InvalidRank { k, rows, cols });
        }
        Ok(())
    }

    /// Reduce an items × users matrix to items × k.
    pub fn reduce(&self, matrix: &DenseMatrix<f64>) -> Result<LatentMatrix> {
        let (rows, cols) = matrix.shape();
        if rows == 0 || cols == 0 {
            return Err(RecError::EmptyInput("matrix to reduce"));
        }
        self.validate_rank(rows, cols)?;
        let k = self.n_components;
        for row in 0..rows {
            if let Some(col) = (0..cols).find(|&c| !matrix.get((row, c)).is_finite()) {
                return Err(RecError::NonFinite { row, col });
            }
        }

        info!(
            "Reducing {}x{} matrix to {} components ({:?})",
            rows, cols, k, self.solver
        );

        let a = to_row_major(matrix);
        let factors = match self.solver {
            SvdSolver::Exact => exact_svd(&a, rows, cols)?,
            SvdSolver::Randomized {
                oversamples,
                power_iterations,
                seed,
            } => randomized_svd(&a, rows, cols, k, oversamples, power_iterations, seed)?,
        };
        debug!(
            "Leading singular values: {:?}",
            &factors.s[..k.min(factors.s.len())]
        );

        let mut latent = vec![0.0; rows * k];
        for j in 0..k {
            // orient component so its largest |u_ij| is positive
            let mut pivot = 0usize;
            let mut best = f64::NEG_INFINITY;
            for i in 0..rows {
                let v = factors.u[i * factors.r + j].abs();
                if v > best {
                    best = v;
                    pivot = i;
                }
            }
            let sign = if factors.u[pivot * factors.r + j] < 0.0 {
                -1.0
            } else {
                1.0
            };
            for i in 0..rows {
                latent[i * k + j] = sign * factors.u[i * factors.r + j] * factors.s[j];
            }
        }

        let total_var: f64 = (0..cols)
            .map(|c| {
                let col: Vec<f64> = (0..rows).map(|i| a[i * cols + c]).collect();
                variance(&col)
            })
            .sum();
        let explained_variance_ratio = (0..k)
            .map(|j| {
                let col: Vec<f64> = (0..rows).map(|i| latent[i * k + j]).collect();
                if total_var > 0.0 {
                    variance(&col) / total_var
                } else {
                    0.0
                }
            })
            .collect();

        Ok(LatentMatrix {
            embedding: DenseMatrix::from_iterator(latent.into_iter(), rows, k, 0),
            singular_values: factors.s[..k].to_vec(),
            explained_variance_ratio,
        })
    }
}

/// Left singular vectors `u` (m × r, row-major) and `s` (r, descending).
struct Factors {
    u: Vec<f64>,
    s: Vec<f64>,
    r: usize,
}

fn to_row_major(m: &DenseMatrix<f64>) -> Vec<f64> {
    let (rows, cols) = m.shape();
    let mut flat = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        flat.extend((0..cols).map(|j| *m.get((i, j))));
    }
    flat
}

fn transpose(a: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut t = vec![0.0; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            t[j * rows + i] = a[i * cols + j];
        }
    }
    t
}

/// Row-major `a (m × p) · b (p × n)`.
fn matmul(a: &[f64], b: &[f64], m: usize, p: usize, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for t in 0..p {
            let a_it = a[i * p + t];
            if a_it == 0.0 {
                continue;
            }
            let b_row = &b[t * n..(t + 1) * n];
            for (o, &bv) in row.iter_mut().zip(b_row) {
                *o += a_it * bv;
            }
        }
    });
    out
}

/// Full SVD of a row-major `rows × cols` matrix, components sorted by `s` descending.
fn exact_svd(a: &[f64], rows: usize, cols: usize) -> Result<Factors> {
    let tall = rows >= cols;
    let (m, n, data) = if tall {
        (rows, cols, a.to_vec())
    } else {
        trace!("Wide input {}x{}: decomposing the transpose", rows, cols);
        (cols, rows, transpose(a, rows, cols))
    };

    let dm = DenseMatrix::from_iterator(data.into_iter(), m, n, 0);
    let svd = dm
        .svd()
        .map_err(|e| RecError::Decomposition(e.to_string()))?;

    // m × n left, n × n right; swapped back for wide input
    let r = n;
    let mut order: Vec<usize> = (0..r).collect();
    order.sort_by(|&x, &y| {
        svd.s[y]
            .partial_cmp(&svd.s[x])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(x.cmp(&y))
    });

    let take = |mat: &DenseMatrix<f64>, nrows: usize| -> Vec<f64> {
        let mut out = Vec::with_capacity(nrows * r);
        for i in 0..nrows {
            out.extend(order.iter().map(|&j| *mat.get((i, j))));
        }
        out
    };
    let s: Vec<f64> = order.iter().map(|&j| svd.s[j]).collect();
    let u = if tall { take(&svd.U, m) } else { take(&svd.V, n) };

    Ok(Factors { u, s, r })
}

/// Modified Gram–Schmidt over the columns of a row-major `rows × cols` matrix.
/// Columns that collapse to zero stay zero.
fn orthonormalise(y: &mut [f64], rows: usize, cols: usize) {
    for j in 0..cols {
        let mut col: Vec<f64> = (0..rows).map(|i| y[i * cols + j]).collect();
        for prev in 0..j {
            let q: Vec<f64> = (0..rows).map(|i| y[i * cols + prev]).collect();
            let proj = dot(&q, &col);
            col.iter_mut().zip(q.iter()).for_each(|(c, qv)| *c -= proj * qv);
        }
        let nrm = norm(&col);
        for i in 0..rows {
            y[i * cols + j] = if nrm > 1e-12 { col[i] / nrm } else { 0.0 };
        }
    }
}

fn randomized_svd(
    a: &[f64],
    rows: usize,
    cols: usize,
    k: usize,
    oversamples: usize,
    power_iterations: usize,
    seed: u64,
) -> Result<Factors> {
    let l = (k + oversamples).min(rows.min(cols));
    debug!(
        "Randomized sketch: l={}, power iterations={}, seed={}",
        l, power_iterations, seed
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let omega: Vec<f64> = (0..cols * l)
        .map(|_| StandardNormal.sample(&mut rng))
        .collect();

    let at = transpose(a, rows, cols);
    let mut q = matmul(a, &omega, rows, cols, l);
    orthonormalise(&mut q, rows, l);
    for it in 0..power_iterations {
        trace!("Power iteration {}", it);
        let mut z = matmul(&at, &q, cols, rows, l);
        orthonormalise(&mut z, cols, l);
        q = matmul(a, &z, rows, cols, l);
        orthonormalise(&mut q, rows, l);
    }

    // B = Qᵀ A  (l × cols)
    let qt = transpose(&q, rows, l);
    let b = matmul(&qt, a, l, rows, cols);
    let small = exact_svd(&b, l, cols)?;

    // U = Q · U_b  (rows × r)
    let u = matmul(&q, &small.u, rows, l, small.r);
    Ok(Factors {
        u,
        s: small.s,
        r: small.r,
    })
}
