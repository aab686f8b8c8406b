//! Truncated SVD reconstruction of the interaction matrix
//!
//! The low-rank reconstruction `U_k Σ_k V_kᵀ` smooths the sparse like/visit matrix
//! and assigns non-zero affinity to posts a user never touched, which is where
//! novel recommendations come from.
//!
//! The decomposition works on the smaller Gram matrix (`AᵀA` or `AAᵀ`) with a cyclic
//! Jacobi eigen solver. For `AᵀA = V Λ Vᵀ` the rank-k reconstruction is `A V_k V_kᵀ`;
//! for `AAᵀ = U Λ Uᵀ` it is `U_k U_kᵀ A`. Both equal `U_k Σ_k V_kᵀ`.

use crate::error::FactorizationError;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Truncated SVD parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SvdConfig {
    /// Upper bound on retained singular values (default: 10)
    pub max_rank: usize,
    /// Jacobi sweeps before giving up (default: 100)
    pub max_sweeps: usize,
    /// Relative off-diagonal norm treated as converged (default: 1e-10)
    pub tolerance: f64,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            max_rank: 10,
            max_sweeps: 100,
            tolerance: 1e-10,
        }
    }
}

/// Low-rank smoothing of interaction matrices
#[derive(Debug, Clone, Default)]
pub struct FactorizationEngine {
    config: SvdConfig,
}

impl FactorizationEngine {
    pub fn new(config: SvdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SvdConfig {
        &self.config
    }

    /// Rank used for a `rows x cols` matrix, or `None` when there is too little data
    pub fn rank_for(&self, rows: usize, cols: usize) -> Option<usize> {
        if rows < 2 || cols < 2 {
            return None;
        }
        Some(self.config.max_rank.min(rows - 1).min(cols - 1).max(1))
    }

    /// Reconstruct the matrix, degrading to the raw input on numerical failure
    pub fn reconstruct(&self, matrix: &Array2<f64>) -> Array2<f64> {
        match self.try_reconstruct(matrix) {
            Ok(reconstructed) => reconstructed,
            Err(e) => {
                warn!(
                    error = %e,
                    rows = matrix.nrows(),
                    cols = matrix.ncols(),
                    "Factorization failed, using raw interaction matrix"
                );
                matrix.clone()
            }
        }
    }

    /// Reconstruct the matrix, reporting numerical failures
    pub fn try_reconstruct(&self, matrix: &Array2<f64>) -> Result<Array2<f64>, FactorizationError> {
        let (rows, cols) = matrix.dim();

        let Some(k) = self.rank_for(rows, cols) else {
            debug!(rows, cols, "Matrix too small to factorize");
            return Ok(matrix.clone());
        };

        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(FactorizationError::NonFiniteInput);
        }

        let reconstructed = if cols <= rows {
            let gram = matrix.t().dot(matrix);
            let basis = self.top_eigenvectors(&gram, k)?;
            matrix.dot(&basis.dot(&basis.t()))
        } else {
            let gram = matrix.dot(&matrix.t());
            let basis = self.top_eigenvectors(&gram, k)?;
            basis.dot(&basis.t()).dot(matrix)
        };

        if reconstructed.iter().any(|v| !v.is_finite()) {
            return Err(FactorizationError::NonFiniteOutput);
        }

        debug!(rows, cols, rank = k, "Reconstructed interaction matrix");
        Ok(reconstructed)
    }

    /// Eigenvectors of the `k` largest eigenvalues, one per column
    fn top_eigenvectors(
        &self,
        gram: &Array2<f64>,
        k: usize,
    ) -> Result<Array2<f64>, FactorizationError> {
        let (eigenvalues, eigenvectors) = self.symmetric_eigen(gram)?;

        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]).then(a.cmp(&b)));
        order.truncate(k);

        Ok(eigenvectors.select(Axis(1), &order))
    }

    /// Cyclic Jacobi eigen decomposition of a symmetric matrix
    ///
    /// Returns eigenvalues and the matrix whose columns are the matching eigenvectors.
    fn symmetric_eigen(
        &self,
        gram: &Array2<f64>,
    ) -> Result<(Array1<f64>, Array2<f64>), FactorizationError> {
        let n = gram.nrows();
        let mut a = gram.clone();
        let mut v = Array2::<f64>::eye(n);

        let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt().max(1.0);
        let threshold = self.config.tolerance * scale;

        for sweep in 0..self.config.max_sweeps {
            let off_diagonal = Self::off_diagonal_norm(&a);
            if off_diagonal <= threshold {
                debug!(sweep, off_diagonal, "Jacobi converged");
                return Ok((a.diag().to_owned(), v));
            }

            for p in 0..n {
                for q in (p + 1)..n {
                    let apq = a[[p, q]];
                    if apq == 0.0 {
                        continue;
                    }

                    let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                    let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                    let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                    let c = 1.0 / (t * t + 1.0).sqrt();
                    let s = t * c;

                    // A <- A J
                    for r in 0..n {
                        let arp = a[[r, p]];
                        let arq = a[[r, q]];
                        a[[r, p]] = c * arp - s * arq;
                        a[[r, q]] = s * arp + c * arq;
                    }

                    // A <- Jᵀ A
                    for r in 0..n {
                        let apr = a[[p, r]];
                        let aqr = a[[q, r]];
                        a[[p, r]] = c * apr - s * aqr;
                        a[[q, r]] = s * apr + c * aqr;
                    }

                    // V <- V J
                    for r in 0..n {
                        let vrp = v[[r, p]];
                        let vrq = v[[r, q]];
                        v[[r, p]] = c * vrp - s * vrq;
                        v[[r, q]] = s * vrp + c * vrq;
                    }
                }
            }
        }

        if Self::off_diagonal_norm(&a) <= threshold {
            return Ok((a.diag().to_owned(), v));
        }

        Err(FactorizationError::NoConvergence {
            sweeps: self.config.max_sweeps,
        })
    }

    fn off_diagonal_norm(a: &Array2<f64>) -> f64 {
        let n = a.nrows();
        let mut sum = 0.0;
        for p in 0..n {
            for q in 0..n {
                if p != q {
                    sum += a[[p, q]] * a[[p, q]];
                }
            }
        }
        sum.sqrt()
    }
}
