//! Finite-dimensional Gaussian laws and the projective family.
//!
//! ## Theory
//!
//! A mean-zero Gaussian process is determined by its covariance kernel: for
//! every finite time subset `I` there is a unique mean-zero multivariate
//! normal law with covariance `Gram(I)`, and these laws are automatically
//! projectively consistent (marginalizing the law over `I` onto `J ⊆ I`
//! yields the law over `J`, because marginalizing a Gaussian just selects a
//! principal submatrix of the covariance). [`GaussianProjectiveFamily`]
//! exposes the laws and makes the consistency condition checkable rather
//! than assumed.
//!
//! The load-bearing Gaussian-specific fact lives here too: for a *jointly
//! Gaussian* vector, pairwise zero covariance implies full independence —
//! see [`FiniteLaw::uncorrelated_implies_independent`].

use std::sync::Arc;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::kernel::{CovarianceModel, GramMatrix};
use crate::utils::{linalg, EPS};
use crate::{PathwiseError, Result};

/// A finite-dimensional Gaussian law `N(mean, covariance)` over a sorted set
/// of time points.
///
/// Laws handed out by [`GaussianProjectiveFamily`] are mean-zero; nonzero
/// means arise from [conditioning](Self::conditional).
#[derive(Debug, Clone)]
pub struct FiniteLaw {
    times: Vec<f64>,
    mean: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    cholesky: Vec<Vec<f64>>,
    tolerance: f64,
}

/// Outcome of the zero-covariance ⇒ independence check.
#[derive(Debug, Clone, Copy)]
pub struct IndependenceVerdict {
    /// Largest absolute off-diagonal covariance entry.
    pub max_off_diagonal: f64,
    /// Whether all pairwise covariances vanish to tolerance.
    pub uncorrelated: bool,
    /// Whether the coordinates are fully independent.
    ///
    /// Equal to `uncorrelated`: the law is jointly Gaussian, so vanishing
    /// covariance is equivalent to independence. This equality is the point
    /// of the verdict type; it does not hold for general laws.
    pub independent: bool,
}

impl FiniteLaw {
    /// Build a law from explicit mean and covariance.
    ///
    /// Fails if the covariance is asymmetric or not PSD to tolerance.
    pub fn new(
        times: Vec<f64>,
        mean: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        tolerance: f64,
    ) -> Result<Self> {
        let n = times.len();
        if n == 0 {
            return Err(PathwiseError::empty_input("times"));
        }
        if mean.len() != n {
            return Err(PathwiseError::DimensionMismatch {
                expected: n,
                actual: mean.len(),
            });
        }
        if covariance.len() != n {
            return Err(PathwiseError::DimensionMismatch {
                expected: n,
                actual: covariance.len(),
            });
        }
        if let Some((i, j, gap)) = linalg::symmetry_violation(&covariance, tolerance) {
            return Err(PathwiseError::invalid_kernel(format!(
                "covariance asymmetric at ({i}, {j}), gap {gap:.3e}"
            )));
        }
        let cholesky = linalg::cholesky_psd(&covariance, tolerance)?;
        Ok(Self {
            times,
            mean,
            covariance,
            cholesky,
            tolerance,
        })
    }

    /// Mean-zero law from a verified Gram matrix.
    pub fn zero_mean(gram: &GramMatrix, tolerance: f64) -> Result<Self> {
        let n = gram.dimension();
        Self::new(
            gram.times().to_vec(),
            vec![0.0; n],
            gram.entries().to_vec(),
            tolerance,
        )
    }

    /// Number of coordinates.
    pub fn dimension(&self) -> usize {
        self.times.len()
    }

    /// Time points, sorted ascending.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Mean vector.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Covariance entry.
    pub fn covariance(&self, i: usize, j: usize) -> f64 {
        self.covariance[i][j]
    }

    /// Full covariance matrix.
    pub fn covariance_matrix(&self) -> &[Vec<f64>] {
        &self.covariance
    }

    /// Draw one sample: `mean + L z` for iid standard normal `z`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let n = self.dimension();
        let z: Vec<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
        let mut x = self.mean.clone();
        for i in 0..n {
            for k in 0..=i {
                x[i] += self.cholesky[i][k] * z[k];
            }
        }
        x
    }

    /// Marginal law on a subset of coordinate indices.
    pub fn marginal(&self, indices: &[usize]) -> Result<FiniteLaw> {
        if indices.is_empty() {
            return Err(PathwiseError::empty_input("indices"));
        }
        for &i in indices {
            if i >= self.dimension() {
                return Err(PathwiseError::invalid_parameter(
                    "indices",
                    "index out of range",
                ));
            }
        }
        let times: Vec<f64> = indices.iter().map(|&i| self.times[i]).collect();
        let mean: Vec<f64> = indices.iter().map(|&i| self.mean[i]).collect();
        let cov: Vec<Vec<f64>> = indices
            .iter()
            .map(|&i| indices.iter().map(|&j| self.covariance[i][j]).collect())
            .collect();
        FiniteLaw::new(times, mean, cov, self.tolerance)
    }

    /// Conditional law of the `target` coordinates given observed values at
    /// the `observed` coordinates.
    ///
    /// Standard Gaussian conditioning: with blocks `Σ_oo`, `Σ_to`, `Σ_tt`,
    ///
    /// ```text
    /// mean = μ_t + Σ_to Σ_oo⁻¹ (y − μ_o)
    /// cov  = Σ_tt − Σ_to Σ_oo⁻¹ Σ_ot
    /// ```
    ///
    /// Degenerate observed coordinates (zero variance, e.g. time 0 under the
    /// Brownian kernel) are handled by the rank-deficient Cholesky solve.
    pub fn conditional(
        &self,
        observed: &[usize],
        values: &[f64],
        target: &[usize],
    ) -> Result<FiniteLaw> {
        if observed.len() != values.len() {
            return Err(PathwiseError::DimensionMismatch {
                expected: observed.len(),
                actual: values.len(),
            });
        }
        if target.is_empty() {
            return Err(PathwiseError::empty_input("target"));
        }
        if observed.is_empty() {
            return self.marginal(target);
        }

        let no = observed.len();
        let nt = target.len();

        let sigma_oo: Vec<Vec<f64>> = observed
            .iter()
            .map(|&i| observed.iter().map(|&j| self.covariance[i][j]).collect())
            .collect();
        let sigma_to: Vec<Vec<f64>> = target
            .iter()
            .map(|&i| observed.iter().map(|&j| self.covariance[i][j]).collect())
            .collect();
        let l_oo = linalg::cholesky_psd(&sigma_oo, self.tolerance)?;

        // Centered observations.
        let centered: Vec<f64> = observed
            .iter()
            .zip(values)
            .map(|(&i, &y)| y - self.mean[i])
            .collect();
        let w = linalg::solve_spd(&l_oo, &centered)?;

        let mut mean: Vec<f64> = target.iter().map(|&i| self.mean[i]).collect();
        for i in 0..nt {
            for k in 0..no {
                mean[i] += sigma_to[i][k] * w[k];
            }
        }

        // B[:, j] = Σ_oo⁻¹ Σ_ot[:, j]; one solve per target column.
        let mut b = vec![vec![0.0; nt]; no];
        for j in 0..nt {
            let col: Vec<f64> = (0..no).map(|k| sigma_to[j][k]).collect();
            let bj = linalg::solve_spd(&l_oo, &col)?;
            for k in 0..no {
                b[k][j] = bj[k];
            }
        }

        let mut cov = vec![vec![0.0; nt]; nt];
        for i in 0..nt {
            for j in 0..nt {
                let mut v = self.covariance[target[i]][target[j]];
                for k in 0..no {
                    v -= sigma_to[i][k] * b[k][j];
                }
                cov[i][j] = v;
            }
        }
        // Schur complements pick up tiny asymmetries from the solves.
        for i in 0..nt {
            for j in (i + 1)..nt {
                let avg = 0.5 * (cov[i][j] + cov[j][i]);
                cov[i][j] = avg;
                cov[j][i] = avg;
            }
        }

        let scale = (0..nt).map(|i| cov[i][i].abs()).fold(1.0, f64::max);
        let tol = self.tolerance.max(1e-8 * scale);
        let times: Vec<f64> = target.iter().map(|&i| self.times[i]).collect();
        FiniteLaw::new(times, mean, cov, tol)
    }

    /// Zero covariance implies independence for jointly Gaussian vectors.
    ///
    /// For a general random vector, uncorrelatedness is strictly weaker than
    /// independence. For a jointly Gaussian vector the two coincide: the
    /// joint density factorizes exactly when the covariance is diagonal, so a
    /// pairwise-vanishing covariance certifies *full* independence. The
    /// verdict records both facts so callers cannot conflate the general and
    /// Gaussian cases by accident.
    pub fn uncorrelated_implies_independent(&self, tol: f64) -> IndependenceVerdict {
        let n = self.dimension();
        let mut max_off = 0.0f64;
        for i in 0..n {
            for j in (i + 1)..n {
                max_off = max_off.max(self.covariance[i][j].abs());
            }
        }
        let uncorrelated = max_off <= tol;
        IndependenceVerdict {
            max_off_diagonal: max_off,
            uncorrelated,
            // Joint Gaussianity upgrades uncorrelated to independent.
            independent: uncorrelated,
        }
    }

    /// Monte-Carlo factorization check backing the independence lemma.
    ///
    /// Estimates `P(all coordinates below their means)` and compares it with
    /// the product of the per-coordinate probabilities. For an independent
    /// law the gap tends to zero with the sample count; a correlated law
    /// shows a persistent gap. Returns the absolute gap.
    pub fn factorization_gap<R: Rng + ?Sized>(&self, rng: &mut R, samples: usize) -> Result<f64> {
        if samples == 0 {
            return Err(PathwiseError::invalid_parameter(
                "samples",
                "must be > 0",
            ));
        }
        let n = self.dimension();
        let mut joint_hits = 0usize;
        let mut coord_hits = vec![0usize; n];
        for _ in 0..samples {
            let x = self.sample(rng);
            let mut all = true;
            for i in 0..n {
                if x[i] <= self.mean[i] {
                    coord_hits[i] += 1;
                } else {
                    all = false;
                }
            }
            if all {
                joint_hits += 1;
            }
        }
        let joint = joint_hits as f64 / samples as f64;
        let product: f64 = coord_hits
            .iter()
            .map(|&h| h as f64 / samples as f64)
            .product();
        Ok((joint - product).abs())
    }
}

/// The consistent family of mean-zero Gaussian laws induced by a covariance
/// model.
///
/// This is the explicit capability object supplying "this process is
/// Gaussian": consumers receive the family rather than resolving an ambient
/// instance.
pub struct GaussianProjectiveFamily {
    model: Arc<CovarianceModel>,
}

impl GaussianProjectiveFamily {
    /// Wrap a covariance model.
    pub fn new(model: Arc<CovarianceModel>) -> Self {
        Self { model }
    }

    /// The underlying covariance model.
    pub fn model(&self) -> &Arc<CovarianceModel> {
        &self.model
    }

    /// The mean-zero Gaussian law over a finite time subset.
    pub fn finite_law(&self, times: &[f64]) -> Result<FiniteLaw> {
        let gram = self.model.gram(times)?;
        FiniteLaw::zero_mean(&gram, self.model.tolerance())
    }

    /// Verify projective consistency: the marginal of the law over `larger`
    /// onto the times of `smaller ⊆ larger` must equal the directly built
    /// law over `smaller`.
    ///
    /// A mismatch beyond tolerance is an [`InconsistentFamily`] error and
    /// indicates a kernel/caching bug, not a numerical hiccup.
    ///
    /// [`InconsistentFamily`]: crate::PathwiseError::InconsistentFamily
    pub fn check_consistency(&self, larger: &[f64], smaller: &[f64]) -> Result<()> {
        let big = self.finite_law(larger)?;
        let small = self.finite_law(smaller)?;

        // Locate each small time inside the big law's sorted times.
        let mut indices = Vec::with_capacity(small.dimension());
        for &t in small.times() {
            let pos = big
                .times()
                .iter()
                .position(|&u| (u - t).abs() < EPS)
                .ok_or(PathwiseError::invalid_parameter(
                    "smaller",
                    "must be a subset of larger",
                ))?;
            indices.push(pos);
        }

        let marginal = big.marginal(&indices)?;
        let tol = self.model.tolerance();
        for i in 0..small.dimension() {
            for j in 0..small.dimension() {
                let expected = small.covariance(i, j);
                let actual = marginal.covariance(i, j);
                if (expected - actual).abs() > tol {
                    return Err(PathwiseError::InconsistentFamily {
                        i,
                        j,
                        expected,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }
}
