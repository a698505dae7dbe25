//! Covariance kernels and the PSD-checked Gram matrix cache.
//!
//! A [`CovarianceModel`] owns a symmetric positive-semidefinite kernel
//! `k(s, t)` over a bounded time window `[0, m]` and hands out Gram matrices
//! for finite time subsets. Every fresh matrix is verified (exact symmetry of
//! the evaluated kernel, minimum eigenvalue above `-tolerance`) before it
//! enters the cache; a violation is an [`InvalidKernel`] error, surfaced
//! immediately, never clamped.
//!
//! Gram matrices are compute-once, read-many values shared behind `Arc`, so
//! independent samplers can consume them concurrently without copies.
//!
//! [`InvalidKernel`]: crate::PathwiseError::InvalidKernel

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::utils::{linalg, normalize_times, time_key, PSD_TOL};
use crate::{PathwiseError, Result};

/// A covariance function `k : T x T -> R`.
///
/// Implementations must be symmetric and positive semidefinite on every
/// finite subset of the domain; [`CovarianceModel`] verifies this numerically
/// on each Gram matrix it builds.
pub trait CovarianceKernel: Send + Sync {
    /// Evaluate `k(s, t)`.
    fn evaluate(&self, s: f64, t: f64) -> f64;

    /// Human-readable kernel name for diagnostics.
    fn name(&self) -> &'static str {
        "kernel"
    }
}

/// The Brownian covariance `k(s, t) = min(s, t)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrownianKernel;

impl CovarianceKernel for BrownianKernel {
    #[inline]
    fn evaluate(&self, s: f64, t: f64) -> f64 {
        s.min(t)
    }

    fn name(&self) -> &'static str {
        "brownian-min"
    }
}

/// A kernel defined by an arbitrary closure.
///
/// Used for non-Brownian Gaussian families and for exercising the PSD
/// rejection path in tests.
pub struct FnKernel<F> {
    f: F,
    name: &'static str,
}

impl<F> FnKernel<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    /// Wrap a closure as a covariance kernel.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { f, name }
    }
}

impl<F> CovarianceKernel for FnKernel<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    #[inline]
    fn evaluate(&self, s: f64, t: f64) -> f64 {
        (self.f)(s, t)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// The index window `[0, upper]` of the process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDomain {
    upper: f64,
}

impl TimeDomain {
    /// Create a bounded time window `[0, upper]`.
    pub fn new(upper: f64) -> Result<Self> {
        if !upper.is_finite() || upper <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "upper",
                "must be finite and > 0",
            ));
        }
        Ok(Self { upper })
    }

    /// Upper end of the window.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Window length.
    pub fn length(&self) -> f64 {
        self.upper
    }

    /// Whether `t` lies in `[0, upper]`.
    pub fn contains(&self, t: f64) -> bool {
        t.is_finite() && (0.0..=self.upper).contains(&t)
    }
}

/// A verified Gram matrix over a sorted finite time subset.
#[derive(Debug, Clone)]
pub struct GramMatrix {
    times: Vec<f64>,
    entries: Vec<Vec<f64>>,
    min_eigenvalue: f64,
}

impl GramMatrix {
    /// The (sorted, deduplicated) time points this matrix covers.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of time points.
    pub fn dimension(&self) -> usize {
        self.times.len()
    }

    /// Entry `k(times[i], times[j])`.
    pub fn entry(&self, i: usize, j: usize) -> f64 {
        self.entries[i][j]
    }

    /// Full entry matrix.
    pub fn entries(&self) -> &[Vec<f64>] {
        &self.entries
    }

    /// Smallest eigenvalue found during verification.
    pub fn min_eigenvalue(&self) -> f64 {
        self.min_eigenvalue
    }

    /// Submatrix over a subset of row/column indices (marginalization).
    pub fn submatrix(&self, indices: &[usize]) -> Result<GramMatrix> {
        for &i in indices {
            if i >= self.dimension() {
                return Err(PathwiseError::invalid_parameter(
                    "indices",
                    "index out of range",
                ));
            }
        }
        let times: Vec<f64> = indices.iter().map(|&i| self.times[i]).collect();
        let entries: Vec<Vec<f64>> = indices
            .iter()
            .map(|&i| indices.iter().map(|&j| self.entries[i][j]).collect())
            .collect();
        // A principal submatrix of a PSD matrix is PSD; its smallest
        // eigenvalue is at least the parent's.
        Ok(GramMatrix {
            times,
            entries,
            min_eigenvalue: self.min_eigenvalue,
        })
    }
}

/// Covariance model: kernel + domain + PSD verification + Gram cache.
pub struct CovarianceModel {
    kernel: Arc<dyn CovarianceKernel>,
    domain: TimeDomain,
    tolerance: f64,
    cache: RwLock<HashMap<Vec<u64>, Arc<GramMatrix>>>,
}

impl CovarianceModel {
    /// Build a model, validating the kernel on a probe grid immediately.
    ///
    /// The probe catches blatantly invalid kernels at construction time; each
    /// later [`gram`](Self::gram) call re-verifies its own matrix, so the
    /// guarantee covers exactly the subsets actually used.
    pub fn new(kernel: Arc<dyn CovarianceKernel>, domain: TimeDomain, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "tolerance",
                "must be finite and > 0",
            ));
        }
        let model = Self {
            kernel,
            domain,
            tolerance,
            cache: RwLock::new(HashMap::new()),
        };
        let probe: Vec<f64> = (0..=8)
            .map(|i| domain.upper() * i as f64 / 8.0)
            .collect();
        model.gram(&probe)?;
        Ok(model)
    }

    /// Model with the default PSD tolerance.
    pub fn with_default_tolerance(
        kernel: Arc<dyn CovarianceKernel>,
        domain: TimeDomain,
    ) -> Result<Self> {
        Self::new(kernel, domain, PSD_TOL)
    }

    /// The time window.
    pub fn domain(&self) -> TimeDomain {
        self.domain
    }

    /// PSD / consistency tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Kernel name for diagnostics.
    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }

    /// `k(t, t)`.
    pub fn variance(&self, t: f64) -> Result<f64> {
        self.covariance(t, t)
    }

    /// `k(s, t)` with domain checking.
    pub fn covariance(&self, s: f64, t: f64) -> Result<f64> {
        for &u in &[s, t] {
            if !self.domain.contains(u) {
                return Err(PathwiseError::OutOfDomain {
                    t: u,
                    upper: self.domain.upper(),
                });
            }
        }
        Ok(self.kernel.evaluate(s, t))
    }

    /// Verified Gram matrix over a finite time subset, cached by the
    /// (unordered) set of times.
    pub fn gram(&self, times: &[f64]) -> Result<Arc<GramMatrix>> {
        let times = normalize_times(times)?;
        for &t in &times {
            if !self.domain.contains(t) {
                return Err(PathwiseError::OutOfDomain {
                    t,
                    upper: self.domain.upper(),
                });
            }
        }
        let key: Vec<u64> = times.iter().map(|&t| time_key(t)).collect();

        if let Some(hit) = self.cache.read().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let gram = Arc::new(self.build_gram(times)?);
        self.cache.write().insert(key, Arc::clone(&gram));
        Ok(gram)
    }

    /// Number of distinct Gram matrices currently cached.
    pub fn cached_grams(&self) -> usize {
        self.cache.read().len()
    }

    fn build_gram(&self, times: Vec<f64>) -> Result<GramMatrix> {
        let n = times.len();
        let mut entries = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let v = self.kernel.evaluate(times[i], times[j]);
                if !v.is_finite() {
                    return Err(PathwiseError::invalid_kernel(format!(
                        "non-finite value at ({}, {})",
                        times[i], times[j]
                    )));
                }
                let v_sym = self.kernel.evaluate(times[j], times[i]);
                if (v - v_sym).abs() > self.tolerance {
                    return Err(PathwiseError::invalid_kernel(format!(
                        "asymmetric at ({}, {}): {v} vs {v_sym}",
                        times[i], times[j]
                    )));
                }
                entries[i][j] = v;
                entries[j][i] = v;
            }
        }

        let min_eig = linalg::min_eigenvalue(&entries)?;
        if min_eig < -self.tolerance {
            return Err(PathwiseError::invalid_kernel(format!(
                "Gram matrix over {n} points has eigenvalue {min_eig:.3e} below -{:.1e}",
                self.tolerance
            )));
        }

        Ok(GramMatrix {
            times,
            entries,
            min_eigenvalue: min_eig,
        })
    }
}
