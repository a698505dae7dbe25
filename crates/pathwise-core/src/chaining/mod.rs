//! The Kolmogorov-Chentsov continuity upgrade via dyadic chaining.
//!
//! ## Theory
//!
//! Given a process with the moment bound `E|X_s - X_t|^p <= C |s-t|^(1+alpha)`
//! (a [`KolmogorovCertificate`]) and the covering growth of the index
//! interval, Markov's inequality bounds the probability that the maximal
//! increment over adjacent level-`n` dyadic points exceeds a threshold
//! shrinking like `2^(-n*beta)`. For `beta < alpha/p` those probabilities
//! are summable, so by Borel-Cantelli almost every sample has only finitely
//! many bad levels and the piecewise-linear dyadic interpolants converge
//! uniformly. The limit is a modification of the process: it agrees with the
//! raw sample at every dyadic time and is Hölder-`beta` continuous.
//!
//! ## Algorithm
//!
//! [`ChentsovChainingEngine::modification`] runs the construction to a
//! finite resolution: refine level by level through a [`DyadicSampler`],
//! record threshold violations in the [`BorelCantelliLedger`], and return
//! the finest interpolant together with the tail error bound
//! `sum_(n>N) K (m 2^-n)^beta`. Stopping early is the cancellation model:
//! the current interpolant with its known bound.
//!
//! The exponent bound is strict: the construction certifies every
//! `beta < alpha/p` and says nothing at the supremum itself.

pub mod dyadic;

pub use dyadic::{BrownianBridgeSampler, DyadicGrid, DyadicSampler, GaussianConditionalSampler};

use serde::{Deserialize, Serialize};

use crate::covering::CoveringEngine;
use crate::projective::RawProcessSample;
use crate::utils::EPS;
use crate::{PathwiseError, Result};

/// A moment bound `E|X_s - X_t|^p <= constant * |s-t|^(1+alpha)`.
///
/// Certifies local Hölder continuity for every exponent below
/// [`holder_ceiling`](Self::holder_ceiling)` = alpha / p`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KolmogorovCertificate {
    /// Moment order `p`.
    pub p: f64,
    /// Excess increment exponent `alpha` (continuity requires `alpha > 0`).
    pub alpha: f64,
    /// Moment constant `C`.
    pub constant: f64,
}

impl KolmogorovCertificate {
    /// Validated certificate.
    pub fn new(p: f64, alpha: f64, constant: f64) -> Result<Self> {
        if !p.is_finite() || p <= 0.0 {
            return Err(PathwiseError::invalid_parameter("p", "must be > 0"));
        }
        if !alpha.is_finite() {
            return Err(PathwiseError::invalid_parameter("alpha", "must be finite"));
        }
        if !constant.is_finite() || constant <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "constant",
                "must be > 0",
            ));
        }
        Ok(Self { p, alpha, constant })
    }

    /// The supremum of certifiable Hölder exponents, `alpha / p`.
    pub fn holder_ceiling(&self) -> f64 {
        self.alpha / self.p
    }
}

/// A family of certificates across moment orders.
///
/// Higher orders buy higher ceilings (for Brownian motion,
/// `(n-1)/(2n) -> 1/2`); the family's usable exponent is the supremum over
/// members with positive `alpha`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateFamily {
    certificates: Vec<KolmogorovCertificate>,
}

impl CertificateFamily {
    /// Family from explicit certificates.
    pub fn new(certificates: Vec<KolmogorovCertificate>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(PathwiseError::empty_input("certificates"));
        }
        Ok(Self { certificates })
    }

    /// All members.
    pub fn certificates(&self) -> &[KolmogorovCertificate] {
        &self.certificates
    }

    /// The member with the highest positive ceiling, if any.
    pub fn best(&self) -> Option<&KolmogorovCertificate> {
        self.certificates
            .iter()
            .filter(|c| c.alpha > 0.0)
            .max_by(|a, b| {
                a.holder_ceiling()
                    .partial_cmp(&b.holder_ceiling())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// The supremum of certifiable exponents.
    ///
    /// [`MomentBoundUnavailable`](crate::PathwiseError::MomentBoundUnavailable)
    /// when no member has `alpha > 0` — no continuous modification can be
    /// certified by this engine (which does not mean none exists).
    pub fn best_exponent(&self) -> Result<f64> {
        self.best()
            .map(|c| c.holder_ceiling())
            .ok_or(PathwiseError::MomentBoundUnavailable)
    }
}

/// Configuration of the chaining run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainingConfig {
    /// Finest dyadic level (resolution `2^-max_level`); the sole
    /// accuracy/cost knob of the construction.
    pub max_level: u32,
    /// Target Hölder exponent; must sit strictly below the certificate
    /// family's ceiling.
    pub beta: f64,
    /// Threshold constant `K` in the per-level bound `K * spacing^beta`.
    pub threshold_constant: f64,
}

impl Default for ChainingConfig {
    fn default() -> Self {
        Self {
            max_level: 10,
            beta: 0.4,
            threshold_constant: 4.0,
        }
    }
}

impl ChainingConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the finest level.
    pub fn with_max_level(mut self, level: u32) -> Self {
        self.max_level = level;
        self
    }

    /// Set the target exponent.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Set the threshold constant.
    pub fn with_threshold_constant(mut self, k: f64) -> Self {
        self.threshold_constant = k;
        self
    }

    /// Validate ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_level == 0 || self.max_level > 30 {
            return Err(PathwiseError::invalid_parameter(
                "max_level",
                "must be in 1..=30",
            ));
        }
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(PathwiseError::invalid_parameter(
                "beta",
                "must be in (0, 1)",
            ));
        }
        if !self.threshold_constant.is_finite() || self.threshold_constant <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "threshold_constant",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Record of which refinement levels violated their increment threshold.
///
/// Borel-Cantelli says almost every sample has finitely many bad levels; a
/// sample whose bad levels persist to the end signals either an undersized
/// threshold constant or a process rougher than its certificates claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorelCantelliLedger {
    bad_levels: Vec<u32>,
    total_levels: u32,
}

impl BorelCantelliLedger {
    /// Levels that exceeded the threshold.
    pub fn bad_levels(&self) -> &[u32] {
        &self.bad_levels
    }

    /// Number of levels run.
    pub fn total_levels(&self) -> u32 {
        self.total_levels
    }

    /// Highest bad level, if any.
    pub fn last_bad(&self) -> Option<u32> {
        self.bad_levels.last().copied()
    }

    /// Whether all levels beyond some point were good.
    pub fn eventually_good(&self) -> bool {
        self.last_bad().map_or(true, |l| l < self.total_levels)
    }
}

/// Per-sample Hölder witness: on `interval`, increments of the path obey
/// `|Y(s) - Y(t)| <= constant * |s-t|^exponent`.
///
/// Ephemeral; computed on demand from the realized path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HolderWitness {
    /// The neighborhood the bound was verified on.
    pub interval: (f64, f64),
    /// The Hölder exponent.
    pub exponent: f64,
    /// The realized constant (smallest `C` valid on the grid).
    pub constant: f64,
}

/// The continuous modification: the finest piecewise-linear dyadic
/// interpolant, plus the evidence gathered while building it.
///
/// Agrees with the raw process at every dyadic grid time by construction
/// ([`agrees_with`](Self::agrees_with) makes that contract checkable); the
/// piecewise-linear extension between grid points is the deterministic
/// continuation chosen for the remaining null set.
#[derive(Debug, Clone)]
pub struct Modification {
    times: Vec<f64>,
    values: Vec<f64>,
    level: u32,
    horizon: f64,
    beta: f64,
    error_bound: f64,
    ledger: BorelCantelliLedger,
}

impl Modification {
    /// Dyadic grid times.
    pub fn grid_times(&self) -> &[f64] {
        &self.times
    }

    /// Values at the grid times.
    pub fn grid_values(&self) -> &[f64] {
        &self.values
    }

    /// Resolution level of the grid.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Interval endpoint.
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Exponent the run was certified for.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Sup-norm bound on the distance to the fully refined limit,
    /// `sum_(n>N) K (m 2^-n)^beta`.
    pub fn error_bound(&self) -> f64 {
        self.error_bound
    }

    /// The per-level threshold ledger.
    pub fn ledger(&self) -> &BorelCantelliLedger {
        &self.ledger
    }

    /// Evaluate the path at `t` by piecewise-linear interpolation.
    pub fn evaluate(&self, t: f64) -> Result<f64> {
        if !(0.0..=self.horizon + EPS).contains(&t) {
            return Err(PathwiseError::OutOfDomain {
                t,
                upper: self.horizon,
            });
        }
        let n = self.times.len() - 1;
        let pos = (t / self.horizon * n as f64).clamp(0.0, n as f64);
        let i = (pos.floor() as usize).min(n - 1);
        let frac = pos - i as f64;
        Ok(self.values[i] * (1.0 - frac) + self.values[i + 1] * frac)
    }

    /// Largest increment ratio `|dY| / dt^beta` over adjacent grid points.
    ///
    /// The continuity tests track this across resolutions: bounded ratios
    /// under refinement are the empirical face of Hölder continuity.
    pub fn max_increment_ratio(&self, beta: f64) -> f64 {
        let dt = self.horizon / (self.times.len() - 1) as f64;
        let denom = dt.powf(beta);
        self.values
            .windows(2)
            .map(|w| (w[1] - w[0]).abs() / denom)
            .fold(0.0, f64::max)
    }

    /// Hölder witness on the window `[t - window, t + window]`, clipped to
    /// the interval.
    ///
    /// Scans all grid pairs in the window (quadratic in the window's point
    /// count), returning the smallest constant valid there for the run's
    /// exponent.
    pub fn holder_witness(&self, t: f64, window: f64) -> Result<HolderWitness> {
        if !window.is_finite() || window <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "window",
                "must be finite and > 0",
            ));
        }
        let lo = (t - window).max(0.0);
        let hi = (t + window).min(self.horizon);
        let idx: Vec<usize> = (0..self.times.len())
            .filter(|&i| self.times[i] >= lo - EPS && self.times[i] <= hi + EPS)
            .collect();
        if idx.len() < 2 {
            return Err(PathwiseError::invalid_parameter(
                "window",
                "contains fewer than two grid points",
            ));
        }
        let mut constant = 0.0f64;
        for (a, &i) in idx.iter().enumerate() {
            for &j in &idx[a + 1..] {
                let dt = self.times[j] - self.times[i];
                if dt < EPS {
                    continue;
                }
                let ratio = (self.values[j] - self.values[i]).abs() / dt.powf(self.beta);
                constant = constant.max(ratio);
            }
        }
        Ok(HolderWitness {
            interval: (lo, hi),
            exponent: self.beta,
            constant,
        })
    }

    /// Check the modification contract `Y(t) = X(t)` at every time the raw
    /// sample has materialized on this grid.
    pub fn agrees_with(&self, raw: &RawProcessSample, tol: f64) -> bool {
        raw.materialized().iter().all(|&(t, x)| {
            match self.evaluate(t) {
                Ok(y) => (y - x).abs() <= tol,
                // Times outside the chaining window are not part of the
                // contract.
                Err(_) => true,
            }
        })
    }
}

/// The chaining engine: turns moment certificates plus covering data into a
/// continuous modification.
#[derive(Debug, Clone)]
pub struct ChentsovChainingEngine {
    config: ChainingConfig,
}

impl ChentsovChainingEngine {
    /// Engine with a validated configuration.
    pub fn new(config: ChainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration.
    pub fn config(&self) -> &ChainingConfig {
        &self.config
    }

    /// Verify this engine can certify continuity for the given certificates
    /// and covering data; returns the certificate ceiling.
    pub fn certify(
        &self,
        certificates: &CertificateFamily,
        covering: &CoveringEngine,
    ) -> Result<f64> {
        let best = certificates.best().ok_or(PathwiseError::MomentBoundUnavailable)?;
        covering.check_summable(best, self.config.beta)?;
        Ok(best.holder_ceiling())
    }

    /// Run the dyadic chaining construction to the configured resolution.
    pub fn modification(
        &self,
        sampler: &mut dyn DyadicSampler,
        certificates: &CertificateFamily,
        covering: &CoveringEngine,
    ) -> Result<Modification> {
        self.certify(certificates, covering)?;

        let horizon = covering.length();
        let beta = self.config.beta;
        let k = self.config.threshold_constant;

        let mut grid = DyadicGrid::new(0, horizon)?;
        let mut values = sampler.base(&grid)?;
        if values.len() != grid.num_points() {
            return Err(PathwiseError::DimensionMismatch {
                expected: grid.num_points(),
                actual: values.len(),
            });
        }

        let mut bad_levels = Vec::new();
        for level in 1..=self.config.max_level {
            let fine = grid.refined()?;
            values = sampler.refine(&fine, &values)?;
            if values.len() != fine.num_points() {
                return Err(PathwiseError::DimensionMismatch {
                    expected: fine.num_points(),
                    actual: values.len(),
                });
            }
            grid = fine;

            let threshold = k * grid.spacing().powf(beta);
            let max_increment = values
                .windows(2)
                .map(|w| (w[1] - w[0]).abs())
                .fold(0.0, f64::max);
            if max_increment > threshold {
                bad_levels.push(level);
            }
        }

        // Tail of the threshold series past the final level.
        let q = 0.5f64.powf(beta);
        let n = self.config.max_level;
        let error_bound = k * horizon.powf(beta) * q.powi(n as i32 + 1) / (1.0 - q);

        Ok(Modification {
            times: grid.points(),
            values,
            level: n,
            horizon,
            beta,
            error_bound,
            ledger: BorelCantelliLedger {
                bad_levels,
                total_levels: n,
            },
        })
    }
}
