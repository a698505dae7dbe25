//! Covering numbers for bounded time intervals and the summability check
//! that feeds the chaining bound.
//!
//! For the metric `d(s, t) = |s - t|` on `[0, m]`, the number of radius-`r`
//! balls needed to cover the interval is `ceil(m / 2r)`, so the dyadic
//! radius sequence `2^-n` gives `log N_n = O(n)`. The chaining argument
//! needs the Borel-Cantelli series
//!
//! ```text
//! sum_n  N_n * C * 2^(-n(1+alpha)) / 2^(-n*beta*p)
//! ```
//!
//! to converge; with `N_n = O(m * 2^n)` this happens exactly when
//! `beta * p < alpha`. Divergence is reported as
//! [`CoveringDivergent`](crate::PathwiseError::CoveringDivergent) rather
//! than silently producing an uncertified modification.

use serde::{Deserialize, Serialize};

use crate::chaining::KolmogorovCertificate;
use crate::{PathwiseError, Result};

/// One level of the dyadic covering: radius `2^-level` and the ball count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelCovering {
    /// Dyadic level `n`.
    pub level: u32,
    /// Ball radius `2^-n`.
    pub radius: f64,
    /// Number of balls needed at this radius.
    pub count: u64,
    /// Natural log of the count.
    pub log_count: f64,
}

/// Covering-number engine for a bounded interval `[0, length]`.
#[derive(Debug, Clone, Copy)]
pub struct CoveringEngine {
    length: f64,
}

impl CoveringEngine {
    /// Engine for the interval `[0, length]`.
    pub fn new(length: f64) -> Result<Self> {
        if !length.is_finite() || length <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "length",
                "must be finite and > 0",
            ));
        }
        Ok(Self { length })
    }

    /// Interval length.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Number of radius-`radius` balls needed to cover the interval.
    pub fn covering_number(&self, radius: f64) -> Result<u64> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "radius",
                "must be finite and > 0",
            ));
        }
        Ok((self.length / (2.0 * radius)).ceil().max(1.0) as u64)
    }

    /// The dyadic log-size sequence `(2^-n, log N_n)` for `n = 0..levels`.
    ///
    /// Radii are strictly decreasing and log sizes non-decreasing, which is
    /// the shape the chaining bound consumes.
    pub fn log_size_sequence(&self, levels: u32) -> Result<Vec<LevelCovering>> {
        (0..=levels)
            .map(|n| {
                let radius = 0.5f64.powi(n as i32);
                let count = self.covering_number(radius)?;
                Ok(LevelCovering {
                    level: n,
                    radius,
                    count,
                    log_count: (count as f64).ln(),
                })
            })
            .collect()
    }

    /// Partial sums of the chaining (Borel-Cantelli) series for a target
    /// Hölder exponent `beta`.
    ///
    /// Each term bounds `P(max increment at level n exceeds 2^(-n*beta))`
    /// via Markov's inequality on the certificate's moment bound times the
    /// covering number.
    pub fn chaining_series(
        &self,
        certificate: &KolmogorovCertificate,
        beta: f64,
        levels: u32,
    ) -> Result<Vec<f64>> {
        if !(0.0..1.0).contains(&beta) || beta <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "beta",
                "must be in (0, 1)",
            ));
        }
        let mut sums = Vec::with_capacity(levels as usize + 1);
        let mut acc = 0.0;
        for n in 0..=levels {
            let radius = 0.5f64.powi(n as i32);
            // Ball count kept in f64: deep levels overflow u64 but the
            // series terms themselves stay finite.
            let count = (self.length / (2.0 * radius)).ceil().max(1.0);
            // N_n * C * r^(1+alpha) / r^(beta p), r = 2^-n.
            let exponent = 1.0 + certificate.alpha - beta * certificate.p;
            acc += count * certificate.constant * radius.powf(exponent);
            sums.push(acc);
        }
        Ok(sums)
    }

    /// Whether the chaining series converges for this certificate and
    /// exponent: `beta * p < alpha`.
    pub fn is_summable(&self, certificate: &KolmogorovCertificate, beta: f64) -> bool {
        beta > 0.0 && beta * certificate.p < certificate.alpha
    }

    /// Summability as a hard precondition.
    pub fn check_summable(&self, certificate: &KolmogorovCertificate, beta: f64) -> Result<()> {
        if self.is_summable(certificate, beta) {
            Ok(())
        } else {
            Err(PathwiseError::CoveringDivergent {
                beta,
                ceiling: certificate.holder_ceiling(),
            })
        }
    }
}
