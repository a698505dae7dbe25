//! Kolmogorov extension, made operational.
//!
//! The projective limit of a consistent Gaussian family is a probability
//! measure on the full function space `T -> R`. That object is never
//! materialized. Instead a [`ProcessLaw`] realizes it operationally as
//!
//! 1. an exact finite-dimensional marginal oracle
//!    ([`ProcessLaw::marginal`]), and
//! 2. a lazily extended coordinate sampler ([`RawProcessSample`]): each new
//!    coordinate is drawn from the conditional Gaussian law given every
//!    coordinate materialized so far, which keeps the growing sample exactly
//!    consistent with the family regardless of query order.
//!
//! Cylinder events (events depending on finitely many coordinates) generate
//! the product σ-algebra; the extension's uniqueness contract is therefore
//! testable on cylinder probabilities alone, which
//! [`ProcessLaw::cylinder_probability`] estimates by Monte Carlo.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use rand::SeedableRng;

use crate::gaussian::{FiniteLaw, GaussianProjectiveFamily};
use crate::kernel::TimeDomain;
use crate::utils::time_key;
use crate::{PathwiseError, Result};

/// Builds the projective-limit law after verifying the family is consistent.
pub struct ProjectiveLimitBuilder;

impl ProjectiveLimitBuilder {
    /// Verify projective consistency on probe subsets, then hand out the law.
    ///
    /// The family's consistency is a structural property (it follows from
    /// marginalization selecting principal submatrices), so a probe failure
    /// indicates a kernel or caching bug and is fatal.
    pub fn build(family: Arc<GaussianProjectiveFamily>) -> Result<ProcessLaw> {
        let m = family.model().domain().upper();
        let chain: Vec<f64> = (0..=4).map(|i| m * i as f64 / 4.0).collect();
        family.check_consistency(&chain, &[chain[1], chain[3]])?;
        family.check_consistency(&chain, &[chain[2]])?;
        Ok(ProcessLaw { family })
    }
}

/// The probability law of the process on `T -> R`, determined by the family.
///
/// Immutable once built; restricting it to any finite time subset reproduces
/// the family's law exactly.
pub struct ProcessLaw {
    family: Arc<GaussianProjectiveFamily>,
}

impl ProcessLaw {
    /// The generating family.
    pub fn family(&self) -> &Arc<GaussianProjectiveFamily> {
        &self.family
    }

    /// The index window.
    pub fn domain(&self) -> TimeDomain {
        self.family.model().domain()
    }

    /// Exact finite-dimensional marginal (the restriction of the law).
    pub fn marginal(&self, times: &[f64]) -> Result<FiniteLaw> {
        self.family.finite_law(times)
    }

    /// A lazily extended sample path skeleton, seeded for reproducibility.
    pub fn sampler(&self, seed: u64) -> RawProcessSample {
        RawProcessSample {
            family: Arc::clone(&self.family),
            values: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Monte-Carlo probability of the cylinder event
    /// `{ lower[i] <= X(times[i]) <= upper[i] for all i }`.
    ///
    /// Two laws built from the same family produce identical estimates for
    /// identical seeds; this is the testable face of the extension's
    /// uniqueness contract.
    pub fn cylinder_probability(
        &self,
        times: &[f64],
        lower: &[f64],
        upper: &[f64],
        samples: usize,
        seed: u64,
    ) -> Result<f64> {
        if samples == 0 {
            return Err(PathwiseError::invalid_parameter("samples", "must be > 0"));
        }
        let law = self.marginal(times)?;
        let n = law.dimension();
        if lower.len() != n || upper.len() != n {
            return Err(PathwiseError::DimensionMismatch {
                expected: n,
                actual: lower.len().min(upper.len()),
            });
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut hits = 0usize;
        for _ in 0..samples {
            let x = law.sample(&mut rng);
            if x.iter()
                .enumerate()
                .all(|(i, &v)| lower[i] <= v && v <= upper[i])
            {
                hits += 1;
            }
        }
        Ok(hits as f64 / samples as f64)
    }
}

/// A single sample of the raw (not-yet-continuous) process, extended
/// coordinate by coordinate.
///
/// Coordinates already materialized are never redrawn, so every finite
/// restriction of the sample follows the family's law. Query order affects
/// the random stream (and hence the concrete numbers for a given seed) but
/// not the joint law.
pub struct RawProcessSample {
    family: Arc<GaussianProjectiveFamily>,
    // Keyed by f64 bit pattern; for non-negative times the bit order agrees
    // with numeric order, so iteration yields times ascending.
    values: BTreeMap<u64, f64>,
    rng: ChaCha8Rng,
}

impl RawProcessSample {
    /// The process value at `t`, drawing it if not yet materialized.
    pub fn value_at(&mut self, t: f64) -> Result<f64> {
        let domain = self.family.model().domain();
        if !domain.contains(t) {
            return Err(PathwiseError::OutOfDomain {
                t,
                upper: domain.upper(),
            });
        }
        let key = time_key(t);
        if let Some(&v) = self.values.get(&key) {
            return Ok(v);
        }

        let drawn = if self.values.is_empty() {
            let law = self.family.finite_law(&[t])?;
            law.sample(&mut self.rng)[0]
        } else {
            let known_times: Vec<f64> = self.values.keys().map(|&k| f64::from_bits(k)).collect();
            let known_values: Vec<f64> = self.values.values().copied().collect();

            let mut all_times = known_times.clone();
            all_times.push(t);
            let joint = self.family.finite_law(&all_times)?;

            // Locate indices inside the sorted joint law. A missing index
            // means the law dropped a coordinate it was built from.
            let locate = |u: f64| -> Result<usize> {
                joint
                    .times()
                    .iter()
                    .position(|&v| time_key(v) == time_key(u))
                    .ok_or_else(|| {
                        PathwiseError::invalid_parameter("times", "coordinate lost in joint law")
                    })
            };
            let target_idx = locate(t)?;
            let mut observed_idx = Vec::with_capacity(known_times.len());
            let mut observed_vals = Vec::with_capacity(known_times.len());
            for (kt, kv) in known_times.iter().zip(&known_values) {
                observed_idx.push(locate(*kt)?);
                observed_vals.push(*kv);
            }

            let cond = joint.conditional(&observed_idx, &observed_vals, &[target_idx])?;
            cond.sample(&mut self.rng)[0]
        };

        self.values.insert(key, drawn);
        Ok(drawn)
    }

    /// Values at several times, materializing them in the given order.
    pub fn values_at(&mut self, times: &[f64]) -> Result<Vec<f64>> {
        times.iter().map(|&t| self.value_at(t)).collect()
    }

    /// All materialized `(time, value)` pairs, times ascending.
    pub fn materialized(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .map(|(&k, &v)| (f64::from_bits(k), v))
            .collect()
    }

    /// Number of materialized coordinates.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been materialized yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
