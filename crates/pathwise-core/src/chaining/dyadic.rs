//! Dyadic grids and the refinement-sampler seam.
//!
//! The chaining engine is generic over *how* new dyadic coordinates are
//! drawn: [`DyadicSampler`] is the capability object at that seam. The
//! generic implementation ([`GaussianConditionalSampler`]) conditions on
//! everything drawn so far and works for any consistent Gaussian family;
//! [`BrownianBridgeSampler`] exploits the Markov structure of the `min`
//! kernel for O(1)-per-point midpoint refinement. Both produce the same law
//! level by level.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::projective::RawProcessSample;
use crate::{PathwiseError, Result};

/// Dyadic partition of `[0, horizon]` at resolution `2^-level`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DyadicGrid {
    level: u32,
    horizon: f64,
}

impl DyadicGrid {
    /// Grid with `2^level + 1` points over `[0, horizon]`.
    pub fn new(level: u32, horizon: f64) -> Result<Self> {
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(PathwiseError::invalid_parameter(
                "horizon",
                "must be finite and > 0",
            ));
        }
        if level > 30 {
            return Err(PathwiseError::invalid_parameter(
                "level",
                "must be <= 30",
            ));
        }
        Ok(Self { level, horizon })
    }

    /// Resolution level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Interval endpoint.
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Number of grid points, `2^level + 1`.
    pub fn num_points(&self) -> usize {
        (1usize << self.level) + 1
    }

    /// Spacing between adjacent points.
    pub fn spacing(&self) -> f64 {
        self.horizon / (1u64 << self.level) as f64
    }

    /// The i-th grid point.
    pub fn point(&self, i: usize) -> f64 {
        self.horizon * i as f64 / (1u64 << self.level) as f64
    }

    /// All grid points, ascending.
    pub fn points(&self) -> Vec<f64> {
        (0..self.num_points()).map(|i| self.point(i)).collect()
    }

    /// The next-finer grid.
    pub fn refined(&self) -> Result<DyadicGrid> {
        DyadicGrid::new(self.level + 1, self.horizon)
    }
}

/// Capability object supplying process values on dyadic grids.
///
/// Contract: `base` returns the values at the level-0 grid (the interval
/// endpoints); `refine` receives the values at level `n` and returns the
/// values at level `n + 1`, keeping every even-index value identical to the
/// coarse value it came from. Under that contract the interpolants of
/// successive levels agree at all coarser dyadic points, which is what makes
/// the limit a *modification* rather than a fresh process.
pub trait DyadicSampler {
    /// Values at the two level-0 points `{0, horizon}`.
    fn base(&mut self, grid: &DyadicGrid) -> Result<Vec<f64>>;

    /// Values at `fine` given the values at the preceding level.
    fn refine(&mut self, fine: &DyadicGrid, coarse: &[f64]) -> Result<Vec<f64>>;
}

/// Generic sampler: every new dyadic point is drawn from the conditional
/// Gaussian law given all previously drawn coordinates.
///
/// Exact for any consistent family, at the cost of dense conditioning; use
/// it for non-Markov kernels and modest levels.
pub struct GaussianConditionalSampler {
    sample: RawProcessSample,
}

impl GaussianConditionalSampler {
    /// Wrap a raw process sample.
    pub fn new(sample: RawProcessSample) -> Self {
        Self { sample }
    }

    /// The underlying raw sample (for the agrees-almost-surely contract).
    pub fn raw(&self) -> &RawProcessSample {
        &self.sample
    }
}

impl DyadicSampler for GaussianConditionalSampler {
    fn base(&mut self, grid: &DyadicGrid) -> Result<Vec<f64>> {
        self.sample.values_at(&grid.points())
    }

    fn refine(&mut self, fine: &DyadicGrid, coarse: &[f64]) -> Result<Vec<f64>> {
        let expected = (fine.num_points() - 1) / 2 + 1;
        if coarse.len() != expected {
            return Err(PathwiseError::DimensionMismatch {
                expected,
                actual: coarse.len(),
            });
        }
        // Even points are already materialized in the raw sample; value_at
        // returns them unchanged, so only midpoints draw randomness.
        self.sample.values_at(&fine.points())
    }
}

/// Midpoint-bridge sampler for the Brownian kernel.
///
/// The conditional law of `X((s+t)/2)` given `X(s)` and `X(t)` under the
/// `min` kernel is `N((X(s)+X(t))/2, (t-s)/4)`, so each refinement level
/// draws one normal per midpoint.
pub struct BrownianBridgeSampler {
    rng: ChaCha8Rng,
}

impl BrownianBridgeSampler {
    /// Seeded sampler; identical seeds reproduce identical paths.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl DyadicSampler for BrownianBridgeSampler {
    fn base(&mut self, grid: &DyadicGrid) -> Result<Vec<f64>> {
        // X(0) = 0 exactly; X(m) ~ N(0, m).
        let z: f64 = self.rng.sample(StandardNormal);
        Ok(vec![0.0, grid.horizon().sqrt() * z])
    }

    fn refine(&mut self, fine: &DyadicGrid, coarse: &[f64]) -> Result<Vec<f64>> {
        let n_fine = fine.num_points();
        let expected = (n_fine - 1) / 2 + 1;
        if coarse.len() != expected {
            return Err(PathwiseError::DimensionMismatch {
                expected,
                actual: coarse.len(),
            });
        }
        let coarse_spacing = 2.0 * fine.spacing();
        let midpoint_sd = 0.5 * coarse_spacing.sqrt();

        let mut fine_values = vec![0.0; n_fine];
        for i in 0..coarse.len() {
            fine_values[2 * i] = coarse[i];
        }
        for i in 0..coarse.len() - 1 {
            let mid = 0.5 * (coarse[i] + coarse[i + 1]);
            let z: f64 = self.rng.sample(StandardNormal);
            fine_values[2 * i + 1] = mid + midpoint_sd * z;
        }
        Ok(fine_values)
    }
}
