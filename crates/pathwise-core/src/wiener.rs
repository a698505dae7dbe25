//! Wiener measure: the pushforward of the process law onto continuous
//! functions.
//!
//! The map `ω -> (t -> Y(t, ω))` pushes the projective-limit measure forward
//! to a Borel probability measure on continuous paths. Its measurability
//! rests on a collaborator fact consumed here as an axiom: on the space of
//! continuous functions over a second-countable, locally compact domain, the
//! σ-algebra generated by the evaluation maps coincides with the Borel
//! σ-algebra of the compact-open topology. Nothing in this module re-derives
//! it; the module's own contract is that it only hands out paths produced by
//! a *certified* chaining run, so every sample genuinely lives in the
//! continuous-function space the measure is declared on.

use rayon::prelude::*;

use crate::chaining::{
    CertificateFamily, ChentsovChainingEngine, DyadicSampler, GaussianConditionalSampler,
    Modification,
};
use crate::covering::CoveringEngine;
use crate::gaussian::FiniteLaw;
use crate::projective::ProcessLaw;
use crate::Result;

/// A Borel probability measure on continuous paths over the horizon
/// interval, realized as certified path sampling plus the exact
/// finite-dimensional oracle.
///
/// Immutable once constructed.
pub struct WienerMeasure {
    law: ProcessLaw,
    covering: CoveringEngine,
    certificates: CertificateFamily,
    engine: ChentsovChainingEngine,
}

impl WienerMeasure {
    /// Push the process law forward along the continuous modification.
    ///
    /// Fails with `MomentBoundUnavailable` or `CoveringDivergent` when the
    /// engine cannot certify a continuous modification — in that case the
    /// law itself remains usable for finite-dimensional statistics, but no
    /// measure on continuous functions is claimed.
    pub fn build(
        law: ProcessLaw,
        engine: ChentsovChainingEngine,
        certificates: CertificateFamily,
        covering: CoveringEngine,
    ) -> Result<Self> {
        engine.certify(&certificates, &covering)?;
        Ok(Self {
            law,
            covering,
            certificates,
            engine,
        })
    }

    /// The underlying process law.
    pub fn law(&self) -> &ProcessLaw {
        &self.law
    }

    /// The chaining engine used for pushforward sampling.
    pub fn engine(&self) -> &ChentsovChainingEngine {
        &self.engine
    }

    /// Exact finite-dimensional marginal of the measure (evaluation maps).
    pub fn marginal(&self, times: &[f64]) -> Result<FiniteLaw> {
        self.law.marginal(times)
    }

    /// Draw one continuous path through generic Gaussian conditioning.
    ///
    /// Exact for any certified law. For the Brownian instance prefer
    /// [`sample_with`](Self::sample_with) and a
    /// [`BrownianBridgeSampler`](crate::chaining::BrownianBridgeSampler),
    /// which produces the same law at a fraction of the cost.
    pub fn sample(&self, seed: u64) -> Result<Modification> {
        let mut sampler = GaussianConditionalSampler::new(self.law.sampler(seed));
        self.sample_with(&mut sampler)
    }

    /// Draw one continuous path through a caller-supplied dyadic sampler.
    pub fn sample_with(&self, sampler: &mut dyn DyadicSampler) -> Result<Modification> {
        self.engine
            .modification(sampler, &self.certificates, &self.covering)
    }

    /// Monte-Carlo expectation of a path functional under the measure.
    ///
    /// Paths are independent (one seeded stream per index) and drawn in
    /// parallel; the functional sees the certified continuous modification.
    pub fn expect_functional<F>(&self, functional: F, paths: usize, base_seed: u64) -> Result<f64>
    where
        F: Fn(&Modification) -> f64 + Sync,
    {
        if paths == 0 {
            return Err(crate::PathwiseError::invalid_parameter(
                "paths",
                "must be > 0",
            ));
        }
        let total: f64 = (0..paths)
            .into_par_iter()
            .map(|i| {
                let path = self.sample(base_seed.wrapping_add(i as u64))?;
                Ok(functional(&path))
            })
            .collect::<Result<Vec<f64>>>()?
            .into_iter()
            .sum();
        Ok(total / paths as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brownian::BrownianAssembler;
    use crate::chaining::{ChainingConfig, KolmogorovCertificate};
    use crate::gaussian::GaussianProjectiveFamily;
    use crate::kernel::{BrownianKernel, CovarianceModel, TimeDomain};
    use crate::projective::ProjectiveLimitBuilder;
    use crate::PathwiseError;
    use std::sync::Arc;

    fn brownian_law(horizon: f64) -> ProcessLaw {
        let model = CovarianceModel::with_default_tolerance(
            Arc::new(BrownianKernel),
            TimeDomain::new(horizon).unwrap(),
        )
        .unwrap();
        let family = Arc::new(GaussianProjectiveFamily::new(Arc::new(model)));
        ProjectiveLimitBuilder::build(family).unwrap()
    }

    fn wiener(horizon: f64, level: u32) -> WienerMeasure {
        WienerMeasure::build(
            brownian_law(horizon),
            ChentsovChainingEngine::new(
                ChainingConfig::default().with_max_level(level).with_beta(0.4),
            )
            .unwrap(),
            BrownianAssembler::certificates(10).unwrap(),
            CoveringEngine::new(horizon).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_uncertifiable_law() {
        let law = brownian_law(1.0);
        let engine =
            ChentsovChainingEngine::new(ChainingConfig::default().with_beta(0.4)).unwrap();
        // Family without a positive exponent.
        let weak = crate::chaining::CertificateFamily::new(vec![
            KolmogorovCertificate::new(2.0, 0.0, 1.0).unwrap(),
        ])
        .unwrap();
        let err = WienerMeasure::build(
            law,
            engine,
            weak,
            CoveringEngine::new(1.0).unwrap(),
        );
        assert!(matches!(err, Err(PathwiseError::MomentBoundUnavailable)));
    }

    #[test]
    fn test_sampled_paths_are_continuous_and_start_at_zero() {
        let measure = wiener(1.0, 5);
        let path = measure.sample(3).unwrap();
        assert_eq!(path.evaluate(0.0).unwrap(), 0.0);
        assert!(path.max_increment_ratio(0.4).is_finite());
        assert!(path.error_bound() > 0.0);
    }

    #[test]
    fn test_marginal_matches_process_law() {
        let measure = wiener(4.0, 5);
        let law = measure.marginal(&[1.0, 3.0]).unwrap();
        assert_eq!(law.covariance(0, 1), 1.0);
        assert_eq!(law.covariance(1, 1), 3.0);
    }

    #[test]
    fn test_expect_functional_second_moment() {
        let measure = wiener(1.0, 5);
        // E Y(1)^2 = 1.
        let m2 = measure
            .expect_functional(
                |path| {
                    let y = path.evaluate(1.0).unwrap_or(f64::NAN);
                    y * y
                },
                400,
                77,
            )
            .unwrap();
        assert!((m2 - 1.0).abs() < 0.2, "E Y(1)^2 = {m2}");
    }
}
