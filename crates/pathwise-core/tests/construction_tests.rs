//! End-to-end tests for the Brownian construction: covariance structure,
//! projective consistency, moment laws, path continuity, independent
//! increments, and the Wiener-measure pushforward.

use std::sync::Arc;

use pathwise_core::{
    BrownianAssembler, BrownianKernel, CertificateFamily, ChainingConfig, ChentsovChainingEngine,
    CovarianceModel, CoveringEngine, FnKernel, GaussianProjectiveFamily,
    IncrementIndependenceChecker, KolmogorovCertificate, PathwiseError, ProjectiveLimitBuilder,
    TimeDomain, WienerMeasure,
};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

fn brownian(horizon: f64, level: u32, beta: f64) -> BrownianAssembler {
    BrownianAssembler::new(
        horizon,
        ChainingConfig::default()
            .with_max_level(level)
            .with_beta(beta),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Covariance model and projective family
// ---------------------------------------------------------------------------

#[test]
fn test_brownian_covariance_exact() {
    let bm = brownian(10.0, 6, 0.4);
    for &(s, t) in &[(0.0, 0.0), (0.5, 2.0), (2.0, 5.0), (9.0, 9.0), (7.5, 3.25)] {
        assert_eq!(bm.covariance(s, t).unwrap(), s.min(t));
        assert_eq!(bm.covariance(t, s).unwrap(), s.min(t));
    }
}

#[test]
fn test_gram_matrices_psd() {
    let model = CovarianceModel::with_default_tolerance(
        Arc::new(BrownianKernel),
        TimeDomain::new(10.0).unwrap(),
    )
    .unwrap();
    for times in [
        vec![0.0, 1.0, 2.0],
        vec![0.25, 0.5, 0.75, 1.0, 5.0, 9.75],
        vec![3.0],
    ] {
        let gram = model.gram(&times).unwrap();
        assert!(gram.min_eigenvalue() >= -1e-9, "times {times:?}");
    }
}

#[test]
fn test_projective_consistency_across_subsets() {
    let model = CovarianceModel::with_default_tolerance(
        Arc::new(BrownianKernel),
        TimeDomain::new(10.0).unwrap(),
    )
    .unwrap();
    let family = GaussianProjectiveFamily::new(Arc::new(model));
    family
        .check_consistency(&[0.0, 0.5, 1.0, 2.0, 5.0, 8.0], &[0.5, 2.0, 8.0])
        .unwrap();
    family
        .check_consistency(&[1.0, 2.0, 3.0, 4.0], &[2.0])
        .unwrap();
}

// ---------------------------------------------------------------------------
// End-to-end scenario: [0, 10], fine resolution, batch statistics
// ---------------------------------------------------------------------------

#[test]
fn test_end_to_end_three_fine_paths() {
    let bm = brownian(10.0, 12, 0.44);
    for seed in [1u64, 2, 3] {
        let path = bm.sample_path(seed).unwrap();
        // No increment exceeds C * spacing^0.49 for a fixed C.
        let ratio = path.max_increment_ratio(0.49);
        assert!(ratio < 8.0, "seed {seed}: increment ratio {ratio}");
        // Every path starts at zero.
        assert_eq!(path.evaluate(0.0).unwrap(), 0.0);
        assert_eq!(path.grid_times().len(), 4097);
    }
}

#[test]
fn test_end_to_end_batch_statistics() {
    let bm = brownian(10.0, 6, 0.4);
    let paths = bm.sample_paths(10_000, 500).unwrap();
    let n = paths.len() as f64;

    // Empirical Cov(Y(2), Y(5)) ~ min(2, 5) = 2.
    let (mut s2, mut s5, mut s25) = (0.0, 0.0, 0.0);
    for path in &paths {
        let y2 = path.evaluate(2.0).unwrap();
        let y5 = path.evaluate(5.0).unwrap();
        s2 += y2;
        s5 += y5;
        s25 += y2 * y5;
    }
    let cov = s25 / n - (s2 / n) * (s5 / n);
    assert!(approx_eq(cov, 2.0, 0.2), "Cov(Y(2), Y(5)) = {cov}");

    // Point laws: Y(t) ~ Normal(0, t) for t in {0.5, 1, 3}.
    for &t in &[0.5, 1.0, 3.0] {
        let (mut m1, mut m2) = (0.0, 0.0);
        for path in &paths {
            let y = path.evaluate(t).unwrap();
            m1 += y;
            m2 += y * y;
        }
        let mean = m1 / n;
        let var = m2 / n - mean * mean;
        assert!(approx_eq(mean, 0.0, 0.06), "t = {t}: mean {mean}");
        assert!(approx_eq(var, t, 0.1 + 0.05 * t), "t = {t}: var {var}");
    }

    // Moment law for the increment Y(3) - Y(1):
    // E d^2 = 2, E d^4 = 3 * 2^2 = 12.
    let (mut m2, mut m4) = (0.0, 0.0);
    for path in &paths {
        let d = path.evaluate(3.0).unwrap() - path.evaluate(1.0).unwrap();
        m2 += d * d;
        m4 += d.powi(4);
    }
    let m2 = m2 / n;
    let m4 = m4 / n;
    assert!(approx_eq(m2, 2.0, 0.2), "E d^2 = {m2}");
    assert!(approx_eq(m4, 12.0, 2.0), "E d^4 = {m4}");

    // Disjoint increments are empirically uncorrelated.
    let corr = IncrementIndependenceChecker::empirical_increment_correlation(
        &paths,
        (0.0, 1.0),
        (2.0, 3.0),
    )
    .unwrap();
    assert!(corr.abs() < 0.05, "increment correlation = {corr}");
}

// ---------------------------------------------------------------------------
// Continuity under refinement
// ---------------------------------------------------------------------------

#[test]
fn test_increment_ratio_bounded_under_refinement() {
    // The ratio |dY| / dt^0.49 must stay bounded as resolution increases;
    // divergence would contradict the certified Hölder continuity.
    for level in [6u32, 8, 10, 12] {
        let bm = brownian(10.0, level, 0.44);
        let path = bm.sample_path(7).unwrap();
        let ratio = path.max_increment_ratio(0.49);
        assert!(ratio < 8.0, "level {level}: ratio {ratio}");
    }
}

#[test]
fn test_holder_witness_on_sampled_path() {
    let bm = brownian(10.0, 10, 0.4);
    let path = bm.sample_path(11).unwrap();
    let witness = path.holder_witness(5.0, 0.2).unwrap();
    assert_eq!(witness.exponent, 0.4);
    assert!(witness.constant.is_finite());
    assert!(witness.constant > 0.0);
}

#[test]
fn test_error_bound_tracks_resolution() {
    let coarse = brownian(10.0, 6, 0.4).sample_path(1).unwrap();
    let fine = brownian(10.0, 12, 0.4).sample_path(1).unwrap();
    assert!(fine.error_bound() < coarse.error_bound());
}

// ---------------------------------------------------------------------------
// Independent increments
// ---------------------------------------------------------------------------

#[test]
fn test_independent_increments_analytic() {
    let model = CovarianceModel::with_default_tolerance(
        Arc::new(BrownianKernel),
        TimeDomain::new(10.0).unwrap(),
    )
    .unwrap();
    let checker = IncrementIndependenceChecker::new(Arc::new(model));
    let verdict = checker.verdict(&[0.0, 1.0, 2.0, 3.0, 7.5]).unwrap();
    assert!(verdict.uncorrelated);
    // Jointly Gaussian + uncorrelated: independence follows, and the
    // verdict says so explicitly.
    assert!(verdict.independent);
}

// ---------------------------------------------------------------------------
// Wiener measure
// ---------------------------------------------------------------------------

#[test]
fn test_wiener_measure_pushforward() {
    let model = CovarianceModel::with_default_tolerance(
        Arc::new(BrownianKernel),
        TimeDomain::new(2.0).unwrap(),
    )
    .unwrap();
    let family = Arc::new(GaussianProjectiveFamily::new(Arc::new(model)));
    let law = ProjectiveLimitBuilder::build(family).unwrap();
    let measure = WienerMeasure::build(
        law,
        ChentsovChainingEngine::new(ChainingConfig::default().with_max_level(5).with_beta(0.4))
            .unwrap(),
        BrownianAssembler::certificates(10).unwrap(),
        CoveringEngine::new(2.0).unwrap(),
    )
    .unwrap();

    // Marginal oracle is exact.
    let marginal = measure.marginal(&[0.5, 2.0]).unwrap();
    assert_eq!(marginal.covariance(0, 1), 0.5);

    // Sampled paths are continuous modifications starting at zero.
    let path = measure.sample(4).unwrap();
    assert_eq!(path.evaluate(0.0).unwrap(), 0.0);
    assert!(path.error_bound() > 0.0);
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn test_non_psd_kernel_rejected() {
    let kernel = Arc::new(FnKernel::new("anti", |s: f64, t: f64| {
        if (s - t).abs() < 1e-12 {
            1.0
        } else {
            -0.9
        }
    }));
    // Not PSD on 3+ points: eigenvalue 1 - 2 * 0.9 < 0.
    let err = CovarianceModel::with_default_tolerance(kernel, TimeDomain::new(1.0).unwrap());
    assert!(matches!(err, Err(PathwiseError::InvalidKernel { .. })));
}

#[test]
fn test_divergent_beta_rejected() {
    // Certificate ceiling for orders up to 10 is 0.45; asking for more must
    // fail as CoveringDivergent, leaving the raw law usable.
    let err = BrownianAssembler::new(
        10.0,
        ChainingConfig::default().with_max_level(6).with_beta(0.46),
    );
    assert!(matches!(err, Err(PathwiseError::CoveringDivergent { .. })));
}

#[test]
fn test_moment_bound_unavailable_surfaces() {
    let fam = CertificateFamily::new(vec![
        KolmogorovCertificate::new(2.0, 0.0, 1.0).unwrap(),
        KolmogorovCertificate::new(4.0, -1.0, 1.0).unwrap(),
    ])
    .unwrap();
    assert!(matches!(
        fam.best_exponent(),
        Err(PathwiseError::MomentBoundUnavailable)
    ));
}

// ---------------------------------------------------------------------------
// Serialization of certificates and configuration
// ---------------------------------------------------------------------------

#[test]
fn test_certificate_and_config_round_trip_json() {
    let fam = BrownianAssembler::certificates(5).unwrap();
    let json = serde_json::to_string(&fam).unwrap();
    let back: CertificateFamily = serde_json::from_str(&json).unwrap();
    assert_eq!(
        back.best_exponent().unwrap(),
        fam.best_exponent().unwrap()
    );

    let config = ChainingConfig::default().with_max_level(8).with_beta(0.3);
    let json = serde_json::to_string(&config).unwrap();
    let back: ChainingConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

// ---------------------------------------------------------------------------
// Property-based invariants
// ---------------------------------------------------------------------------

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_gram_symmetric_psd(
            times in proptest::collection::vec(0.01f64..10.0, 1..8)
        ) {
            let model = CovarianceModel::with_default_tolerance(
                Arc::new(BrownianKernel),
                TimeDomain::new(10.0).unwrap(),
            )
            .unwrap();
            let gram = model.gram(&times).unwrap();
            let n = gram.dimension();
            for i in 0..n {
                for j in 0..n {
                    prop_assert!((gram.entry(i, j) - gram.entry(j, i)).abs() < 1e-12);
                }
            }
            prop_assert!(gram.min_eigenvalue() >= -1e-9);
        }

        #[test]
        fn prop_marginal_consistency(
            times in proptest::collection::vec(0.01f64..10.0, 3..8),
            keep in proptest::collection::vec(any::<bool>(), 8)
        ) {
            let model = CovarianceModel::with_default_tolerance(
                Arc::new(BrownianKernel),
                TimeDomain::new(10.0).unwrap(),
            )
            .unwrap();
            let family = GaussianProjectiveFamily::new(Arc::new(model));

            let larger = family.finite_law(&times).unwrap();
            let subset: Vec<f64> = larger
                .times()
                .iter()
                .enumerate()
                .filter(|(i, _)| keep[*i % keep.len()])
                .map(|(_, &t)| t)
                .collect();
            prop_assume!(!subset.is_empty());

            family.check_consistency(larger.times(), &subset).unwrap();
        }
    }
}
