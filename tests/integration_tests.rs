//! Integration tests for the fitting engine and the high-level API.
//!
//! Data sets are synthetic and generated from seeded RNGs, so every run is
//! reproducible.

use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use robust_fit::core::consensus_error;
use robust_fit::refine::{HomographyRefiner, TransferError};
use robust_fit::residuals::{DistanceResidual, ModelResidual};
use robust_fit::samplers::UniformSampler;
use robust_fit::scoring::{ModelPredicateClassifier, ThresholdClassifier};
use robust_fit::stopping::{required_iterations, AdaptiveConfidence, BestFit, PercentageInliers};
use robust_fit::utils::transform_point;
use robust_fit::*;

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn ground_truth_homography() -> Matrix3<f64> {
    Matrix3::new(1.05, 0.02, 12.0, -0.03, 0.98, -7.0, 1e-5, 2e-5, 1.0)
}

/// `n` correspondences under `h`; the first `n * (1 - outlier_fraction)` are
/// inliers with Gaussian noise `sigma`, the rest are uniform outliers.
fn homography_data(
    h: &Matrix3<f64>,
    n: usize,
    outlier_fraction: f64,
    sigma: f64,
    seed: u64,
) -> (Vec<Point2>, Vec<Point2>, usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_inliers = ((1.0 - outlier_fraction) * n as f64).round() as usize;
    let mut points1 = Vec::with_capacity(n);
    let mut points2 = Vec::with_capacity(n);
    for i in 0..n {
        let p = Point2::new(rng.gen_range(0.0..500.0), rng.gen_range(0.0..500.0));
        let q = if i < n_inliers {
            let q = transform_point(h, &p);
            Point2::new(q.x + sigma * gaussian(&mut rng), q.y + sigma * gaussian(&mut rng))
        } else {
            Point2::new(rng.gen_range(0.0..500.0), rng.gen_range(0.0..500.0))
        };
        points1.push(p);
        points2.push(q);
    }
    (points1, points2, n_inliers)
}

#[test]
fn test_homography_recovery_with_outliers() {
    let _ = env_logger::builder().is_test(true).try_init();

    let sigma = 0.5;
    let truth = ground_truth_homography();
    let (points1, points2, n_inliers) = homography_data(&truth, 200, 0.3, sigma, 2024);

    let settings = RansacSettings::default().with_seed(5);
    let result = estimate_homography(&points1, &points2, 4.0 * sigma, Some(settings)).unwrap();

    assert!(result.success, "status: {:?}", result.status);
    assert!(
        result.inliers.len() as f64 >= 0.9 * n_inliers as f64,
        "only {} of {} inliers recovered",
        result.inliers.len(),
        n_inliers
    );

    let data = types::zip_correspondences(&points1, &points2).unwrap();
    let mean_residual = consensus_error(&ModelResidual, &result.model, &data, &result.inliers)
        / result.inliers.len() as f64;
    assert!(mean_residual <= 3.0 * sigma, "mean residual {}", mean_residual);

    // The recovered transform agrees with the truth across the image.
    for &(x, y) in &[(0.0, 0.0), (500.0, 0.0), (0.0, 500.0), (250.0, 250.0), (500.0, 500.0)] {
        let p = Point2::new(x, y);
        let d = (result.model.predict(&p) - transform_point(&truth, &p)).norm();
        assert!(d < 2.0, "transfer discrepancy {} at ({}, {})", d, x, y);
    }
}

#[test]
fn test_exact_data_stops_after_one_iteration() {
    let truth = ground_truth_homography();
    let (points1, points2, _) = homography_data(&truth, 50, 0.0, 0.0, 7);

    let settings = RansacSettings::default().with_seed(1);
    let result = estimate_homography(&points1, &points2, 1e-6, Some(settings)).unwrap();

    assert!(result.success);
    assert_eq!(result.status, FitStatus::Converged);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.inliers, (0..50).collect::<Vec<_>>());
}

/// Uniform sampler that keeps every sample it draws.
struct Recording {
    inner: UniformSampler,
    draws: Vec<Vec<usize>>,
}

impl Sampler for Recording {
    fn draw(&mut self, n: usize, out: &mut [usize]) -> bool {
        let drawn = self.inner.draw(n, out);
        self.draws.push(out.to_vec());
        drawn
    }
}

#[test]
fn test_noisy_zero_outliers_stop_once_first_hypothesis_suffices() {
    let _ = env_logger::builder().is_test(true).try_init();

    let sigma = 0.5;
    let (points1, points2, _) = homography_data(&ground_truth_homography(), 100, 0.0, sigma, 41);
    let data = types::zip_correspondences(&points1, &points2).unwrap();
    let n = data.len();

    for threshold in [3.0 * sigma, 10.0 * sigma] {
        for seed in 0..10 {
            let sampler = Recording {
                inner: UniformSampler::from_seed(seed),
                draws: Vec::new(),
            };
            let mut ransac = Ransac::new(
                RansacSettings::default(),
                HomographyModel::new(),
                sampler,
                ModelResidual,
                ThresholdClassifier::new(threshold),
                AdaptiveConfidence::new(0.99),
            );
            let result = ransac.run(&data);

            assert!(result.success);
            assert_eq!(result.status, FitStatus::Converged);
            assert!(
                result.inliers.len() >= 85,
                "threshold {}, seed {}: {} inliers",
                threshold,
                seed,
                result.inliers.len()
            );

            // Replay the first hypothesis; one iteration suffices exactly when
            // its inlier ratio already meets the confidence bound.
            let model = HomographyModel::new();
            let first_sample = ransac
                .sampler
                .draws
                .iter()
                .find(|sample| !model.is_degenerate(&data, sample))
                .unwrap();
            let mut first = model.clone();
            let first_inliers = match first.estimate(&data, first_sample) {
                Ok(()) => data.iter().filter(|c| first.compute_error(c) <= threshold).count(),
                Err(_) => 0,
            };
            let one_iteration_suffices =
                required_iterations(first_inliers as f64 / n as f64, 4, 0.99) <= 1;
            assert_eq!(
                result.iterations == 1,
                one_iteration_suffices,
                "threshold {}, seed {}: {} iterations, first hypothesis had {}/{} inliers",
                threshold,
                seed,
                result.iterations,
                first_inliers,
                n
            );
        }
    }
}

#[test]
fn test_identical_seeds_are_deterministic() {
    let (points1, points2, _) = homography_data(&ground_truth_homography(), 120, 0.4, 0.5, 99);
    let settings = RansacSettings::default().with_seed(1234);

    let first = estimate_homography(&points1, &points2, 2.0, Some(settings.clone())).unwrap();
    let second = estimate_homography(&points1, &points2, 2.0, Some(settings)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_refinement_never_increases_consensus_error() {
    let (points1, points2, _) = homography_data(&ground_truth_homography(), 150, 0.3, 0.8, 31);
    let data = types::zip_correspondences(&points1, &points2).unwrap();

    for seed in 0..5 {
        let base = RansacSettings::default().with_seed(seed);
        let raw = estimate_homography(&points1, &points2, 3.0, Some(base.clone().with_refine(false)))
            .unwrap();
        let refined =
            estimate_homography(&points1, &points2, 3.0, Some(base.with_refine(true))).unwrap();

        let before = consensus_error(&ModelResidual, &raw.model, &data, &raw.inliers);
        let after = consensus_error(&ModelResidual, &refined.model, &data, &raw.inliers);
        assert!(after <= before, "seed {}: {} -> {}", seed, before, after);
        assert_eq!(raw.iterations, refined.iterations);
    }
}

#[test]
fn test_nonlinear_refinement_through_driver() {
    let (points1, points2, _) = homography_data(&ground_truth_homography(), 150, 0.3, 0.8, 77);
    let data = types::zip_correspondences(&points1, &points2).unwrap();

    let raw = Ransac::new(
        RansacSettings::default().with_refine(false),
        HomographyModel::new(),
        UniformSampler::from_seed(9),
        ModelResidual,
        ThresholdClassifier::new(3.0),
        AdaptiveConfidence::new(0.99),
    )
    .run(&data);
    assert!(raw.success);

    for error in [TransferError::Forward, TransferError::Inverse, TransferError::Symmetric] {
        let refined = Ransac::new(
            RansacSettings::default(),
            HomographyModel::new(),
            UniformSampler::from_seed(9),
            ModelResidual,
            ThresholdClassifier::new(3.0),
            AdaptiveConfidence::new(0.99),
        )
        .with_refiner(HomographyRefiner::new(error))
        .run(&data);

        assert!(refined.success);
        assert_eq!(refined.iterations, raw.iterations);

        let before = consensus_error(&ModelResidual, &raw.model, &data, &raw.inliers);
        let after = consensus_error(&ModelResidual, &refined.model, &data, &raw.inliers);
        assert!(after <= before, "{:?}: {} -> {}", error, before, after);
    }
}

#[test]
fn test_collinear_points_exhaust_sampling() {
    let points1: Vec<Point2> = (0..20).map(|i| Point2::new(i as f64, 2.0 * i as f64 + 1.0)).collect();
    let points2: Vec<Point2> = points1.iter().map(|p| Point2::new(p.x + 3.0, p.y)).collect();

    let settings = RansacSettings::default().with_seed(3);
    let result = estimate_homography(&points1, &points2, 1.0, Some(settings)).unwrap();

    assert!(!result.success);
    assert_eq!(result.status, FitStatus::SamplingExhausted { retries: 250 });
    assert_eq!(result.error(), Some(FitError::SamplingExhausted { retries: 250 }));
    assert!(result.inliers.is_empty());
    assert_eq!(result.model, HomographyModel::new());
}

#[test]
fn test_ninety_degree_rotation() {
    let mut rng = StdRng::seed_from_u64(90);
    let points1: Vec<Point2> = (0..30)
        .map(|_| Point2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)))
        .collect();
    let points2: Vec<Point2> = points1.iter().map(|p| Point2::new(-p.y, p.x)).collect();

    let settings = RansacSettings::default().with_seed(8);
    let result = estimate_homography(&points1, &points2, 1e-6, Some(settings)).unwrap();

    let rotation = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
    assert!(result.success);
    assert_relative_eq!(*result.model.matrix(), rotation, epsilon = 1e-9);
    for (p, q) in points1.iter().zip(&points2) {
        assert!((result.model.predict(p) - q).norm() < 1e-6);
    }
}

#[test]
fn test_ninety_degree_rotation_from_four_points() {
    let points1 = [
        Point2::new(1.0, 1.0),
        Point2::new(4.0, 1.0),
        Point2::new(4.0, 3.0),
        Point2::new(1.0, 5.0),
    ];
    let points2: Vec<Point2> = points1.iter().map(|p| Point2::new(-p.y, p.x)).collect();

    let settings = RansacSettings::default().with_seed(4);
    let result = estimate_homography(&points1, &points2, 1e-6, Some(settings)).unwrap();

    assert!(result.success);
    assert_eq!(result.iterations, 1);
    for (p, q) in points1.iter().zip(&points2) {
        assert!((result.model.predict(p) - q).norm() < 1e-6);
    }
}

#[test]
fn test_adaptive_bound_for_half_inliers() {
    assert_eq!(required_iterations(0.5, 4, 0.99), 72);
}

#[test]
fn test_affine_with_outliers() {
    let truth = AffineModel::from_parameters(0.9, 0.2, -0.1, 1.1, 15.0, -4.0);
    let mut rng = StdRng::seed_from_u64(17);
    let mut points1 = Vec::new();
    let mut points2 = Vec::new();
    for i in 0..60 {
        let p = Point2::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        let q = if i % 5 == 0 {
            Point2::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0))
        } else {
            truth.predict(&p)
        };
        points1.push(p);
        points2.push(q);
    }

    let settings = RansacSettings::default().with_seed(2);
    let result = estimate_affine(&points1, &points2, 1e-6, Some(settings)).unwrap();

    assert!(result.success);
    assert_eq!(result.inliers.len(), 48);
    assert!(result.inliers.iter().all(|i| i % 5 != 0));
    assert_relative_eq!(*result.model.matrix(), *truth.matrix(), epsilon = 1e-8);
}

fn line_data(seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..100 {
        let x = i as f64;
        xs.push(x);
        if i % 4 == 3 {
            ys.push(rng.gen_range(-100.0..100.0));
        } else {
            ys.push(0.5 * x + 3.0 + 0.1 * gaussian(&mut rng));
        }
    }
    (xs, ys)
}

#[test]
fn test_independent_runs_on_separate_threads() {
    let (xs, ys) = line_data(4);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4u64)
            .map(|seed| {
                let (xs, ys) = (&xs, &ys);
                scope.spawn(move || {
                    let settings = RansacSettings::default().with_seed(seed);
                    estimate_line(xs, ys, 0.5, Some(settings))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    for result in &results {
        assert!(result.success);
        let (slope, intercept) = result.model.slope_intercept().unwrap();
        assert!((slope - 0.5).abs() < 0.01, "slope {}", slope);
        assert!((intercept - 3.0).abs() < 0.5, "intercept {}", intercept);
        assert!(result.inliers.len() >= 70);
    }
}

#[test]
fn test_least_median_of_squares_line() {
    let (xs, ys) = line_data(12);
    let data = types::zip_correspondences(&xs, &ys).unwrap();

    let result = LeastMedianOfSquares::default().fit(
        &data,
        &LineModel::new(),
        &mut UniformSampler::from_seed(3),
        &ModelResidual,
    );

    assert!(result.success, "status: {:?}", result.status);
    assert!(result.inliers.len() >= 70);
    let (slope, intercept) = result.model.slope_intercept().unwrap();
    assert!((slope - 0.5).abs() < 0.02, "slope {}", slope);
    assert!((intercept - 3.0).abs() < 0.5, "intercept {}", intercept);
}

#[test]
fn test_cancellation_from_another_thread() {
    let (xs, ys) = line_data(5);
    let data = types::zip_correspondences(&xs, &ys).unwrap();
    let token = CancellationToken::new();

    let mut ransac = Ransac::new(
        RansacSettings::default().with_max_iterations(usize::MAX),
        LineModel::new(),
        UniformSampler::from_seed(0),
        ModelResidual,
        ThresholdClassifier::new(0.5),
        BestFit,
    )
    .with_cancellation(token.clone());

    let result = thread::scope(|scope| {
        let handle = scope.spawn(|| ransac.run(&data));
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        handle.join().unwrap()
    });

    assert!(!result.success);
    assert_eq!(result.status, FitStatus::Cancelled);
    assert_eq!(result.error(), Some(FitError::Cancelled));
}

#[test]
fn test_custom_components() {
    let (xs, ys) = line_data(21);
    let data = types::zip_correspondences(&xs, &ys).unwrap();

    // Vertical residual through the model's prediction.
    let result = fit(
        &data,
        &LineModel::new(),
        UniformSampler::from_seed(6),
        DistanceResidual::distance(|predicted: &f64, observed: &f64| (predicted - observed).abs()),
        ThresholdClassifier::new(0.5),
        PercentageInliers::new(0.7),
        &RansacSettings::default(),
    );
    assert!(result.success);
    assert!(result.inlier_ratio(data.len()) >= 0.7);

    // The model decides membership itself.
    let result = fit(
        &data,
        &LineModel::new().with_tolerance(0.5),
        UniformSampler::from_seed(6),
        ModelResidual,
        ModelPredicateClassifier,
        PercentageInliers::new(0.7),
        &RansacSettings::default(),
    );
    assert!(result.success);
    assert!(result.inlier_ratio(data.len()) >= 0.7);
}
