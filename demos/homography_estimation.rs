//! Example: Homography estimation from point correspondences
//!
//! Fits a homography to noisy synthetic correspondences contaminated with
//! random matches, then compares the symmetric transfer error of the
//! recovered model on the inliers.

use rand::Rng;
use robust_fit::estimators::SymmetricTransferResidual;
use robust_fit::residuals::ModelResidual;
use robust_fit::samplers::UniformSampler;
use robust_fit::scoring::ThresholdClassifier;
use robust_fit::stopping::AdaptiveConfidence;
use robust_fit::types::zip_correspondences;
use robust_fit::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Homography Estimation Example ===\n");

    let grid = 6;
    let n_points = grid * grid;
    let n_outliers = 16;
    let n_total = n_points + n_outliers;

    let mut rng = rand::thread_rng();
    let mut points1 = Vec::with_capacity(n_total);
    let mut points2 = Vec::with_capacity(n_total);

    // Rotation + translation
    let angle: f64 = 0.1;
    let (sin_a, cos_a) = angle.sin_cos();
    let tx = 10.0;
    let ty = 5.0;

    for i in 0..n_points {
        let x = (i % grid) as f64 * 20.0 - 50.0;
        let y = (i / grid) as f64 * 20.0 - 50.0;
        points1.push(Point2::new(x, y));
        points2.push(Point2::new(
            cos_a * x - sin_a * y + tx + rng.gen_range(-0.5..0.5),
            sin_a * x + cos_a * y + ty + rng.gen_range(-0.5..0.5),
        ));
    }
    for _ in 0..n_outliers {
        points1.push(Point2::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)));
        points2.push(Point2::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)));
    }

    println!("Generated {} inliers and {} outliers", n_points, n_outliers);
    println!(
        "True transformation: rotation ({:.2} rad) + translation ({:.1}, {:.1})\n",
        angle, tx, ty
    );

    let threshold = 2.0; // pixels
    let result = estimate_homography(&points1, &points2, threshold, None)?;

    println!("Estimation results:");
    println!("  Status: {:?}", result.status);
    println!("  Found {} inliers out of {} points", result.inliers.len(), n_total);
    println!("  Inlier ratio: {:.2}%", 100.0 * result.inlier_ratio(n_total));
    println!("  Iterations: {}", result.iterations);

    if let Some(err) = result.error() {
        println!("\nEstimation failed: {}", err);
        return Ok(());
    }

    println!("\nEstimated homography matrix:");
    println!("{:.4}", result.model.matrix());

    let data = zip_correspondences(&points1, &points2)?;
    let mean_symmetric = result
        .inliers
        .iter()
        .map(|&i| SymmetricTransferResidual.residual(&result.model, &data[i]))
        .sum::<f64>()
        / result.inliers.len() as f64;
    println!("Mean symmetric transfer error on inliers: {:.4}", mean_symmetric);

    let missed = result.outliers(n_total).iter().filter(|&&i| i < n_points).count();
    println!("True inliers rejected: {}", missed);

    // Same run with Levenberg-Marquardt refinement of the symmetric transfer error.
    let refined = Ransac::new(
        RansacSettings::default(),
        HomographyModel::new(),
        UniformSampler::from_entropy(),
        ModelResidual,
        ThresholdClassifier::new(threshold),
        AdaptiveConfidence::new(0.99),
    )
    .with_refiner(HomographyRefiner::new(TransferError::Symmetric))
    .run(&data);

    if refined.success {
        let mean_refined = refined
            .inliers
            .iter()
            .map(|&i| SymmetricTransferResidual.residual(&refined.model, &data[i]))
            .sum::<f64>()
            / refined.inliers.len() as f64;
        println!(
            "\nWith nonlinear refinement: {} inliers, mean symmetric transfer error {:.4}",
            refined.inliers.len(),
            mean_refined
        );
    }

    Ok(())
}
