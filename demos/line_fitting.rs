//! Example: Robust line fitting with RANSAC and Least Median of Squares
//!
//! Run with `RUST_LOG=debug` to see each improved hypothesis.

use rand::seq::SliceRandom;
use rand::Rng;
use robust_fit::residuals::ModelResidual;
use robust_fit::samplers::UniformSampler;
use robust_fit::types::zip_correspondences;
use robust_fit::{estimate_line, LeastMedianOfSquares, LineModel, RansacSettings};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Robust Line Fitting Example ===\n");

    let n_inliers = 60;
    let n_outliers = 25;
    let n_total = n_inliers + n_outliers;

    let mut rng = rand::thread_rng();

    let true_slope = 2.0;
    let true_intercept = 1.0;

    println!("True line: y = {:.2}x + {:.2}", true_slope, true_intercept);
    println!("Generating {} inliers and {} outliers\n", n_inliers, n_outliers);

    let mut points = Vec::with_capacity(n_total);
    for i in 0..n_inliers {
        let x = (i as f64) * 0.2 - 6.0;
        let y = true_slope * x + true_intercept + rng.gen_range(-0.3..0.3);
        points.push((x, y));
    }
    for _ in 0..n_outliers {
        points.push((rng.gen_range(-10.0..10.0), rng.gen_range(-20.0..20.0)));
    }
    points.shuffle(&mut rng);

    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();

    let threshold = 0.5;
    let result = estimate_line(&xs, &ys, threshold, Some(RansacSettings::default()))?;

    println!("RANSAC Results:");
    println!("  Status: {:?}", result.status);
    println!("  Found {} inliers out of {} points", result.inliers.len(), n_total);
    println!("  Inlier ratio: {:.2}%", 100.0 * result.inlier_ratio(n_total));
    println!("  Iterations: {}", result.iterations);
    report(&result.model, true_slope, true_intercept);

    let data = zip_correspondences(&xs, &ys)?;
    let lmeds = LeastMedianOfSquares::default().fit(
        &data,
        &LineModel::new(),
        &mut UniformSampler::from_entropy(),
        &ModelResidual,
    );

    println!("\nLMedS Results:");
    println!("  Status: {:?}", lmeds.status);
    println!("  Found {} inliers out of {} points", lmeds.inliers.len(), n_total);
    report(&lmeds.model, true_slope, true_intercept);

    Ok(())
}

fn report(line: &LineModel, true_slope: f64, true_intercept: f64) {
    let (a, b, c) = line.coefficients();
    println!("  Estimated line: {:.4}x + {:.4}y + {:.4} = 0", a, b, c);
    if let Some((slope, intercept)) = line.slope_intercept() {
        println!("  Slope: {:.4} (error {:.4})", slope, (slope - true_slope).abs());
        println!(
            "  Intercept: {:.4} (error {:.4})",
            intercept,
            (intercept - true_intercept).abs()
        );
    }
}
