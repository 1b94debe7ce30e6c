//! High-level API for the bundled models.
//!
//! These functions assemble a [`Ransac`] from [`RansacSettings`] with the
//! default components: uniform sampling, the model's own error as residual,
//! a fixed threshold classifier and the stopping rule named by the settings.
//! Invalid input is reported as a [`FitError`] instead of a panic.

use crate::choices::StoppingChoice;
use crate::core::{CorrespondenceOf, Model, Ransac};
use crate::error::FitError;
use crate::estimators::{AffineModel, HomographyModel, LineModel};
use crate::residuals::ModelResidual;
use crate::samplers::UniformSampler;
use crate::scoring::ThresholdClassifier;
use crate::settings::RansacSettings;
use crate::types::{zip_correspondences, FitResult, Point2};

/// Fit `model` to `data` using the components selected by `settings`.
///
/// The caller's `model` is cloned and left untouched.
pub fn estimate<M: Model>(
    data: &[CorrespondenceOf<M>],
    model: &M,
    settings: &RansacSettings,
) -> Result<FitResult<M>, FitError> {
    let required = model.sample_size().max(1);
    if data.len() < required {
        return Err(FitError::InsufficientData {
            required,
            actual: data.len(),
        });
    }

    let mut ransac = Ransac::new(
        settings.clone(),
        model.clone(),
        UniformSampler::from_optional_seed(settings.seed),
        ModelResidual,
        ThresholdClassifier::new(settings.inlier_threshold),
        StoppingChoice::from_settings(settings),
    );
    Ok(ransac.run(data))
}

/// Estimate a homography from 2D point correspondences.
///
/// # Arguments
/// * `points1` - Points in the first image
/// * `points2` - Matching points in the second image
/// * `threshold` - Inlier threshold on the transfer distance, in pixels
/// * `settings_opt` - Optional settings (defaults if `None`); `threshold`
///   overrides their inlier threshold
pub fn estimate_homography(
    points1: &[Point2],
    points2: &[Point2],
    threshold: f64,
    settings_opt: Option<RansacSettings>,
) -> Result<FitResult<HomographyModel>, FitError> {
    let data = zip_correspondences(points1, points2)?;
    let settings = settings_opt.unwrap_or_default().with_inlier_threshold(threshold);
    estimate(&data, &HomographyModel::new(), &settings)
}

/// Estimate a 2D affine transform from point correspondences.
///
/// Arguments as for [`estimate_homography`].
pub fn estimate_affine(
    points1: &[Point2],
    points2: &[Point2],
    threshold: f64,
    settings_opt: Option<RansacSettings>,
) -> Result<FitResult<AffineModel>, FitError> {
    let data = zip_correspondences(points1, points2)?;
    let settings = settings_opt.unwrap_or_default().with_inlier_threshold(threshold);
    estimate(&data, &AffineModel::new(), &settings)
}

/// Estimate a 2D line through the points `(xs[i], ys[i])`.
///
/// `threshold` bounds the perpendicular distance of an inlier.
pub fn estimate_line(
    xs: &[f64],
    ys: &[f64],
    threshold: f64,
    settings_opt: Option<RansacSettings>,
) -> Result<FitResult<LineModel>, FitError> {
    let data = zip_correspondences(xs, ys)?;
    let settings = settings_opt.unwrap_or_default().with_inlier_threshold(threshold);
    estimate(&data, &LineModel::new(), &settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::StoppingRule;

    #[test]
    fn mismatched_inputs_are_rejected() {
        let err = estimate_line(&[0.0, 1.0, 2.0], &[0.0, 1.0], 0.1, None).unwrap_err();
        assert_eq!(err, FitError::MismatchedLengths { left: 3, right: 2 });
    }

    #[test]
    fn too_few_points_are_rejected() {
        let points = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        let err = estimate_homography(&points, &points, 1.0, None).unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientData {
                required: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn line_with_outliers() {
        let mut xs: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let mut ys: Vec<f64> = xs.iter().map(|x| 3.0 * x - 2.0).collect();
        xs.extend([5.0, 12.0, 20.0]);
        ys.extend([80.0, -40.0, 3.0]);

        let settings = RansacSettings::default().with_seed(11);
        let result = estimate_line(&xs, &ys, 0.01, Some(settings)).unwrap();

        assert!(result.success);
        assert_eq!(result.inliers, (0..30).collect::<Vec<_>>());
        assert_eq!(result.outliers(xs.len()), vec![30, 31, 32]);
        let (slope, intercept) = result.model.slope_intercept().unwrap();
        assert!((slope - 3.0).abs() < 1e-9);
        assert!((intercept + 2.0).abs() < 1e-9);
    }

    #[test]
    fn inlier_count_rule_that_cannot_be_met_fails() {
        let settings = RansacSettings::default()
            .with_seed(1)
            .with_stopping(StoppingRule::InlierCount(50));
        let result = estimate_line(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], 0.1, Some(settings)).unwrap();
        assert!(!result.success);
        assert_eq!(result.iterations, 0);
    }
}
