//! Planar homography between two images.
//!
//! Minimal samples (4 points) are solved exactly by Gaussian elimination with
//! `h22 = 1`; larger sets use linear least squares. Both run on
//! Hartley-normalised coordinates and are denormalised afterwards.

use nalgebra::{DMatrix, DVector, Matrix3};

use crate::core::{CorrespondenceOf, Model, ResidualEvaluator, ValidatingModel};
use crate::error::EstimationError;
use crate::types::Point2;
use crate::utils::{any_three_collinear, gauss_elimination, normalising_transform, transform_point};

/// Relative tolerance for the collinearity test on minimal samples.
const COLLINEARITY_TOLERANCE: f64 = 1e-6;

/// Homography `x' ~ H x` mapping points of the first image to the second.
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyModel {
    h: Matrix3<f64>,
    tolerance: f64,
}

impl Default for HomographyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl HomographyModel {
    /// Identity homography with a validation tolerance of 1.
    pub fn new() -> Self {
        Self {
            h: Matrix3::identity(),
            tolerance: 1.0,
        }
    }

    pub fn from_matrix(h: Matrix3<f64>) -> Self {
        Self {
            h,
            ..Self::new()
        }
    }

    /// Transfer distance under which [`ValidatingModel::validate`] accepts a
    /// correspondence.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Replace the matrix, keeping the validation tolerance.
    pub fn with_matrix(mut self, h: Matrix3<f64>) -> Self {
        self.h = h;
        self
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }

    /// `d(H x, x')^2 + d(H^-1 x', x)^2`; infinite when `H` is singular.
    pub fn symmetric_transfer_error(&self, c: &CorrespondenceOf<Self>) -> f64 {
        let Some(inverse) = self.h.try_inverse() else {
            return f64::INFINITY;
        };
        let forward = (transform_point(&self.h, c.independent()) - c.dependent()).norm_squared();
        let backward = (transform_point(&inverse, c.dependent()) - c.independent()).norm_squared();
        let error = forward + backward;
        if error.is_finite() {
            error
        } else {
            f64::INFINITY
        }
    }

    fn solve_minimal(src: &[Point2], dst: &[Point2]) -> Result<DVector<f64>, EstimationError> {
        let mut augmented = DMatrix::<f64>::zeros(8, 9);
        for (i, (p, q)) in src.iter().zip(dst).enumerate() {
            let r = 2 * i;
            augmented[(r, 0)] = -p.x;
            augmented[(r, 1)] = -p.y;
            augmented[(r, 2)] = -1.0;
            augmented[(r, 6)] = q.x * p.x;
            augmented[(r, 7)] = q.x * p.y;
            augmented[(r, 8)] = -q.x;

            augmented[(r + 1, 3)] = -p.x;
            augmented[(r + 1, 4)] = -p.y;
            augmented[(r + 1, 5)] = -1.0;
            augmented[(r + 1, 6)] = q.y * p.x;
            augmented[(r + 1, 7)] = q.y * p.y;
            augmented[(r + 1, 8)] = -q.y;
        }

        let mut h = DVector::<f64>::zeros(8);
        if !gauss_elimination(&mut augmented, &mut h) {
            return Err(EstimationError::DegenerateSample);
        }
        Ok(h)
    }

    fn solve_least_squares(src: &[Point2], dst: &[Point2]) -> Result<DVector<f64>, EstimationError> {
        let n = src.len();
        let mut coefficients = DMatrix::<f64>::zeros(2 * n, 8);
        let mut inhomogeneous = DVector::<f64>::zeros(2 * n);

        for (i, (p, q)) in src.iter().zip(dst).enumerate() {
            let r = 2 * i;
            coefficients[(r, 0)] = -p.x;
            coefficients[(r, 1)] = -p.y;
            coefficients[(r, 2)] = -1.0;
            coefficients[(r, 6)] = q.x * p.x;
            coefficients[(r, 7)] = q.x * p.y;
            inhomogeneous[r] = -q.x;

            coefficients[(r + 1, 3)] = -p.x;
            coefficients[(r + 1, 4)] = -p.y;
            coefficients[(r + 1, 5)] = -1.0;
            coefficients[(r + 1, 6)] = q.y * p.x;
            coefficients[(r + 1, 7)] = q.y * p.y;
            inhomogeneous[r + 1] = -q.y;
        }

        let svd = coefficients.svd(true, true);
        let max_sv = svd.singular_values.max();
        let min_sv = svd.singular_values.min();
        if !(max_sv > 0.0) || min_sv / max_sv < 1e-12 {
            return Err(EstimationError::DegenerateSample);
        }
        svd.solve(&inhomogeneous, 1e-12)
            .map_err(|_| EstimationError::NumericalFailure)
    }
}

impl Model for HomographyModel {
    type Independent = Point2;
    type Dependent = Point2;

    fn sample_size(&self) -> usize {
        4
    }

    fn estimate(
        &mut self,
        data: &[CorrespondenceOf<Self>],
        subset: &[usize],
    ) -> Result<(), EstimationError> {
        if subset.len() < self.sample_size() {
            return Err(EstimationError::DegenerateSample);
        }

        let src: Vec<Point2> = subset.iter().map(|&i| *data[i].independent()).collect();
        let dst: Vec<Point2> = subset.iter().map(|&i| *data[i].dependent()).collect();

        let t1 = normalising_transform(src.iter()).ok_or(EstimationError::DegenerateSample)?;
        let t2 = normalising_transform(dst.iter()).ok_or(EstimationError::DegenerateSample)?;
        let src_n: Vec<Point2> = src.iter().map(|p| transform_point(&t1, p)).collect();
        let dst_n: Vec<Point2> = dst.iter().map(|p| transform_point(&t2, p)).collect();

        let h = if subset.len() == self.sample_size() {
            Self::solve_minimal(&src_n, &dst_n)?
        } else {
            Self::solve_least_squares(&src_n, &dst_n)?
        };

        if h.iter().any(|v| !v.is_finite()) {
            return Err(EstimationError::NumericalFailure);
        }

        let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        if h_norm.determinant().abs() < 1e-8 {
            return Err(EstimationError::DegenerateSample);
        }

        let t2_inv = t2.try_inverse().ok_or(EstimationError::NumericalFailure)?;
        let denorm = t2_inv * h_norm * t1;
        let scale = denorm[(2, 2)];
        if !scale.is_finite() || scale.abs() < 1e-12 {
            return Err(EstimationError::NumericalFailure);
        }

        self.h = denorm / scale;
        Ok(())
    }

    fn predict(&self, independent: &Point2) -> Point2 {
        transform_point(&self.h, independent)
    }

    fn compute_error(&self, c: &CorrespondenceOf<Self>) -> f64 {
        let error = (self.predict(c.independent()) - c.dependent()).norm();
        if error.is_finite() {
            error
        } else {
            f64::INFINITY
        }
    }

    /// A minimal sample is degenerate when three of its points are collinear
    /// in either image.
    fn is_degenerate(&self, data: &[CorrespondenceOf<Self>], subset: &[usize]) -> bool {
        if subset.len() != self.sample_size() {
            return false;
        }
        let src: Vec<Point2> = subset.iter().map(|&i| *data[i].independent()).collect();
        let dst: Vec<Point2> = subset.iter().map(|&i| *data[i].dependent()).collect();
        any_three_collinear(&src, COLLINEARITY_TOLERANCE)
            || any_three_collinear(&dst, COLLINEARITY_TOLERANCE)
    }
}

impl ValidatingModel for HomographyModel {
    fn validate(&self, c: &CorrespondenceOf<Self>) -> bool {
        self.compute_error(c) <= self.tolerance
    }
}

/// Residual given by [`HomographyModel::symmetric_transfer_error`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SymmetricTransferResidual;

impl ResidualEvaluator<HomographyModel> for SymmetricTransferResidual {
    fn residual(&self, model: &HomographyModel, c: &CorrespondenceOf<HomographyModel>) -> f64 {
        model.symmetric_transfer_error(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Correspondence;
    use approx::assert_relative_eq;

    fn ground_truth() -> Matrix3<f64> {
        Matrix3::new(1.2, 0.1, 5.0, -0.05, 0.9, -3.0, 1e-4, 2e-4, 1.0)
    }

    fn grid_data(h: &Matrix3<f64>) -> Vec<Correspondence<Point2, Point2>> {
        let mut data = Vec::new();
        for i in 0..5 {
            for j in 0..4 {
                let p = Point2::new(i as f64 * 20.0 + j as f64 * 3.0, j as f64 * 25.0 - i as f64);
                data.push(Correspondence::new(p, transform_point(h, &p)));
            }
        }
        data
    }

    #[test]
    fn minimal_sample_recovers_exact_homography() {
        let truth = ground_truth();
        let data = grid_data(&truth);
        let mut model = HomographyModel::new();
        let subset = [0, 3, 16, 19];

        assert!(!model.is_degenerate(&data, &subset));
        model.estimate(&data, &subset).unwrap();
        assert_relative_eq!(*model.matrix(), truth, epsilon = 1e-8);
    }

    #[test]
    fn least_squares_recovers_exact_homography() {
        let truth = ground_truth();
        let data = grid_data(&truth);
        let subset: Vec<usize> = (0..data.len()).collect();
        let mut model = HomographyModel::new();

        model.estimate(&data, &subset).unwrap();
        assert_relative_eq!(*model.matrix(), truth, epsilon = 1e-8);
        for c in &data {
            assert!(model.compute_error(c) < 1e-6);
        }
    }

    #[test]
    fn rotation_by_ninety_degrees() {
        let rotation = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let data: Vec<_> = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0), (2.0, 3.0)]
            .iter()
            .map(|&(x, y)| Correspondence::new(Point2::new(x, y), Point2::new(-y, x)))
            .collect();

        let mut model = HomographyModel::new();
        model.estimate(&data, &[0, 1, 2, 4]).unwrap();

        assert_relative_eq!(*model.matrix(), rotation, epsilon = 1e-9);
        for c in &data {
            assert!(model.compute_error(c) < 1e-6);
        }
    }

    #[test]
    fn collinear_samples_are_degenerate() {
        let data: Vec<_> = (0..4)
            .map(|i| {
                let p = Point2::new(i as f64, 2.0 * i as f64 + 1.0);
                Correspondence::new(p, Point2::new(p.x + 1.0, p.y))
            })
            .collect();
        let mut model = HomographyModel::new();

        assert!(model.is_degenerate(&data, &[0, 1, 2, 3]));
        assert_eq!(
            model.estimate(&data, &[0, 1, 2, 3]),
            Err(EstimationError::DegenerateSample)
        );
    }

    #[test]
    fn errors_measure_transfer_distance() {
        let model = HomographyModel::from_matrix(Matrix3::new(
            1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
        ))
        .with_tolerance(0.5);
        let c = Correspondence::new(Point2::new(0.0, 0.0), Point2::new(2.0, 1.0));

        assert_relative_eq!(model.compute_error(&c), 1.0);
        assert_relative_eq!(model.symmetric_transfer_error(&c), 2.0);
        assert_relative_eq!(SymmetricTransferResidual.residual(&model, &c), 2.0);
        assert!(!model.validate(&c));
        assert!(model.with_tolerance(1.0).validate(&c));
    }
}
