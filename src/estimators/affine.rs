//! 2D affine transform `x' = A x + t` (six parameters).

use nalgebra::{DMatrix, DVector, Matrix3};

use crate::core::{CorrespondenceOf, Model, ValidatingModel};
use crate::error::EstimationError;
use crate::types::Point2;
use crate::utils::{are_collinear, transform_point};

const COLLINEARITY_TOLERANCE: f64 = 1e-6;

/// Affine transform stored as a 3x3 matrix with last row `[0, 0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineModel {
    transform: Matrix3<f64>,
    tolerance: f64,
}

impl Default for AffineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AffineModel {
    pub fn new() -> Self {
        Self {
            transform: Matrix3::identity(),
            tolerance: 1.0,
        }
    }

    /// Build from the linear part `[[a, b], [c, d]]` and translation `(tx, ty)`.
    pub fn from_parameters(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self {
            transform: Matrix3::new(a, b, tx, c, d, ty, 0.0, 0.0, 1.0),
            ..Self::new()
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.transform
    }
}

impl Model for AffineModel {
    type Independent = Point2;
    type Dependent = Point2;

    fn sample_size(&self) -> usize {
        3
    }

    fn estimate(
        &mut self,
        data: &[CorrespondenceOf<Self>],
        subset: &[usize],
    ) -> Result<(), EstimationError> {
        let n = subset.len();
        if n < self.sample_size() {
            return Err(EstimationError::DegenerateSample);
        }

        let mut coefficients = DMatrix::<f64>::zeros(2 * n, 6);
        let mut rhs = DVector::<f64>::zeros(2 * n);
        for (i, &idx) in subset.iter().enumerate() {
            let p = data[idx].independent();
            let q = data[idx].dependent();
            let r = 2 * i;
            coefficients[(r, 0)] = p.x;
            coefficients[(r, 1)] = p.y;
            coefficients[(r, 2)] = 1.0;
            rhs[r] = q.x;

            coefficients[(r + 1, 3)] = p.x;
            coefficients[(r + 1, 4)] = p.y;
            coefficients[(r + 1, 5)] = 1.0;
            rhs[r + 1] = q.y;
        }

        let svd = coefficients.svd(true, true);
        let max_sv = svd.singular_values.max();
        let min_sv = svd.singular_values.min();
        if !(max_sv > 0.0) || min_sv / max_sv < 1e-10 {
            return Err(EstimationError::DegenerateSample);
        }

        let x = svd
            .solve(&rhs, 1e-12)
            .map_err(|_| EstimationError::NumericalFailure)?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(EstimationError::NumericalFailure);
        }

        self.transform = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], 0.0, 0.0, 1.0);
        Ok(())
    }

    fn predict(&self, independent: &Point2) -> Point2 {
        transform_point(&self.transform, independent)
    }

    fn compute_error(&self, c: &CorrespondenceOf<Self>) -> f64 {
        (self.predict(c.independent()) - c.dependent()).norm()
    }

    /// Degenerate when the three source points are collinear.
    fn is_degenerate(&self, data: &[CorrespondenceOf<Self>], subset: &[usize]) -> bool {
        match subset {
            [a, b, c] => are_collinear(
                data[*a].independent(),
                data[*b].independent(),
                data[*c].independent(),
                COLLINEARITY_TOLERANCE,
            ),
            _ => false,
        }
    }
}

impl ValidatingModel for AffineModel {
    fn validate(&self, c: &CorrespondenceOf<Self>) -> bool {
        self.compute_error(c) <= self.tolerance
    }
}
