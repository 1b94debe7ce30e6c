//! 2D line fitting.
//!
//! Correspondences pair an `x` coordinate with the observed `y`. The line is
//! kept in implicit form `ax + by + c = 0` with `a^2 + b^2 = 1`, so vertical
//! lines are representable and the error is the perpendicular distance.

use nalgebra::Matrix2;

use crate::core::{CorrespondenceOf, Model, ValidatingModel};
use crate::error::EstimationError;

/// Minimum squared separation of the two points of a minimal sample.
const MIN_SEPARATION_SQ: f64 = 1e-20;

/// Line `ax + by + c = 0` with unit normal `(a, b)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineModel {
    a: f64,
    b: f64,
    c: f64,
    tolerance: f64,
}

impl Default for LineModel {
    /// The x axis.
    fn default() -> Self {
        Self {
            a: 0.0,
            b: 1.0,
            c: 0.0,
            tolerance: 1.0,
        }
    }
}

impl LineModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Line from implicit coefficients, normalised so that `a^2 + b^2 = 1`.
    /// Returns `None` when `a` and `b` are both zero.
    pub fn from_coefficients(a: f64, b: f64, c: f64) -> Option<Self> {
        let mut line = Self::default();
        line.set(a, b, c).ok()?;
        Some(line)
    }

    /// `y = slope * x + intercept`.
    pub fn from_slope_intercept(slope: f64, intercept: f64) -> Option<Self> {
        Self::from_coefficients(slope, -1.0, intercept)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn coefficients(&self) -> (f64, f64, f64) {
        (self.a, self.b, self.c)
    }

    /// `(slope, intercept)`, or `None` for a vertical line.
    pub fn slope_intercept(&self) -> Option<(f64, f64)> {
        if self.b.abs() < f64::EPSILON {
            return None;
        }
        Some((-self.a / self.b, -self.c / self.b))
    }

    /// Perpendicular distance of `(x, y)` from the line.
    pub fn distance(&self, x: f64, y: f64) -> f64 {
        (self.a * x + self.b * y + self.c).abs()
    }

    fn set(&mut self, a: f64, b: f64, c: f64) -> Result<(), EstimationError> {
        let norm = a.hypot(b);
        if !norm.is_finite() || norm < 1e-12 || !c.is_finite() {
            return Err(EstimationError::NumericalFailure);
        }
        // Canonical sign: b > 0, or a > 0 for vertical lines.
        let sign = if b < 0.0 || (b == 0.0 && a < 0.0) {
            -1.0
        } else {
            1.0
        };
        self.a = sign * a / norm;
        self.b = sign * b / norm;
        self.c = sign * c / norm;
        Ok(())
    }
}

impl Model for LineModel {
    type Independent = f64;
    type Dependent = f64;

    fn sample_size(&self) -> usize {
        2
    }

    fn estimate(
        &mut self,
        data: &[CorrespondenceOf<Self>],
        subset: &[usize],
    ) -> Result<(), EstimationError> {
        match subset {
            [] | [_] => Err(EstimationError::DegenerateSample),
            [i, j] => {
                let (x1, y1) = (*data[*i].independent(), *data[*i].dependent());
                let (x2, y2) = (*data[*j].independent(), *data[*j].dependent());
                if (x2 - x1).powi(2) + (y2 - y1).powi(2) < MIN_SEPARATION_SQ {
                    return Err(EstimationError::DegenerateSample);
                }
                // Cross product of the homogeneous points.
                self.set(y1 - y2, x2 - x1, x1 * y2 - x2 * y1)
            }
            _ => {
                let n = subset.len() as f64;
                let (mut cx, mut cy) = (0.0, 0.0);
                for &i in subset {
                    cx += data[i].independent();
                    cy += data[i].dependent();
                }
                cx /= n;
                cy /= n;

                let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
                for &i in subset {
                    let dx = data[i].independent() - cx;
                    let dy = data[i].dependent() - cy;
                    sxx += dx * dx;
                    sxy += dx * dy;
                    syy += dy * dy;
                }
                if sxx + syy < MIN_SEPARATION_SQ {
                    return Err(EstimationError::DegenerateSample);
                }

                // Total least squares: the normal is the eigenvector of the
                // scatter matrix with the smallest eigenvalue.
                let eigen = Matrix2::new(sxx, sxy, sxy, syy).symmetric_eigen();
                let k = if eigen.eigenvalues[0] <= eigen.eigenvalues[1] {
                    0
                } else {
                    1
                };
                let normal = eigen.eigenvectors.column(k);
                let (a, b) = (normal[0], normal[1]);
                self.set(a, b, -(a * cx + b * cy))
            }
        }
    }

    /// `y` on the line at `x`; non-finite for vertical lines.
    fn predict(&self, x: &f64) -> f64 {
        -(self.a * x + self.c) / self.b
    }

    fn compute_error(&self, c: &CorrespondenceOf<Self>) -> f64 {
        self.distance(*c.independent(), *c.dependent())
    }

    fn is_degenerate(&self, data: &[CorrespondenceOf<Self>], subset: &[usize]) -> bool {
        match subset {
            [i, j] => {
                let dx = data[*j].independent() - data[*i].independent();
                let dy = data[*j].dependent() - data[*i].dependent();
                dx * dx + dy * dy < MIN_SEPARATION_SQ
            }
            _ => false,
        }
    }
}

impl ValidatingModel for LineModel {
    fn validate(&self, c: &CorrespondenceOf<Self>) -> bool {
        self.compute_error(c) <= self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Correspondence;
    use approx::assert_relative_eq;

    #[test]
    fn two_points_define_line() {
        let data = vec![Correspondence::new(0.0, 1.0), Correspondence::new(2.0, 5.0)];
        let mut line = LineModel::new();
        line.estimate(&data, &[0, 1]).unwrap();

        let (slope, intercept) = line.slope_intercept().unwrap();
        assert_relative_eq!(slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(line.predict(&3.0), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn total_least_squares_fit() {
        // Symmetric noise around y = 0.5 x - 1.
        let data: Vec<_> = (0..10)
            .map(|i| {
                let x = i as f64;
                let noise = if i % 2 == 0 { 0.1 } else { -0.1 };
                Correspondence::new(x, 0.5 * x - 1.0 + noise)
            })
            .collect();
        let subset: Vec<usize> = (0..data.len()).collect();
        let mut line = LineModel::new();
        line.estimate(&data, &subset).unwrap();

        let (slope, intercept) = line.slope_intercept().unwrap();
        assert_relative_eq!(slope, 0.5, epsilon = 0.05);
        assert_relative_eq!(intercept, -1.0, epsilon = 0.2);
    }

    #[test]
    fn vertical_line_and_distance() {
        let data = vec![Correspondence::new(3.0, 0.0), Correspondence::new(3.0, 4.0)];
        let mut line = LineModel::new();
        line.estimate(&data, &[0, 1]).unwrap();

        assert!(line.slope_intercept().is_none());
        assert_relative_eq!(line.compute_error(&Correspondence::new(5.0, 10.0)), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let data = vec![Correspondence::new(1.0, 1.0), Correspondence::new(1.0, 1.0)];
        let mut line = LineModel::new();
        assert!(line.is_degenerate(&data, &[0, 1]));
        assert_eq!(line.estimate(&data, &[0, 1]), Err(EstimationError::DegenerateSample));
    }

    #[test]
    fn coefficients_are_normalised() {
        let line = LineModel::from_coefficients(3.0, -4.0, 10.0).unwrap();
        let (a, b, c) = line.coefficients();
        assert_relative_eq!(a, -0.6);
        assert_relative_eq!(b, 0.8);
        assert_relative_eq!(c, -2.0);
        assert!(LineModel::from_coefficients(0.0, 0.0, 1.0).is_none());
        assert!(line.with_tolerance(0.5).validate(&Correspondence::new(0.0, 2.5)));
    }
}
