//! Nonlinear homography refinement.
//!
//! Minimises a geometric transfer error over the consensus set with
//! Levenberg-Marquardt, starting from the linear estimate. `h22` stays fixed
//! at 1, leaving eight free parameters.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::{debug, trace};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn, Matrix2x3, Matrix3, Vector3};

use crate::core::{CorrespondenceOf, Model, Refiner};
use crate::estimators::HomographyModel;
use crate::types::Point2;

/// Geometric error minimised by [`HomographyRefiner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferError {
    /// `d(H x, x')`: noise only in the second image.
    #[default]
    Forward,
    /// `d(H^-1 x', x)`: noise only in the first image.
    Inverse,
    /// Both transfer directions.
    Symmetric,
}

impl TransferError {
    fn forward(self) -> bool {
        matches!(self, Self::Forward | Self::Symmetric)
    }

    fn inverse(self) -> bool {
        matches!(self, Self::Inverse | Self::Symmetric)
    }

    fn rows_per_point(self) -> usize {
        if self == Self::Symmetric {
            4
        } else {
            2
        }
    }
}

/// Levenberg-Marquardt refinement of a [`HomographyModel`].
#[derive(Debug, Clone, Copy)]
pub struct HomographyRefiner {
    pub error: TransferError,
    /// Evaluation budget, as a multiple of the parameter count.
    pub patience: usize,
}

impl Default for HomographyRefiner {
    fn default() -> Self {
        Self {
            error: TransferError::Forward,
            patience: 100,
        }
    }
}

impl HomographyRefiner {
    pub fn new(error: TransferError) -> Self {
        Self {
            error,
            ..Self::default()
        }
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }
}

impl Refiner<HomographyModel> for HomographyRefiner {
    fn refine(
        &mut self,
        data: &[CorrespondenceOf<HomographyModel>],
        model: &HomographyModel,
        inliers: &[usize],
        _classify: &mut dyn FnMut(&HomographyModel) -> Vec<usize>,
    ) -> Option<HomographyModel> {
        if inliers.len() < model.sample_size() {
            return None;
        }

        let h = model.matrix();
        let scale = h[(2, 2)];
        if !scale.is_finite() || scale.abs() < 1e-12 {
            trace!("homography refinement skipped: h22 = {}", scale);
            return None;
        }
        let h = h / scale;

        let problem = TransferProblem {
            pairs: inliers
                .iter()
                .map(|&i| (*data[i].independent(), *data[i].dependent()))
                .collect(),
            error: self.error,
            params: DVector::from_vec(vec![
                h[(0, 0)],
                h[(0, 1)],
                h[(0, 2)],
                h[(1, 0)],
                h[(1, 1)],
                h[(1, 2)],
                h[(2, 0)],
                h[(2, 1)],
            ]),
        };

        let (problem, report) = LevenbergMarquardt::new()
            .with_patience(self.patience.max(1))
            .minimize(problem);
        debug!(
            "homography refinement ({:?}): {:?} after {} evaluations, objective {:.6e}",
            self.error, report.termination, report.number_of_evaluations, report.objective_function
        );

        let refined = problem.matrix();
        if refined.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(model.clone().with_matrix(refined))
    }
}

/// Transfer residuals of a fixed correspondence set as a function of the
/// eight free homography entries.
struct TransferProblem {
    pairs: Vec<(Point2, Point2)>,
    error: TransferError,
    params: DVector<f64>,
}

impl TransferProblem {
    fn matrix(&self) -> Matrix3<f64> {
        let p = &self.params;
        Matrix3::new(p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], 1.0)
    }

    /// `H` and, when the error needs it, `H^-1`.
    fn matrices(&self) -> Option<(Matrix3<f64>, Option<Matrix3<f64>>)> {
        let h = self.matrix();
        let inverse = if self.error.inverse() {
            Some(h.try_inverse()?)
        } else {
            None
        };
        Some((h, inverse))
    }
}

fn homogeneous(p: &Point2) -> Vector3<f64> {
    Vector3::new(p.x, p.y, 1.0)
}

/// Residual of `project(v)` against `target`, and the Jacobian of the
/// projection at `v`.
fn project(v: &Vector3<f64>, target: &Point2) -> Option<([f64; 2], Matrix2x3<f64>)> {
    let w = v.z;
    if !w.is_finite() || w.abs() < 1e-12 {
        return None;
    }
    let inv_w = 1.0 / w;
    let inv_w2 = inv_w * inv_w;
    let residual = [v.x * inv_w - target.x, v.y * inv_w - target.y];
    let jacobian = Matrix2x3::new(inv_w, 0.0, -v.x * inv_w2, 0.0, inv_w, -v.y * inv_w2);
    Some((residual, jacobian))
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for TransferProblem {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let (h, inverse) = self.matrices()?;
        let rows = self.error.rows_per_point();
        let mut out = DVector::zeros(rows * self.pairs.len());

        for (i, (x, y)) in self.pairs.iter().enumerate() {
            let mut row = i * rows;
            if self.error.forward() {
                let (r, _) = project(&(h * homogeneous(x)), y)?;
                out[row] = r[0];
                out[row + 1] = r[1];
                row += 2;
            }
            if let Some(g) = &inverse {
                let (r, _) = project(&(g * homogeneous(y)), x)?;
                out[row] = r[0];
                out[row + 1] = r[1];
            }
        }
        Some(out)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let (h, inverse) = self.matrices()?;
        let rows = self.error.rows_per_point();
        let mut out = DMatrix::zeros(rows * self.pairs.len(), 8);

        for (i, (x, y)) in self.pairs.iter().enumerate() {
            let mut row = i * rows;
            if self.error.forward() {
                // d(H x) / d h_rc = e_r * x_c
                let xh = homogeneous(x);
                let (_, d) = project(&(h * xh), y)?;
                for k in 0..8 {
                    let (r, c) = (k / 3, k % 3);
                    out[(row, k)] = d[(0, r)] * xh[c];
                    out[(row + 1, k)] = d[(1, r)] * xh[c];
                }
                row += 2;
            }
            if let Some(g) = &inverse {
                // d(H^-1 y) / d h_rc = -H^-1 e_r e_c^T H^-1 y
                let q = g * homogeneous(y);
                let (_, d) = project(&q, x)?;
                for k in 0..8 {
                    let (r, c) = (k / 3, k % 3);
                    let dq = g.column(r) * (-q[c]);
                    let dr = d * dq;
                    out[(row, k)] = dr[0];
                    out[(row + 1, k)] = dr[1];
                }
            }
        }
        Some(out)
    }
}
