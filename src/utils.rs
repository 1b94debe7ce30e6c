//! Miscellaneous utilities shared across the crate.
//!
//! - [`UniformRandomGenerator`]: unique index draws from an injected RNG.
//! - [`gauss_elimination`]: small dense solver used by minimal estimators.
//! - Point normalisation and collinearity helpers for the 2D models.
//! - [`median`] used by least-median-of-squares fitting.

use nalgebra::{DMatrix, DVector, Matrix3};
use rand::distributions::Uniform;
use rand::prelude::*;

use crate::types::Point2;

/// Draws sets of unique indices from a caller-supplied RNG.
///
/// The RNG is owned by the generator so that each fitting run carries its own
/// random state; seeding it with [`UniformRandomGenerator::from_seed`] makes
/// a run reproducible.
#[derive(Debug, Clone)]
pub struct UniformRandomGenerator<R = StdRng> {
    rng: R,
}

impl UniformRandomGenerator<StdRng> {
    /// Construct with a random seed (suitable for production use).
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Construct with a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> UniformRandomGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Fill `out` with distinct integers drawn uniformly from `[0, n)`.
    ///
    /// Rejection sampling is used, which is cheap for the small sample sizes
    /// of minimal solvers. Returns `false` when `out.len() > n`.
    pub fn gen_unique(&mut self, out: &mut [usize], n: usize) -> bool {
        if out.len() > n || n == 0 {
            return false;
        }
        let dist = Uniform::new(0, n);
        for i in 0..out.len() {
            loop {
                let candidate = self.rng.sample(dist);
                if out[..i].iter().all(|&v| v != candidate) {
                    out[i] = candidate;
                    break;
                }
            }
        }
        true
    }
}

/// Gaussian elimination with partial pivoting to solve A * x = b.
///
/// `augmented` holds `[A | b]` with A square (n x n). Returns `false` when a
/// pivot falls below `1e-10`, i.e. the system is singular.
pub fn gauss_elimination(augmented: &mut DMatrix<f64>, result: &mut DVector<f64>) -> bool {
    let n = augmented.nrows();
    if n + 1 != augmented.ncols() || n != result.len() {
        return false;
    }

    for i in 0..n {
        let mut max_row = i;
        let mut max_val = augmented[(i, i)].abs();
        for k in (i + 1)..n {
            let val = augmented[(k, i)].abs();
            if val > max_val {
                max_val = val;
                max_row = k;
            }
        }

        if max_row != i {
            augmented.swap_rows(i, max_row);
        }

        if augmented[(i, i)].abs() < 1e-10 {
            return false;
        }

        for k in (i + 1)..n {
            let factor = augmented[(k, i)] / augmented[(i, i)];
            for j in i..augmented.ncols() {
                augmented[(k, j)] -= factor * augmented[(i, j)];
            }
        }
    }

    for i in (0..n).rev() {
        result[i] = augmented[(i, n)];
        for j in (i + 1)..n {
            result[i] -= augmented[(i, j)] * result[j];
        }
        result[i] /= augmented[(i, i)];
    }

    true
}

/// Similarity transform moving the centroid of `points` to the origin with
/// mean distance `sqrt(2)` from it (Hartley normalisation).
///
/// Returns `None` if all points coincide.
pub fn normalising_transform<'a, P>(points: P) -> Option<Matrix3<f64>>
where
    P: IntoIterator<Item = &'a Point2> + Clone,
{
    let mut count = 0usize;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in points.clone() {
        cx += p.x;
        cy += p.y;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    cx /= count as f64;
    cy /= count as f64;

    let mean_dist = points
        .into_iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / count as f64;
    if mean_dist < 1e-12 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

/// Apply a 3x3 projective transform to a 2D point.
pub fn transform_point(t: &Matrix3<f64>, p: &Point2) -> Point2 {
    let x = t[(0, 0)] * p.x + t[(0, 1)] * p.y + t[(0, 2)];
    let y = t[(1, 0)] * p.x + t[(1, 1)] * p.y + t[(1, 2)];
    let w = t[(2, 0)] * p.x + t[(2, 1)] * p.y + t[(2, 2)];
    Point2::new(x / w, y / w)
}

/// Whether three points lie (numerically) on one line.
///
/// The triangle area is compared against the squared length of its longest
/// side so the test is scale invariant.
pub fn are_collinear(a: &Point2, b: &Point2, c: &Point2, tolerance: f64) -> bool {
    let ab = b - a;
    let ac = c - a;
    let bc = c - b;
    let cross = ab.x * ac.y - ab.y * ac.x;
    let scale = ab.norm_squared().max(ac.norm_squared()).max(bc.norm_squared());
    if scale < 1e-24 {
        return true;
    }
    cross.abs() <= tolerance * scale
}

/// Whether any three of the given points are collinear.
pub fn any_three_collinear(points: &[Point2], tolerance: f64) -> bool {
    let n = points.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if are_collinear(&points[i], &points[j], &points[k], tolerance) {
                    return true;
                }
            }
        }
    }
    false
}

/// Median of `values`, averaging the two middle elements for even lengths.
///
/// `values` is reordered in place. Returns `NaN` for an empty slice.
pub fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}
