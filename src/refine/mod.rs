//! Refinement of the winning model on its consensus set.
//!
//! Refiners only propose a candidate; the driver accepts it when the summed
//! residual over the original consensus set does not increase, then
//! re-scores so that model and inlier set stay consistent.

mod homography;

pub use homography::{HomographyRefiner, TransferError};

use log::trace;

use crate::core::{CorrespondenceOf, Model, Refiner};

/// Re-estimates the model once from all inliers.
///
/// Requires a model whose `estimate` accepts non-minimal subsets. When the
/// re-estimate fails the original model is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquaresRefiner;

impl<M: Model> Refiner<M> for LeastSquaresRefiner {
    fn refine(
        &mut self,
        data: &[CorrespondenceOf<M>],
        model: &M,
        inliers: &[usize],
        _classify: &mut dyn FnMut(&M) -> Vec<usize>,
    ) -> Option<M> {
        if inliers.len() < model.sample_size() {
            return None;
        }
        let mut refined = model.clone();
        match refined.estimate(data, inliers) {
            Ok(()) => Some(refined),
            Err(err) => {
                trace!("least-squares refinement failed: {}", err);
                None
            }
        }
    }
}

/// Alternates least-squares re-estimation and re-classification until the
/// inlier set stops changing or `max_rounds` is reached.
#[derive(Debug, Clone, Copy)]
pub struct IterativeRefiner {
    pub max_rounds: usize,
}

impl Default for IterativeRefiner {
    fn default() -> Self {
        Self { max_rounds: 10 }
    }
}

impl IterativeRefiner {
    pub fn new(max_rounds: usize) -> Self {
        Self { max_rounds }
    }
}

impl<M: Model> Refiner<M> for IterativeRefiner {
    fn refine(
        &mut self,
        data: &[CorrespondenceOf<M>],
        model: &M,
        inliers: &[usize],
        classify: &mut dyn FnMut(&M) -> Vec<usize>,
    ) -> Option<M> {
        let mut current: Option<M> = None;
        let mut support = inliers.to_vec();

        for round in 0..self.max_rounds {
            if support.len() < model.sample_size() {
                break;
            }
            let mut candidate = current.as_ref().unwrap_or(model).clone();
            if candidate.estimate(data, &support).is_err() {
                trace!("iterative refinement stopped at round {}: estimate failed", round);
                break;
            }

            let next = classify(&candidate);
            current = Some(candidate);
            if next == support {
                trace!("iterative refinement converged after {} rounds", round + 1);
                break;
            }
            support = next;
        }

        current
    }
}
