//! Stopping conditions for the sampling loop.
//!
//! All conditions here are monotonic in the best inlier count: a better
//! model can only bring the stop earlier.

use crate::core::{StopDecision, StoppingCondition};
use crate::error::FitError;

/// Number of iterations needed to draw at least one all-inlier minimal
/// sample with probability `confidence`, given inlier ratio `inlier_ratio`.
///
/// Follows the standard formula
/// `N = ceil(log(1 - confidence) / log(1 - inlier_ratio^sample_size))`.
/// Returns `usize::MAX` when no inliers have been seen and `1` once every
/// correspondence is an inlier.
pub fn required_iterations(inlier_ratio: f64, sample_size: usize, confidence: f64) -> usize {
    if inlier_ratio.is_nan() || inlier_ratio <= 0.0 {
        return usize::MAX;
    }
    if inlier_ratio >= 1.0 {
        return 1;
    }

    let p_good_sample = inlier_ratio.powi(sample_size as i32);
    let log_one_minus_p = (-p_good_sample).ln_1p();
    if log_one_minus_p >= 0.0 {
        return usize::MAX;
    }

    let log_one_minus_conf = (1.0 - confidence.clamp(0.0, 1.0)).ln();
    let required = (log_one_minus_conf / log_one_minus_p).ceil();
    // Saturating float-to-int cast: an infinite bound maps to usize::MAX.
    (required as usize).max(1)
}

/// Adaptive RANSAC bound.
///
/// Keeps the smallest iteration requirement seen so far; the driver's
/// `max_iterations` caps it when the inlier ratio stays at zero.
#[derive(Debug, Clone)]
pub struct AdaptiveConfidence {
    /// Desired confidence in \[0, 1\].
    pub confidence: f64,
    required: usize,
}

impl AdaptiveConfidence {
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence,
            required: usize::MAX,
        }
    }

    /// Iterations currently required; `usize::MAX` before any inlier.
    pub fn required(&self) -> usize {
        self.required
    }
}

impl StoppingCondition for AdaptiveConfidence {
    fn init(&mut self, _n: usize, _sample_size: usize) -> Result<(), FitError> {
        self.required = usize::MAX;
        Ok(())
    }

    fn check(
        &mut self,
        iteration: usize,
        best_inliers: usize,
        n: usize,
        sample_size: usize,
    ) -> StopDecision {
        if n > 0 {
            let ratio = best_inliers as f64 / n as f64;
            let required = required_iterations(ratio, sample_size, self.confidence);
            self.required = self.required.min(required);
        }

        if iteration >= self.required {
            StopDecision::Stop
        } else {
            StopDecision::Continue
        }
    }
}

/// Stop once a fraction of the data are inliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentageInliers {
    /// Target inlier fraction in (0, 1\].
    pub target_fraction: f64,
}

impl PercentageInliers {
    pub fn new(target_fraction: f64) -> Self {
        Self { target_fraction }
    }
}

impl StoppingCondition for PercentageInliers {
    fn check(
        &mut self,
        _iteration: usize,
        best_inliers: usize,
        n: usize,
        _sample_size: usize,
    ) -> StopDecision {
        if n > 0 && best_inliers as f64 / n as f64 >= self.target_fraction {
            StopDecision::Stop
        } else {
            StopDecision::Continue
        }
    }
}

/// Stop once an absolute number of correspondences are inliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberInliers {
    pub limit: usize,
}

impl NumberInliers {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl StoppingCondition for NumberInliers {
    /// Raises the limit to at least the minimal sample size and rejects data
    /// sets too small to ever reach it.
    fn init(&mut self, n: usize, sample_size: usize) -> Result<(), FitError> {
        self.limit = self.limit.max(sample_size);
        if n < self.limit {
            return Err(FitError::InsufficientData {
                required: self.limit,
                actual: n,
            });
        }
        Ok(())
    }

    fn check(
        &mut self,
        _iteration: usize,
        best_inliers: usize,
        _n: usize,
        _sample_size: usize,
    ) -> StopDecision {
        if best_inliers >= self.limit {
            StopDecision::Stop
        } else {
            StopDecision::Continue
        }
    }
}

/// Never stops early: the loop runs to the iteration cap and keeps the model
/// with the most inliers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit;

impl StoppingCondition for BestFit {
    fn check(
        &mut self,
        _iteration: usize,
        _best_inliers: usize,
        _n: usize,
        _sample_size: usize,
    ) -> StopDecision {
        StopDecision::Continue
    }
}
