//! Configuration for robust fitting runs.
//!
//! [`RansacSettings`] gathers the knobs a caller may tune: the inlier
//! threshold, the stopping target (confidence or inlier fraction), the
//! iteration and degenerate-retry caps, the RNG seed and whether to refine
//! the winning model on its full consensus set.

/// Stopping rule selected by the convenience API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoppingRule {
    /// Adaptive RANSAC bound driven by `confidence`.
    AdaptiveConfidence,
    /// Stop once this fraction of the data are inliers.
    InlierFraction(f64),
    /// Stop once this many correspondences are inliers.
    InlierCount(usize),
    /// Run to the iteration cap and keep the best model.
    BestFit,
}

/// Main configuration object for a fitting run.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacSettings {
    /// Absolute iteration cap; guarantees termination.
    pub max_iterations: usize,
    /// Maximum number of redraws when a sample is degenerate.
    pub max_degenerate_retries: usize,
    /// Inlier threshold in the residual domain.
    pub inlier_threshold: f64,
    /// Desired confidence in \[0, 1\] for the adaptive stopping rule.
    pub confidence: f64,
    /// Stopping rule.
    pub stopping: StoppingRule,
    /// Seed for the sampler RNG. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Re-estimate the winning model from its whole inlier set.
    pub refine: bool,
}

impl Default for RansacSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_degenerate_retries: 250,
            inlier_threshold: 1.5,
            confidence: 0.99,
            stopping: StoppingRule::AdaptiveConfidence,
            seed: None,
            refine: true,
        }
    }
}

impl RansacSettings {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_degenerate_retries(mut self, retries: usize) -> Self {
        self.max_degenerate_retries = retries;
        self
    }

    pub fn with_inlier_threshold(mut self, threshold: f64) -> Self {
        self.inlier_threshold = threshold;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_stopping(mut self, stopping: StoppingRule) -> Self {
        self.stopping = stopping;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }
}
