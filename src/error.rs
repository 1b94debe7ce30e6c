//! Error types for model estimation and robust fitting.

use thiserror::Error;

/// Failure of a single model estimate from a subset of correspondences.
///
/// These are expected, high-frequency outcomes inside the fitting loop: the
/// driver discards the hypothesis and draws a new sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EstimationError {
    /// The subset does not determine a unique model (e.g. collinear points).
    #[error("degenerate sample: the subset does not determine a unique model")]
    DegenerateSample,

    /// The internal linear solve was singular or produced non-finite values.
    #[error("numerical failure while solving for model parameters")]
    NumericalFailure,
}

/// Unrecoverable outcome of a robust fitting run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    /// Every draw within the retry budget produced a degenerate sample.
    #[error("sampling exhausted after {retries} degenerate draws")]
    SamplingExhausted {
        /// Number of draws attempted before giving up.
        retries: usize,
    },

    /// The iteration cap was reached without a single valid model.
    #[error("stopping bound of {iterations} iterations exceeded without a valid model")]
    StoppingBoundExceeded {
        /// Iterations consumed.
        iterations: usize,
    },

    /// Not enough correspondences for the requested model or stopping rule.
    #[error("fitting requires at least {required} correspondences, got {actual}")]
    InsufficientData {
        /// Minimum number of correspondences required.
        required: usize,
        /// Number of correspondences supplied.
        actual: usize,
    },

    /// Independent and dependent inputs differ in length.
    #[error("mismatched input lengths: {left} != {right}")]
    MismatchedLengths {
        /// Length of the independent observations.
        left: usize,
        /// Length of the dependent observations.
        right: usize,
    },

    /// Least-median fitting left more outliers than the configured proportion.
    #[error("consensus too small: {outliers} outliers exceed the configured proportion")]
    InsufficientConsensus {
        /// Outliers of the best model.
        outliers: usize,
    },

    /// The run was cancelled through its [`CancellationToken`](crate::core::CancellationToken).
    #[error("fitting was cancelled")]
    Cancelled,
}
