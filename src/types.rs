//! Core shared types: correspondences and fitting results.
//!
//! A fitting run consumes an ordered slice of [`Correspondence`] values and
//! produces a [`FitResult`]. Indices reported in the result (inliers,
//! outliers) refer to positions in that slice, so the caller must not reorder
//! it between fitting and reading the result.

use crate::error::FitError;

/// 2D point used by the bundled geometric models.
pub type Point2 = nalgebra::Point2<f64>;

/// Immutable pairing of an independent observation with a dependent one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence<I, D> {
    independent: I,
    dependent: D,
}

impl<I, D> Correspondence<I, D> {
    pub fn new(independent: I, dependent: D) -> Self {
        Self {
            independent,
            dependent,
        }
    }

    /// The independent (input) observation.
    pub fn independent(&self) -> &I {
        &self.independent
    }

    /// The dependent (observed output) value.
    pub fn dependent(&self) -> &D {
        &self.dependent
    }

    /// Exchange the roles of the two observations.
    pub fn swap(self) -> Correspondence<D, I> {
        Correspondence::new(self.dependent, self.independent)
    }

    pub fn into_inner(self) -> (I, D) {
        (self.independent, self.dependent)
    }
}

impl<I, D> From<(I, D)> for Correspondence<I, D> {
    fn from((independent, dependent): (I, D)) -> Self {
        Self::new(independent, dependent)
    }
}

/// Pair up two equally sized slices of observations.
pub fn zip_correspondences<I: Clone, D: Clone>(
    independent: &[I],
    dependent: &[D],
) -> Result<Vec<Correspondence<I, D>>, FitError> {
    if independent.len() != dependent.len() {
        return Err(FitError::MismatchedLengths {
            left: independent.len(),
            right: dependent.len(),
        });
    }
    Ok(independent
        .iter()
        .zip(dependent)
        .map(|(i, d)| Correspondence::new(i.clone(), d.clone()))
        .collect())
}

/// Terminal state of a fitting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// The stopping condition was satisfied.
    Converged,
    /// The iteration cap was hit before the stopping condition was satisfied;
    /// the best model found so far is returned with lower confidence.
    BoundExceeded,
    /// Degenerate-sample retries were exhausted.
    SamplingExhausted {
        /// Draws attempted in the failing iteration.
        retries: usize,
    },
    /// The iteration cap was hit without a single valid model.
    NoValidModel,
    /// The best least-median model leaves too many outliers.
    InsufficientConsensus {
        /// Outliers of the best model.
        outliers: usize,
    },
    /// The run observed its cancellation flag.
    Cancelled,
}

impl FitStatus {
    pub fn is_success(self) -> bool {
        matches!(self, FitStatus::Converged | FitStatus::BoundExceeded)
    }
}

/// Outcome of a robust fitting run.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult<M> {
    /// Whether a model was accepted.
    pub success: bool,
    /// How the run terminated.
    pub status: FitStatus,
    /// The winning model. On failure this is the model as passed in.
    pub model: M,
    /// Indices of the correspondences consistent with `model`, ascending.
    pub inliers: Vec<usize>,
    /// Number of iterations consumed.
    pub iterations: usize,
}

impl<M> FitResult<M> {
    pub(crate) fn new(status: FitStatus, model: M, inliers: Vec<usize>, iterations: usize) -> Self {
        Self {
            success: status.is_success(),
            status,
            model,
            inliers,
            iterations,
        }
    }

    /// Indices in `[0, n)` that are not inliers.
    pub fn outliers(&self, n: usize) -> Vec<usize> {
        let mut outliers = Vec::with_capacity(n.saturating_sub(self.inliers.len()));
        let mut next = self.inliers.iter().peekable();
        for i in 0..n {
            if next.peek() == Some(&&i) {
                next.next();
            } else {
                outliers.push(i);
            }
        }
        outliers
    }

    /// Fraction of the `n` correspondences classified as inliers.
    pub fn inlier_ratio(&self, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        self.inliers.len() as f64 / n as f64
    }

    /// The error behind a failed run, `None` on success.
    pub fn error(&self) -> Option<FitError> {
        match self.status {
            FitStatus::Converged | FitStatus::BoundExceeded => None,
            FitStatus::SamplingExhausted { retries } => Some(FitError::SamplingExhausted { retries }),
            FitStatus::NoValidModel => Some(FitError::StoppingBoundExceeded {
                iterations: self.iterations,
            }),
            FitStatus::InsufficientConsensus { outliers } => {
                Some(FitError::InsufficientConsensus { outliers })
            }
            FitStatus::Cancelled => Some(FitError::Cancelled),
        }
    }
}
