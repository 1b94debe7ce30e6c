//! Core traits and the robust fitting driver.
//!
//! The fitting engine is assembled from small components, each behind a
//! trait so that callers can swap in their own:
//! - [`Model`]: a parametric transform that can re-estimate itself from a
//!   subset of correspondences.
//! - [`ResidualEvaluator`]: scalar discrepancy of one correspondence.
//! - [`InlierClassifier`]: turns a residual into an inlier/outlier decision.
//! - [`Sampler`]: draws minimal samples, redrawing degenerate ones.
//! - [`StoppingCondition`]: decides when sampling may end.
//! - [`Refiner`]: optional re-estimation from the full consensus set.
//!
//! [`Ransac`] orchestrates them: sample, fit, score, keep the best, check
//! the stopping condition, and finally refine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::error::{EstimationError, FitError};
use crate::refine::LeastSquaresRefiner;
use crate::scoring::score_hypothesis;
use crate::settings::RansacSettings;
use crate::types::{Correspondence, FitResult, FitStatus};

/// Correspondence type consumed by a model.
pub type CorrespondenceOf<M> =
    Correspondence<<M as Model>::Independent, <M as Model>::Dependent>;

/// A parametric transform family that can be fitted to correspondences.
///
/// Implementations own their parameters; `estimate` overwrites them in
/// place. The driver works on its own clone, so the caller's instance is
/// never touched.
pub trait Model: Clone {
    /// Input observation type.
    type Independent;
    /// Output observation type.
    type Dependent;

    /// Size of a minimal sample for this model.
    fn sample_size(&self) -> usize;

    /// Re-estimate the parameters from `data[subset]`.
    ///
    /// Must accept subsets larger than [`sample_size`](Model::sample_size)
    /// (least-squares fit); refinement relies on it.
    fn estimate(
        &mut self,
        data: &[CorrespondenceOf<Self>],
        subset: &[usize],
    ) -> Result<(), EstimationError>;

    /// Predict the dependent value for `independent`.
    fn predict(&self, independent: &Self::Independent) -> Self::Dependent;

    /// Non-negative error of one correspondence under the current parameters.
    fn compute_error(&self, correspondence: &CorrespondenceOf<Self>) -> f64;

    /// Cheap check run before `estimate` to skip hopeless samples.
    fn is_degenerate(&self, _data: &[CorrespondenceOf<Self>], _subset: &[usize]) -> bool {
        false
    }
}

/// A model that can decide inlier membership itself.
pub trait ValidatingModel: Model {
    fn validate(&self, correspondence: &CorrespondenceOf<Self>) -> bool;
}

/// Scalar discrepancy between a fitted model and one correspondence.
pub trait ResidualEvaluator<M: Model> {
    /// Residual of a single correspondence. Larger means worse.
    fn residual(&self, model: &M, correspondence: &CorrespondenceOf<M>) -> f64;

    /// Residuals of the whole data set, one per correspondence, into `out`.
    fn residuals(&self, model: &M, data: &[CorrespondenceOf<M>], out: &mut Vec<f64>) {
        out.clear();
        out.extend(data.iter().map(|c| self.residual(model, c)));
    }
}

/// Inlier/outlier decision for one correspondence.
pub trait InlierClassifier<M: Model> {
    fn accept(&self, model: &M, correspondence: &CorrespondenceOf<M>, residual: f64) -> bool;
}

/// Source of minimal samples.
pub trait Sampler {
    /// Fill `out` with distinct indices in `[0, n)`.
    ///
    /// Returns `false` if a sample could not be drawn.
    fn draw(&mut self, n: usize, out: &mut [usize]) -> bool;

    /// Draw until `model` reports a non-degenerate sample.
    ///
    /// At most `1 + max_retries` draws are made. Returns the number of draws
    /// used, or [`FitError::SamplingExhausted`].
    fn draw_non_degenerate<M: Model>(
        &mut self,
        model: &M,
        data: &[CorrespondenceOf<M>],
        out: &mut [usize],
        max_retries: usize,
    ) -> Result<usize, FitError>
    where
        Self: Sized,
    {
        for attempt in 1..=max_retries.saturating_add(1) {
            if self.draw(data.len(), out) && !model.is_degenerate(data, out) {
                return Ok(attempt);
            }
            trace!("degenerate sample {:?} (attempt {})", out, attempt);
        }
        Err(FitError::SamplingExhausted {
            retries: max_retries,
        })
    }
}

/// Outcome of a stopping check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    Continue,
    Stop,
}

/// Decides, after each iteration, whether sampling can end.
///
/// Implementations must be monotonic: a larger `best_inliers` may only
/// bring the stop earlier.
pub trait StoppingCondition {
    /// Prepare for a run over `n` correspondences.
    fn init(&mut self, _n: usize, _sample_size: usize) -> Result<(), FitError> {
        Ok(())
    }

    /// `iteration` counts completed iterations, starting at 1.
    fn check(
        &mut self,
        iteration: usize,
        best_inliers: usize,
        n: usize,
        sample_size: usize,
    ) -> StopDecision;
}

/// Re-estimation of a model from its consensus set.
pub trait Refiner<M: Model> {
    /// Return a candidate replacement for `model`, or `None` to keep it.
    ///
    /// `classify` re-scores a candidate and returns its inlier indices.
    fn refine(
        &mut self,
        data: &[CorrespondenceOf<M>],
        model: &M,
        inliers: &[usize],
        classify: &mut dyn FnMut(&M) -> Vec<usize>,
    ) -> Option<M>;
}

/// Cooperative cancellation flag shared between a run and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Robust estimator orchestrating sampling, fitting, scoring and stopping.
///
/// Each run owns its model clone, sampler state and buffers, so independent
/// `Ransac` values may run concurrently on separate threads.
#[derive(Debug)]
pub struct Ransac<M, S, R, C, T, LO = LeastSquaresRefiner> {
    pub settings: RansacSettings,
    pub model: M,
    pub sampler: S,
    pub residual: R,
    pub classifier: C,
    pub stopping: T,
    pub refiner: LO,
    cancellation: Option<CancellationToken>,
}

impl<M, S, R, C, T> Ransac<M, S, R, C, T>
where
    M: Model,
    S: Sampler,
    R: ResidualEvaluator<M>,
    C: InlierClassifier<M>,
    T: StoppingCondition,
{
    /// Create a new estimator from its components.
    ///
    /// Refinement, when enabled in `settings`, uses [`LeastSquaresRefiner`].
    pub fn new(
        settings: RansacSettings,
        model: M,
        sampler: S,
        residual: R,
        classifier: C,
        stopping: T,
    ) -> Self {
        Self {
            settings,
            model,
            sampler,
            residual,
            classifier,
            stopping,
            refiner: LeastSquaresRefiner,
            cancellation: None,
        }
    }
}

impl<M, S, R, C, T, LO> Ransac<M, S, R, C, T, LO>
where
    M: Model,
    S: Sampler,
    R: ResidualEvaluator<M>,
    C: InlierClassifier<M>,
    T: StoppingCondition,
    LO: Refiner<M>,
{
    /// Replace the refinement strategy.
    pub fn with_refiner<LO2: Refiner<M>>(self, refiner: LO2) -> Ransac<M, S, R, C, T, LO2> {
        Ransac {
            settings: self.settings,
            model: self.model,
            sampler: self.sampler,
            residual: self.residual,
            classifier: self.classifier,
            stopping: self.stopping,
            refiner,
            cancellation: self.cancellation,
        }
    }

    /// Observe `token` at the top of every iteration.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Run the fitting loop on `data`.
    ///
    /// # Panics
    ///
    /// If `data` is empty or smaller than the model's minimal sample.
    pub fn run(&mut self, data: &[CorrespondenceOf<M>]) -> FitResult<M> {
        let n = data.len();
        let sample_size = self.model.sample_size();
        assert!(n > 0, "robust fitting requires at least one correspondence");
        assert!(
            sample_size <= n,
            "minimal sample of {} exceeds the {} correspondences supplied",
            sample_size,
            n
        );

        if let Err(err) = self.stopping.init(n, sample_size) {
            warn!("stopping condition rejected the data: {}", err);
            return FitResult::new(FitStatus::NoValidModel, self.model.clone(), Vec::new(), 0);
        }

        let mut hypothesis = self.model.clone();
        let mut sample = vec![0usize; sample_size];
        let mut residuals = Vec::with_capacity(n);
        let mut inliers = Vec::with_capacity(n);

        let mut best: Option<(M, Vec<usize>)> = None;
        let mut iteration = 0usize;

        let status = loop {
            if self.is_cancelled() {
                warn!("fitting cancelled after {} iterations", iteration);
                break FitStatus::Cancelled;
            }
            if iteration >= self.settings.max_iterations {
                break match best {
                    Some(_) => FitStatus::BoundExceeded,
                    None => FitStatus::NoValidModel,
                };
            }
            iteration += 1;

            if let Err(err) = self.sampler.draw_non_degenerate(
                &hypothesis,
                data,
                &mut sample,
                self.settings.max_degenerate_retries,
            ) {
                warn!("sampling failed in iteration {}: {}", iteration, err);
                break sampling_failure_status(err, best.is_some());
            }

            if let Err(err) = hypothesis.estimate(data, &sample) {
                trace!("iteration {}: discarded hypothesis ({})", iteration, err);
                continue;
            }

            score_hypothesis(
                &hypothesis,
                data,
                &self.residual,
                &self.classifier,
                &mut residuals,
                &mut inliers,
            );

            // Strictly more inliers replaces the best; ties keep the first found.
            let improved = best
                .as_ref()
                .map_or(true, |(_, best_inliers)| inliers.len() > best_inliers.len());
            if improved {
                debug!(
                    "iteration {}: new best model with {}/{} inliers",
                    iteration,
                    inliers.len(),
                    n
                );
                best = Some((hypothesis.clone(), inliers.clone()));
            }

            let best_count = best.as_ref().map_or(0, |(_, b)| b.len());
            if self.stopping.check(iteration, best_count, n, sample_size) == StopDecision::Stop {
                break FitStatus::Converged;
            }
        };

        let (model, inliers) = match best {
            Some(best) if status.is_success() => best,
            _ => return FitResult::new(status, self.model.clone(), Vec::new(), iteration),
        };

        let (model, inliers) = if self.settings.refine && inliers.len() >= sample_size {
            self.refine_best(data, model, inliers)
        } else {
            (model, inliers)
        };

        FitResult::new(status, model, inliers, iteration)
    }

    /// Refine the winner on its consensus set, keeping it only if the summed
    /// residual over that set does not increase.
    fn refine_best(
        &mut self,
        data: &[CorrespondenceOf<M>],
        model: M,
        inliers: Vec<usize>,
    ) -> (M, Vec<usize>) {
        let residual = &self.residual;
        let classifier = &self.classifier;
        let mut residuals = Vec::with_capacity(data.len());
        let mut classify = |candidate: &M| {
            let mut out = Vec::with_capacity(data.len());
            score_hypothesis(candidate, data, residual, classifier, &mut residuals, &mut out);
            out
        };

        let Some(refined) = self.refiner.refine(data, &model, &inliers, &mut classify) else {
            return (model, inliers);
        };

        let before = consensus_error(residual, &model, data, &inliers);
        let after = consensus_error(residual, &refined, data, &inliers);
        if after.is_nan() || after > before {
            debug!(
                "refinement rejected: consensus error {:.6e} -> {:.6e}",
                before, after
            );
            return (model, inliers);
        }

        let refined_inliers = classify(&refined);
        debug!(
            "refinement accepted: consensus error {:.6e} -> {:.6e}, {} -> {} inliers",
            before,
            after,
            inliers.len(),
            refined_inliers.len()
        );
        (refined, refined_inliers)
    }
}

/// Final status when the sampler gives up.
///
/// Cancellation always wins. Otherwise a run that already holds a model ends
/// as if the iteration bound was hit.
pub(crate) fn sampling_failure_status(err: FitError, has_model: bool) -> FitStatus {
    match err {
        FitError::Cancelled => FitStatus::Cancelled,
        _ if has_model => FitStatus::BoundExceeded,
        FitError::SamplingExhausted { retries } => FitStatus::SamplingExhausted { retries },
        _ => FitStatus::NoValidModel,
    }
}

/// Summed residual of `model` over `data[indices]`.
pub fn consensus_error<M, R>(
    residual: &R,
    model: &M,
    data: &[CorrespondenceOf<M>],
    indices: &[usize],
) -> f64
where
    M: Model,
    R: ResidualEvaluator<M>,
{
    indices
        .iter()
        .map(|&i| residual.residual(model, &data[i]))
        .sum()
}

/// Fit `model` robustly to `data` in a single call.
///
/// `model` is cloned; the caller's instance is left untouched and the
/// winning parameters are returned in the [`FitResult`].
pub fn fit<M, S, R, C, T>(
    data: &[CorrespondenceOf<M>],
    model: &M,
    sampler: S,
    residual: R,
    classifier: C,
    stopping: T,
    settings: &RansacSettings,
) -> FitResult<M>
where
    M: Model,
    S: Sampler,
    R: ResidualEvaluator<M>,
    C: InlierClassifier<M>,
    T: StoppingCondition,
{
    Ransac::new(
        settings.clone(),
        model.clone(),
        sampler,
        residual,
        classifier,
        stopping,
    )
    .run(data)
}
