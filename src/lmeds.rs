//! Least Median of Squares.
//!
//! Instead of counting inliers under a fixed threshold, every hypothesis is
//! ranked by the median of its squared residuals. The inlier threshold is
//! derived afterwards, either from a known noise level or from a robust
//! estimate of the residual scale (Rousseeuw, 1984).

use log::{debug, trace, warn};

use crate::core::{
    sampling_failure_status, CancellationToken, CorrespondenceOf, Model, ResidualEvaluator, Sampler,
};
use crate::stopping::required_iterations;
use crate::types::{FitResult, FitStatus};
use crate::utils::median;

/// Consistency factor relating the median absolute residual to a Gaussian
/// standard deviation.
const MAD_TO_SIGMA: f64 = 1.4826;

/// Least-median-of-squares robust fitter.
#[derive(Debug, Clone)]
pub struct LeastMedianOfSquares {
    /// Probability that at least one drawn sample is outlier-free.
    pub confidence: f64,
    /// Expected outlier proportion. Sets the number of samples and the
    /// success criterion.
    pub outlier_proportion: f64,
    /// Known inlier noise standard deviation. `None` estimates it from the
    /// best median.
    pub inlier_noise_level: Option<f64>,
    /// Chi-squared quantile scaling the known noise level into a squared
    /// residual threshold. Only used with `inlier_noise_level`; `None` takes
    /// the two-degree-of-freedom quantile at `confidence`.
    pub noise_quantile: Option<f64>,
    /// Hard cap on the number of samples.
    pub max_iterations: usize,
    /// Maximum number of redraws when a sample is degenerate.
    pub max_degenerate_retries: usize,
    /// Re-estimate the best model from its inliers.
    pub refine: bool,
    cancellation: Option<CancellationToken>,
}

impl Default for LeastMedianOfSquares {
    fn default() -> Self {
        Self {
            confidence: 0.99,
            outlier_proportion: 0.4,
            inlier_noise_level: None,
            noise_quantile: None,
            max_iterations: 1000,
            max_degenerate_retries: 250,
            refine: true,
            cancellation: None,
        }
    }
}

impl LeastMedianOfSquares {
    pub fn new(outlier_proportion: f64) -> Self {
        Self {
            outlier_proportion,
            ..Self::default()
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Use a known noise level `sigma`; the squared-residual threshold
    /// becomes `sigma^2` times the chi-squared quantile.
    pub fn with_noise_level(mut self, sigma: f64) -> Self {
        self.inlier_noise_level = Some(sigma);
        self
    }

    /// Override the chi-squared quantile, e.g. for residuals with other than
    /// two degrees of freedom.
    pub fn with_noise_quantile(mut self, quantile: f64) -> Self {
        self.noise_quantile = Some(quantile);
        self
    }

    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Samples needed so that one is outlier-free with `confidence`.
    pub fn num_samples(&self, sample_size: usize) -> usize {
        required_iterations(1.0 - self.outlier_proportion, sample_size, self.confidence)
            .min(self.max_iterations)
    }

    /// Squared-residual threshold separating inliers from outliers.
    fn threshold(&self, n: usize, sample_size: usize, best_median: f64) -> f64 {
        match self.inlier_noise_level {
            Some(sigma) => {
                let quantile = self
                    .noise_quantile
                    .unwrap_or_else(|| chi_squared_2dof_quantile(self.confidence));
                sigma * sigma * quantile
            }
            None => {
                let dof = n.saturating_sub(sample_size).max(1) as f64;
                let sigma = MAD_TO_SIGMA * (1.0 + 5.0 / dof) * best_median.sqrt();
                (2.5 * sigma) * (2.5 * sigma)
            }
        }
    }

    /// Fit `model` to `data`.
    ///
    /// `residual` gives the unsquared residual; it is squared internally.
    ///
    /// # Panics
    ///
    /// If `data` is empty or smaller than the model's minimal sample.
    pub fn fit<M, S, R>(
        &self,
        data: &[CorrespondenceOf<M>],
        model: &M,
        sampler: &mut S,
        residual: &R,
    ) -> FitResult<M>
    where
        M: Model,
        S: Sampler,
        R: ResidualEvaluator<M>,
    {
        let n = data.len();
        let sample_size = model.sample_size();
        assert!(n > 0, "robust fitting requires at least one correspondence");
        assert!(
            sample_size <= n,
            "minimal sample of {} exceeds the {} correspondences supplied",
            sample_size,
            n
        );

        let num_samples = self.num_samples(sample_size);
        debug!("least median of squares: drawing {} samples", num_samples);

        let mut hypothesis = model.clone();
        let mut sample = vec![0usize; sample_size];
        let mut errors = Vec::with_capacity(n);
        let mut scratch = Vec::with_capacity(n);
        let mut best: Option<(M, f64)> = None;
        let mut iteration = 0;

        while iteration < num_samples {
            if self
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                warn!("least median of squares cancelled after {} samples", iteration);
                return FitResult::new(FitStatus::Cancelled, model.clone(), Vec::new(), iteration);
            }
            iteration += 1;

            if let Err(err) = sampler.draw_non_degenerate(
                &hypothesis,
                data,
                &mut sample,
                self.max_degenerate_retries,
            ) {
                warn!("sampling failed at sample {}: {}", iteration, err);
                match sampling_failure_status(err, best.is_some()) {
                    FitStatus::BoundExceeded => break,
                    status => {
                        return FitResult::new(status, model.clone(), Vec::new(), iteration)
                    }
                }
            }

            if let Err(err) = hypothesis.estimate(data, &sample) {
                trace!("sample {}: discarded hypothesis ({})", iteration, err);
                continue;
            }

            let med = median_squared(residual, &hypothesis, data, &mut errors, &mut scratch);
            if best.as_ref().map_or(true, |(_, b)| med < *b) {
                debug!("sample {}: new best median squared residual {:.6e}", iteration, med);
                best = Some((hypothesis.clone(), med));
            }
        }

        let Some((mut best_model, best_median)) = best else {
            return FitResult::new(FitStatus::NoValidModel, model.clone(), Vec::new(), iteration);
        };

        let threshold = self.threshold(n, sample_size, best_median);
        let mut inliers = classify(residual, &best_model, data, threshold);

        if self.refine && inliers.len() >= sample_size {
            let mut refined = best_model.clone();
            match refined.estimate(data, &inliers) {
                Ok(()) => {
                    let refined_median =
                        median_squared(residual, &refined, data, &mut errors, &mut scratch);
                    if refined_median <= best_median {
                        best_model = refined;
                        inliers = classify(residual, &best_model, data, threshold);
                    } else {
                        debug!(
                            "refinement rejected: median {:.6e} -> {:.6e}",
                            best_median, refined_median
                        );
                    }
                }
                Err(err) => trace!("refinement failed: {}", err),
            }
        }

        let outliers = n - inliers.len();
        let status = if (outliers as f64 / n as f64) < self.outlier_proportion {
            FitStatus::Converged
        } else {
            debug!(
                "{} of {} correspondences are outliers, above proportion {}",
                outliers, n, self.outlier_proportion
            );
            FitStatus::InsufficientConsensus { outliers }
        };

        if status.is_success() {
            FitResult::new(status, best_model, inliers, iteration)
        } else {
            FitResult::new(status, model.clone(), Vec::new(), iteration)
        }
    }
}

/// Inverse CDF of chi-squared with two degrees of freedom, `-2 ln(1 - p)`.
fn chi_squared_2dof_quantile(p: f64) -> f64 {
    -2.0 * (-p.clamp(0.0, 1.0)).ln_1p()
}

fn median_squared<M, R>(
    residual: &R,
    model: &M,
    data: &[CorrespondenceOf<M>],
    errors: &mut Vec<f64>,
    scratch: &mut Vec<f64>,
) -> f64
where
    M: Model,
    R: ResidualEvaluator<M>,
{
    residual.residuals(model, data, errors);
    scratch.clear();
    scratch.extend(errors.iter().map(|r| r * r));
    let med = median(scratch);
    if med.is_nan() {
        f64::INFINITY
    } else {
        med
    }
}

fn classify<M, R>(residual: &R, model: &M, data: &[CorrespondenceOf<M>], threshold: f64) -> Vec<usize>
where
    M: Model,
    R: ResidualEvaluator<M>,
{
    data.iter()
        .enumerate()
        .filter(|(_, c)| {
            let r = residual.residual(model, c);
            r * r < threshold
        })
        .map(|(i, _)| i)
        .collect()
}
