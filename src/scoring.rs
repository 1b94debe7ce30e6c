//! Inlier classification and hypothesis scoring.
//!
//! A hypothesis is scored by computing the residual of every correspondence
//! and asking an [`InlierClassifier`] whether it is consistent with the
//! model. The score of a hypothesis is the size of its consensus set.

use crate::core::{CorrespondenceOf, InlierClassifier, Model, ResidualEvaluator, ValidatingModel};

/// Fixed threshold on the residual: inlier iff `residual <= threshold`.
///
/// The threshold is set once at construction so inlier counts stay
/// comparable across iterations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdClassifier {
    threshold: f64,
}

impl ThresholdClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl<M: Model> InlierClassifier<M> for ThresholdClassifier {
    fn accept(&self, _model: &M, _correspondence: &CorrespondenceOf<M>, residual: f64) -> bool {
        residual <= self.threshold
    }
}

/// Lets the model decide, for error semantics a threshold cannot express.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelPredicateClassifier;

impl<M: ValidatingModel> InlierClassifier<M> for ModelPredicateClassifier {
    fn accept(&self, model: &M, correspondence: &CorrespondenceOf<M>, _residual: f64) -> bool {
        model.validate(correspondence)
    }
}

/// Score `model` on `data`: fills `residuals` (one per correspondence) and
/// `inliers` (ascending indices), and returns the inlier count.
pub fn score_hypothesis<M, R, C>(
    model: &M,
    data: &[CorrespondenceOf<M>],
    residual: &R,
    classifier: &C,
    residuals: &mut Vec<f64>,
    inliers: &mut Vec<usize>,
) -> usize
where
    M: Model,
    R: ResidualEvaluator<M>,
    C: InlierClassifier<M>,
{
    residual.residuals(model, data, residuals);
    inliers.clear();
    for (i, (c, &r)) in data.iter().zip(residuals.iter()).enumerate() {
        if classifier.accept(model, c, r) {
            inliers.push(i);
        }
    }
    inliers.len()
}
