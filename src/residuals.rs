//! Residual evaluators.
//!
//! A residual is the scalar discrepancy between a fitted model and one
//! correspondence. [`ModelResidual`] defers to the model's own error;
//! [`DistanceResidual`] compares the model's prediction with the observed
//! dependent value through an injected distance or similarity function.

use crate::core::{CorrespondenceOf, Model, ResidualEvaluator};

/// Residual given by [`Model::compute_error`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelResidual;

impl<M: Model> ResidualEvaluator<M> for ModelResidual {
    fn residual(&self, model: &M, correspondence: &CorrespondenceOf<M>) -> f64 {
        model.compute_error(correspondence)
    }
}

/// Whether a comparison function measures distance or similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Larger values mean further apart.
    Distance,
    /// Larger values mean more alike; the residual is the negated value.
    Similarity,
}

/// Residual comparing `model.predict(independent)` with the observed value.
#[derive(Debug, Clone, Copy)]
pub struct DistanceResidual<F> {
    measure: F,
    comparison: Comparison,
}

impl<F> DistanceResidual<F> {
    /// Use `measure` as a distance: the residual is its value.
    pub fn distance(measure: F) -> Self {
        Self {
            measure,
            comparison: Comparison::Distance,
        }
    }

    /// Use `measure` as a similarity: the residual is its negation, so it
    /// still grows with dissimilarity.
    pub fn similarity(measure: F) -> Self {
        Self {
            measure,
            comparison: Comparison::Similarity,
        }
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
}

impl<M, F> ResidualEvaluator<M> for DistanceResidual<F>
where
    M: Model,
    F: Fn(&M::Dependent, &M::Dependent) -> f64,
{
    fn residual(&self, model: &M, correspondence: &CorrespondenceOf<M>) -> f64 {
        let predicted = model.predict(correspondence.independent());
        let value = (self.measure)(&predicted, correspondence.dependent());
        match self.comparison {
            Comparison::Distance => value,
            Comparison::Similarity => -value,
        }
    }
}

/// Squares the residual of the wrapped evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredResidual<R>(pub R);

impl<M, R> ResidualEvaluator<M> for SquaredResidual<R>
where
    M: Model,
    R: ResidualEvaluator<M>,
{
    fn residual(&self, model: &M, correspondence: &CorrespondenceOf<M>) -> f64 {
        let r = self.0.residual(model, correspondence);
        r * r
    }
}
