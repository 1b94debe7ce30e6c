//! Runtime selection of built-in components.
//!
//! The driver stays fully generic; these enums let configuration pick a
//! concrete component at runtime, with a `Dyn` escape hatch for custom
//! implementations.

use crate::core::{StopDecision, StoppingCondition};
use crate::error::FitError;
use crate::settings::{RansacSettings, StoppingRule};
use crate::stopping::{AdaptiveConfidence, BestFit, NumberInliers, PercentageInliers};

/// Runtime stopping condition selection.
pub enum StoppingChoice {
    Adaptive(AdaptiveConfidence),
    Percentage(PercentageInliers),
    Number(NumberInliers),
    BestFit(BestFit),
    Dyn(Box<dyn StoppingCondition + Send + Sync>),
}

impl StoppingChoice {
    /// The condition named by `settings.stopping`.
    pub fn from_settings(settings: &RansacSettings) -> Self {
        match settings.stopping {
            StoppingRule::AdaptiveConfidence => {
                StoppingChoice::Adaptive(AdaptiveConfidence::new(settings.confidence))
            }
            StoppingRule::InlierFraction(fraction) => {
                StoppingChoice::Percentage(PercentageInliers::new(fraction))
            }
            StoppingRule::InlierCount(limit) => StoppingChoice::Number(NumberInliers::new(limit)),
            StoppingRule::BestFit => StoppingChoice::BestFit(BestFit),
        }
    }
}

impl Default for StoppingChoice {
    fn default() -> Self {
        StoppingChoice::Adaptive(AdaptiveConfidence::new(0.99))
    }
}

impl std::fmt::Debug for StoppingChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoppingChoice::Adaptive(c) => f.debug_tuple("Adaptive").field(c).finish(),
            StoppingChoice::Percentage(c) => f.debug_tuple("Percentage").field(c).finish(),
            StoppingChoice::Number(c) => f.debug_tuple("Number").field(c).finish(),
            StoppingChoice::BestFit(c) => f.debug_tuple("BestFit").field(c).finish(),
            StoppingChoice::Dyn(_) => f.write_str("Dyn(..)"),
        }
    }
}

impl StoppingCondition for StoppingChoice {
    fn init(&mut self, n: usize, sample_size: usize) -> Result<(), FitError> {
        match self {
            StoppingChoice::Adaptive(c) => c.init(n, sample_size),
            StoppingChoice::Percentage(c) => c.init(n, sample_size),
            StoppingChoice::Number(c) => c.init(n, sample_size),
            StoppingChoice::BestFit(c) => c.init(n, sample_size),
            StoppingChoice::Dyn(c) => c.init(n, sample_size),
        }
    }

    fn check(
        &mut self,
        iteration: usize,
        best_inliers: usize,
        n: usize,
        sample_size: usize,
    ) -> StopDecision {
        match self {
            StoppingChoice::Adaptive(c) => c.check(iteration, best_inliers, n, sample_size),
            StoppingChoice::Percentage(c) => c.check(iteration, best_inliers, n, sample_size),
            StoppingChoice::Number(c) => c.check(iteration, best_inliers, n, sample_size),
            StoppingChoice::BestFit(c) => c.check(iteration, best_inliers, n, sample_size),
            StoppingChoice::Dyn(c) => c.check(iteration, best_inliers, n, sample_size),
        }
    }
}
