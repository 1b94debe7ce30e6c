//! # Robust Fit - RANSAC-family model fitting
//!
//! `robust_fit` fits a parametric model to paired observations
//! (independent, dependent) that may contain a large share of gross
//! outliers. It implements RANSAC with an adaptive stopping bound and
//! Least Median of Squares, and ships homography, affine and line models.
//!
//! ## Quick Start
//!
//! The easiest way in is through the high-level API functions:
//!
//! ```rust
//! use robust_fit::{estimate_homography, Point2, RansacSettings};
//!
//! let points1 = [
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//!     Point2::new(0.5, 0.3),
//! ];
//! let points2: Vec<Point2> = points1.iter().map(|p| Point2::new(p.x + 1.0, p.y + 2.0)).collect();
//!
//! let settings = RansacSettings::default().with_seed(42);
//! let result = estimate_homography(&points1, &points2, 1e-6, Some(settings)).unwrap();
//! assert!(result.success);
//! assert_eq!(result.inliers.len(), 5);
//! ```
//!
//! ## Extending the Library
//!
//! Every stage of the fitting loop sits behind a trait:
//!
//! - **[`Model`](core::Model)**: a parametric transform that re-estimates
//!   itself from a subset of correspondences
//! - **[`ResidualEvaluator`](core::ResidualEvaluator)**: scalar discrepancy
//!   of one correspondence
//! - **[`InlierClassifier`](core::InlierClassifier)**: inlier/outlier decision
//! - **[`Sampler`](core::Sampler)**: minimal sample generation
//! - **[`StoppingCondition`](core::StoppingCondition)**: when sampling may end
//! - **[`Refiner`](core::Refiner)**: re-estimation from the consensus set
//!
//! ### Example: Custom Model
//!
//! ```rust
//! use robust_fit::core::{CorrespondenceOf, Model, Ransac};
//! use robust_fit::error::EstimationError;
//! use robust_fit::residuals::ModelResidual;
//! use robust_fit::samplers::UniformSampler;
//! use robust_fit::scoring::ThresholdClassifier;
//! use robust_fit::stopping::AdaptiveConfidence;
//! use robust_fit::{Correspondence, RansacSettings};
//!
//! /// `y = k * x`
//! #[derive(Clone, Debug)]
//! struct Proportional {
//!     k: f64,
//! }
//!
//! impl Model for Proportional {
//!     type Independent = f64;
//!     type Dependent = f64;
//!
//!     fn sample_size(&self) -> usize {
//!         1
//!     }
//!
//!     fn estimate(
//!         &mut self,
//!         data: &[CorrespondenceOf<Self>],
//!         subset: &[usize],
//!     ) -> Result<(), EstimationError> {
//!         let sxx: f64 = subset.iter().map(|&i| data[i].independent().powi(2)).sum();
//!         if sxx == 0.0 {
//!             return Err(EstimationError::DegenerateSample);
//!         }
//!         let sxy: f64 = subset
//!             .iter()
//!             .map(|&i| data[i].independent() * data[i].dependent())
//!             .sum();
//!         self.k = sxy / sxx;
//!         Ok(())
//!     }
//!
//!     fn predict(&self, x: &f64) -> f64 {
//!         self.k * x
//!     }
//!
//!     fn compute_error(&self, c: &CorrespondenceOf<Self>) -> f64 {
//!         (self.predict(c.independent()) - c.dependent()).abs()
//!     }
//! }
//!
//! let mut data: Vec<_> = (1..20).map(|i| Correspondence::new(i as f64, 2.0 * i as f64)).collect();
//! data.push(Correspondence::new(3.0, 40.0));
//!
//! let settings = RansacSettings::default();
//! let mut ransac = Ransac::new(
//!     settings.clone(),
//!     Proportional { k: 0.0 },
//!     UniformSampler::from_seed(7),
//!     ModelResidual,
//!     ThresholdClassifier::new(1e-9),
//!     AdaptiveConfidence::new(settings.confidence),
//! );
//! let result = ransac.run(&data);
//! assert!(result.success);
//! assert_eq!(result.outliers(data.len()), vec![19]);
//! assert!((result.model.k - 2.0).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - **[`api`]**: High-level functions for the bundled models
//! - **[`core`]**: Component traits and the [`Ransac`] driver
//! - **[`estimators`]**: Homography, affine and line models
//! - **[`lmeds`]**: Least Median of Squares
//! - **[`refine`]**: Consensus-set refinement, linear and Levenberg-Marquardt
//! - **[`residuals`]**, **[`scoring`]**, **[`samplers`]**, **[`stopping`]**:
//!   built-in components
//! - **[`choices`]**: Runtime selection of the stopping condition
//! - **[`settings`]**: Configuration types
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade: `debug!` for each improved
//! model and refinement decision, `trace!` for discarded hypotheses, `warn!`
//! for sampling exhaustion and cancellation.

pub mod api;
pub mod choices;
pub mod core;
pub mod error;
pub mod estimators;
pub mod lmeds;
pub mod refine;
pub mod residuals;
pub mod samplers;
pub mod scoring;
pub mod settings;
pub mod stopping;
pub mod types;
pub mod utils;

// Re-export high-level API
pub use api::{estimate, estimate_affine, estimate_homography, estimate_line};

// Re-export core traits and the driver for easy access
pub use crate::core::{
    fit, CancellationToken, InlierClassifier, Model, Ransac, Refiner, ResidualEvaluator, Sampler,
    StoppingCondition,
};

pub use error::{EstimationError, FitError};
pub use estimators::{AffineModel, HomographyModel, LineModel};
pub use lmeds::LeastMedianOfSquares;
pub use refine::{HomographyRefiner, IterativeRefiner, LeastSquaresRefiner, TransferError};
pub use settings::{RansacSettings, StoppingRule};
pub use types::{Correspondence, FitResult, FitStatus, Point2};
