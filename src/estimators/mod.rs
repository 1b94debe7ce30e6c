//! Bundled geometric models.
//!
//! - Homography (4-point minimal sample)
//! - Affine transform (3-point minimal sample)
//! - Line (2-point minimal sample)

pub mod affine;
pub mod homography;
pub mod line;

pub use affine::AffineModel;
pub use homography::{HomographyModel, SymmetricTransferResidual};
pub use line::LineModel;
