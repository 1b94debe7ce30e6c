//! Sampling strategies for minimal samples.
//!
//! Samplers implement [`Sampler`](crate::core::Sampler) and own their random
//! state, so a run seeded with a fixed value is reproducible. Degenerate
//! samples are redrawn by the trait's provided
//! [`draw_non_degenerate`](crate::core::Sampler::draw_non_degenerate).

pub mod uniform;

pub use uniform::UniformSampler;
