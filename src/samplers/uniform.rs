//! Uniform random sampler drawing minimal samples without replacement.

use rand::rngs::StdRng;
use rand::Rng;

use crate::core::Sampler;
use crate::utils::UniformRandomGenerator;

/// Uniform random sampler drawing minimal samples without replacement.
///
/// The RNG is injected; use [`UniformSampler::from_seed`] for reproducible
/// runs.
#[derive(Debug, Clone)]
pub struct UniformSampler<R = StdRng> {
    rng: UniformRandomGenerator<R>,
}

impl UniformSampler<StdRng> {
    /// Construct a sampler with a random seed.
    pub fn from_entropy() -> Self {
        Self {
            rng: UniformRandomGenerator::from_entropy(),
        }
    }

    /// Construct a sampler from a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: UniformRandomGenerator::from_seed(seed),
        }
    }

    /// Seeded when `seed` is given, from entropy otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> UniformSampler<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng: UniformRandomGenerator::new(rng),
        }
    }
}

impl<R: Rng> Sampler for UniformSampler<R> {
    fn draw(&mut self, n: usize, out: &mut [usize]) -> bool {
        if out.is_empty() {
            return false;
        }
        self.rng.gen_unique(out, n)
    }
}
