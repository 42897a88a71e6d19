//! Seedable Gaussian noise for thermally driven junctions.
//!
//! Every model owns its own [`NoiseSource`]; nothing reads ambient global
//! random state, so a seeded source reproduces a run exactly.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// Owned pseudo-random generator producing zero-mean Gaussian samples.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: ChaCha8Rng,
}

impl NoiseSource {
    /// Create a deterministic source from a seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a source seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Draw one sample from N(0, std_dev²).
    ///
    /// A zero standard deviation returns exactly `0.0` without consuming
    /// randomness.
    pub fn gaussian(&mut self, std_dev: f64) -> f64 {
        if std_dev == 0.0 {
            return 0.0;
        }
        let z: f64 = StandardNormal.sample(&mut self.rng);
        std_dev * z
    }
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}
