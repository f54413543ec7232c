//! Random outcome generator
//!
//! The single source of randomness for every game. Backed by a seedable CSPRNG
//! so production draws come from OS entropy while tests and the simulator can
//! replay an exact sequence from a fixed seed.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::{OsRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};

/// Thread-safe random outcome generator shared by all resolvers
pub struct OutcomeGenerator {
    rng: Mutex<StdRng>,
    seed_commitment: String,
}

impl OutcomeGenerator {
    /// Seed from the operating system's entropy source
    pub fn from_entropy() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Deterministic generator for replay and tests
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let seed_commitment = hex::encode(Sha256::digest(seed));
        Self {
            rng: Mutex::new(StdRng::from_seed(seed)),
            seed_commitment,
        }
    }

    /// SHA-256 of the seed, hex encoded. Publishing it lets a seed revealed
    /// later be checked against the draws it produced.
    pub fn seed_commitment(&self) -> &str {
        &self.seed_commitment
    }

    /// Uniform float in [0, 1)
    pub fn uniform(&self) -> f64 {
        self.lock().gen::<f64>()
    }

    /// Uniform integer in [min, max], both inclusive
    pub fn uniform_int(&self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.lock().gen_range(min..=max)
    }

    pub fn coin_flip(&self) -> bool {
        self.lock().gen_bool(0.5)
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&self, items: &mut [T]) {
        items.shuffle(&mut *self.lock());
    }

    /// Index drawn with probability proportional to its weight.
    /// Returns None when the weights are empty or sum to zero.
    pub fn weighted_pick(&self, weights: &[u32]) -> Option<usize> {
        let index = WeightedIndex::new(weights).ok()?;
        Some(index.sample(&mut *self.lock()))
    }

    fn lock(&self) -> MutexGuard<'_, StdRng> {
        // A panic while holding the lock cannot leave the RNG in a torn state
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for OutcomeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeGenerator")
            .field("seed_commitment", &self.seed_commitment)
            .finish_non_exhaustive()
    }
}
