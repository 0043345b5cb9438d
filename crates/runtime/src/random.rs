//! `rand`-backed random source.
use combat_core::RandomSource;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Seedable random source built on [`StdRng`].
#[derive(Clone, Debug)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeds from the operating system. Rolls are not reproducible.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }
}
