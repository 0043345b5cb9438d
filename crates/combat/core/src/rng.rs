//! Random source oracle for proc rolls.
//!
//! Every probability check in the engine goes through [`RandomSource`], which
//! the host injects. Implementations must be deterministic for a given seed so
//! that a recorded fight can be replayed roll for roll.

use crate::config::EngineConfig;

/// Injected source of randomness.
pub trait RandomSource {
    /// Produces the next 32-bit value of the sequence.
    fn next_u32(&mut self) -> u32;

    /// Rolls a value in `[0, BASIS_POINTS)`.
    fn roll_basis_points(&mut self) -> u32 {
        self.next_u32() % EngineConfig::BASIS_POINTS
    }

    /// Succeeds with probability `basis_points / BASIS_POINTS`.
    ///
    /// Certain outcomes (zero or at least `BASIS_POINTS`) consume no roll.
    fn chance(&mut self, basis_points: u32) -> bool {
        if basis_points == 0 {
            return false;
        }
        if basis_points >= EngineConfig::BASIS_POINTS {
            return true;
        }
        self.roll_basis_points() < basis_points
    }

    /// Picks an index in `[0, len)`, or `None` for an empty range.
    fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.next_u32() as usize % len)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u32(&mut self) -> u32 {
        (**self).next_u32()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_u32(&mut self) -> u32 {
        (**self).next_u32()
    }
}

/// PCG-XSH-RR generator: 64-bit state, 32-bit output.
///
/// Same seed, same sequence. The generator is `Copy` so a caller can fork a
/// sequence for a dry run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcgRandom {
    state: u64,
}

impl PcgRandom {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        Self {
            state: Self::step(seed),
        }
    }

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RandomSource for PcgRandom {
    fn next_u32(&mut self) -> u32 {
        let current = self.state;
        self.state = Self::step(current);
        Self::output(current)
    }
}

/// Replays a fixed list of values, cycling when exhausted.
///
/// Values are returned verbatim from `next_u32`, so `FixedRolls::new([2_500])`
/// makes every basis-point roll land on 2 500.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedRolls {
    values: Vec<u32>,
    cursor: usize,
}

impl FixedRolls {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
            cursor: 0,
        }
    }

    /// Number of values handed out so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for FixedRolls {
    fn next_u32(&mut self) -> u32 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcg_is_deterministic_per_seed() {
        let mut a = PcgRandom::new(42);
        let mut b = PcgRandom::new(42);
        let mut c = PcgRandom::new(43);

        let left: Vec<u32> = (0..16).map(|_| a.next_u32()).collect();
        let right: Vec<u32> = (0..16).map(|_| b.next_u32()).collect();
        let other: Vec<u32> = (0..16).map(|_| c.next_u32()).collect();

        assert_eq!(left, right);
        assert_ne!(left, other);
    }

    #[test]
    fn certain_chances_do_not_consume_rolls() {
        let mut rolls = FixedRolls::new([9_999]);
        assert!(rolls.chance(EngineConfig::BASIS_POINTS));
        assert!(!rolls.chance(0));
        assert_eq!(rolls.consumed(), 0);

        assert!(!rolls.chance(5_000));
        assert_eq!(rolls.consumed(), 1);
    }

    #[test]
    fn rolls_below_threshold_succeed() {
        let mut rolls = FixedRolls::new([1_999, 2_000]);
        assert!(rolls.chance(2_000));
        assert!(!rolls.chance(2_000));
    }

    #[test]
    fn pick_handles_empty_range() {
        let mut rng = PcgRandom::new(7);
        assert_eq!(rng.pick(0), None);
        assert!(rng.pick(3).is_some_and(|i| i < 3));
    }
}
