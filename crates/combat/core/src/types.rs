//! Identifiers and the engine's unit of time.
//!
//! All identifiers are opaque integers handed out by the host's static data.
//! The engine never interprets them beyond equality and ordering.

use std::fmt;

/// Unique identifier of an actor (player or creature) in the host world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an aura definition (the static description, not an instance).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraId(pub u32);

impl fmt::Display for AuraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aura:{}", self.0)
    }
}

/// Identifier of a castable ability in the host's catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityId(pub u32);

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ability:{}", self.0)
    }
}

/// Identifier of a shared cooldown / charge category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryId(pub u32);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "category:{}", self.0)
    }
}

/// Absolute game time in milliseconds.
///
/// Durations are plain `u64` millisecond counts; signed adjustments use `i64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Self = Self(0);

    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds from `earlier` to `self`, zero if `earlier` is later.
    pub const fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Shifts the tick by a signed offset, saturating at zero.
    pub fn offset(self, delta: i64) -> Tick {
        if delta >= 0 {
            Tick(self.0.saturating_add(delta as u64))
        } else {
            Tick(self.0.saturating_sub(delta.unsigned_abs()))
        }
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_saturates_at_zero() {
        assert_eq!(Tick(100).offset(-250), Tick::ZERO);
        assert_eq!(Tick(100).offset(-40), Tick(60));
        assert_eq!(Tick(100).offset(25), Tick(125));
    }

    #[test]
    fn since_never_underflows() {
        assert_eq!(Tick(50).since(Tick(80)), 0);
        assert_eq!(Tick(80).since(Tick(50)), 30);
    }
}
