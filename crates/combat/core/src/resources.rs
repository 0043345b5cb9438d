//! Resource ledger: per-actor bounded counters.
//!
//! Every pool is an integer in `[0, maximum]`. The only way to change a pool
//! is [`ResourceLedger::adjust`], which clamps and reports how much of the
//! requested delta actually landed. Adjusting a kind the actor does not carry
//! is a no-op that reports zero, so a rage-spending reaction can run against a
//! caster that has no rage without special casing.

use arrayvec::ArrayVec;

use crate::config::EngineConfig;

/// Resource kinds an actor may carry.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumCount,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Mana,
    Rage,
    Energy,
    Focus,
    ComboPoints,
    RunicPower,
    HolyPower,
    SoulShards,
}

const _: () = assert!(
    <ResourceKind as strum::EnumCount>::COUNT <= EngineConfig::MAX_RESOURCE_KINDS,
    "every resource kind must fit in a ledger"
);

/// One bounded counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourcePool {
    pub kind: ResourceKind,
    current: u32,
    maximum: u32,
}

impl ResourcePool {
    /// Creates a pool, clamping `current` into `[0, maximum]`.
    pub fn new(kind: ResourceKind, current: u32, maximum: u32) -> Self {
        Self {
            kind,
            current: current.min(maximum),
            maximum,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn maximum(&self) -> u32 {
        self.maximum
    }

    pub fn is_full(&self) -> bool {
        self.current == self.maximum
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Applies `delta`, clamped to the pool bounds, and returns the delta that
    /// was actually applied.
    pub fn adjust(&mut self, delta: i32) -> i32 {
        let before = self.current as i64;
        let after = (before + delta as i64).clamp(0, self.maximum as i64);
        self.current = after as u32;
        (after - before) as i32
    }

    /// Changes the maximum, pulling the current value down if it no longer fits.
    pub fn set_maximum(&mut self, maximum: u32) {
        self.maximum = maximum;
        self.current = self.current.min(maximum);
    }
}

/// All resource pools owned by one actor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceLedger {
    pools: ArrayVec<ResourcePool, { EngineConfig::MAX_RESOURCE_KINDS }>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: adds (or replaces) a pool.
    #[must_use]
    pub fn with_pool(mut self, kind: ResourceKind, current: u32, maximum: u32) -> Self {
        self.insert_pool(kind, current, maximum);
        self
    }

    /// Adds a pool, replacing an existing pool of the same kind.
    pub fn insert_pool(&mut self, kind: ResourceKind, current: u32, maximum: u32) {
        let pool = ResourcePool::new(kind, current, maximum);
        if let Some(existing) = self.pool_mut(kind) {
            *existing = pool;
        } else {
            // Capacity covers every ResourceKind variant (checked at compile time).
            self.pools.push(pool);
        }
    }

    /// Removes a pool entirely.
    pub fn remove_pool(&mut self, kind: ResourceKind) {
        self.pools.retain(|p| p.kind != kind);
    }

    /// Current value of a pool, or `None` if the actor does not use that kind.
    pub fn peek(&self, kind: ResourceKind) -> Option<u32> {
        self.pool(kind).map(ResourcePool::current)
    }

    pub fn maximum(&self, kind: ResourceKind) -> Option<u32> {
        self.pool(kind).map(ResourcePool::maximum)
    }

    pub fn has(&self, kind: ResourceKind) -> bool {
        self.pool(kind).is_some()
    }

    /// Applies a clamped delta and returns the applied amount.
    ///
    /// Unknown kinds are a no-op and return 0.
    pub fn adjust(&mut self, kind: ResourceKind, delta: i32) -> i32 {
        match self.pool_mut(kind) {
            Some(pool) => pool.adjust(delta),
            None => 0,
        }
    }

    /// Changes a pool's maximum. Unknown kinds are ignored.
    pub fn set_maximum(&mut self, kind: ResourceKind, maximum: u32) {
        if let Some(pool) = self.pool_mut(kind) {
            pool.set_maximum(maximum);
        }
    }

    pub fn pool(&self, kind: ResourceKind) -> Option<&ResourcePool> {
        self.pools.iter().find(|p| p.kind == kind)
    }

    fn pool_mut(&mut self, kind: ResourceKind) -> Option<&mut ResourcePool> {
        self.pools.iter_mut().find(|p| p.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourcePool> {
        self.pools.iter()
    }
}
