//! Boundary between the engine and the embedding game server.
//!
//! The engine never calculates damage, moves units or talks to clients. When
//! a reaction needs something done in the world it describes the request with
//! the types here and hands it to a [`HostWorld`]; the host reports what
//! happened and the engine reacts only to that report.

use std::collections::{BTreeSet, HashSet};

use bitflags::bitflags;

use crate::aura::{AuraHandle, StatKind};
use crate::config::EngineConfig;
use crate::types::{AbilityId, ActorId, AuraId};

bitflags! {
    /// Cast checks the host should skip for an engine-issued cast.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TriggerFlags: u8 {
        const IGNORE_POWER_COST      = 1 << 0;
        const IGNORE_COOLDOWN        = 1 << 1;
        const IGNORE_GLOBAL_COOLDOWN = 1 << 2;
        const SUPPRESS_ERRORS        = 1 << 3;

        /// Usual flags for a cast triggered by an aura.
        const TRIGGERED = Self::IGNORE_POWER_COST.bits()
            | Self::IGNORE_COOLDOWN.bits()
            | Self::IGNORE_GLOBAL_COOLDOWN.bits()
            | Self::SUPPRESS_ERRORS.bits();
    }
}

/// Links a triggered cast back to whatever caused it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CastOrigin {
    pub aura: Option<AuraId>,
    pub handle: Option<AuraHandle>,
    pub ability: Option<AbilityId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CastOptions {
    pub flags: TriggerFlags,
    /// Explicit base points per effect index of the cast ability.
    pub base_points: [Option<i32>; EngineConfig::MAX_BASE_POINT_OVERRIDES],
    pub origin: Option<CastOrigin>,
}

impl CastOptions {
    /// Options for a cast triggered by the engine.
    pub fn triggered() -> Self {
        Self {
            flags: TriggerFlags::TRIGGERED,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: TriggerFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Overrides the base points of effect `index`. Indices past
    /// `MAX_BASE_POINT_OVERRIDES` are ignored.
    #[must_use]
    pub fn with_base_point(mut self, index: usize, value: i32) -> Self {
        if let Some(slot) = self.base_points.get_mut(index) {
            *slot = Some(value);
        }
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: CastOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn base_point(&self, index: usize) -> Option<i32> {
        self.base_points.get(index).copied().flatten()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CastRequest {
    pub caster: ActorId,
    pub target: ActorId,
    pub ability: AbilityId,
    pub options: CastOptions,
}

/// Why the host refused a cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum CastFailure {
    UnknownAbility,
    InvalidTarget,
    NotReady,
    InsufficientResources,
    OutOfRange,
    Interrupted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastOutcome {
    Cast,
    Failed(CastFailure),
}

impl CastOutcome {
    pub fn succeeded(self) -> bool {
        self == CastOutcome::Cast
    }
}

/// World operations the engine delegates to the host.
pub trait HostWorld {
    fn cast_ability(&mut self, request: &CastRequest) -> CastOutcome;

    fn modify_stat(&mut self, actor: ActorId, stat: StatKind, delta: i32);

    /// Removes a host-side object (summon, area trigger) owned by an actor.
    fn despawn(&mut self, actor: ActorId);
}

impl<H: HostWorld + ?Sized> HostWorld for &mut H {
    fn cast_ability(&mut self, request: &CastRequest) -> CastOutcome {
        (**self).cast_ability(request)
    }

    fn modify_stat(&mut self, actor: ActorId, stat: StatKind, delta: i32) {
        (**self).modify_stat(actor, stat, delta)
    }

    fn despawn(&mut self, actor: ActorId) {
        (**self).despawn(actor)
    }
}

/// Host catalog of castable abilities, consulted when scripts register.
pub trait AbilityCatalog {
    fn contains(&self, ability: AbilityId) -> bool;
}

impl AbilityCatalog for BTreeSet<AbilityId> {
    fn contains(&self, ability: AbilityId) -> bool {
        BTreeSet::contains(self, &ability)
    }
}

impl AbilityCatalog for HashSet<AbilityId> {
    fn contains(&self, ability: AbilityId) -> bool {
        HashSet::contains(self, &ability)
    }
}

/// Read-only aura queries scripts use to inspect actors.
pub trait AuraQuery {
    fn has_aura(&self, actor: ActorId, definition: AuraId) -> bool {
        self.find_aura(actor, definition).is_some()
    }

    /// First live instance of `definition` on `actor`, in registration order.
    fn find_aura(&self, actor: ActorId, definition: AuraId) -> Option<AuraHandle>;

    fn slot_amount(&self, aura: AuraHandle, slot: u8) -> Option<i32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_point_overrides_are_bounded() {
        let options = CastOptions::triggered()
            .with_base_point(0, 35)
            .with_base_point(EngineConfig::MAX_BASE_POINT_OVERRIDES, 99);
        assert_eq!(options.base_point(0), Some(35));
        assert_eq!(options.base_point(1), None);
        assert_eq!(options.base_point(EngineConfig::MAX_BASE_POINT_OVERRIDES), None);
        assert!(options.flags.contains(TriggerFlags::IGNORE_COOLDOWN));
    }

    #[test]
    fn set_catalogs() {
        let catalog: BTreeSet<AbilityId> = [AbilityId(1), AbilityId(2)].into_iter().collect();
        assert!(AbilityCatalog::contains(&catalog, AbilityId(2)));
        assert!(!AbilityCatalog::contains(&catalog, AbilityId(3)));
    }
}
