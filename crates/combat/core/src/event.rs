//! Typed combat events published by the host.

use bitflags::bitflags;

use crate::aura::RemoveReason;
use crate::resources::ResourceKind;
use crate::types::{AbilityId, ActorId, AuraId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    CastStart,
    CastComplete,
    DamageDealt,
    DamageTaken,
    HealDealt,
    HealTaken,
    AuraApplied,
    AuraRemoved,
}

impl EventKind {
    pub fn mask(self) -> EventMask {
        match self {
            Self::CastStart => EventMask::CAST_START,
            Self::CastComplete => EventMask::CAST_COMPLETE,
            Self::DamageDealt => EventMask::DAMAGE_DEALT,
            Self::DamageTaken => EventMask::DAMAGE_TAKEN,
            Self::HealDealt => EventMask::HEAL_DEALT,
            Self::HealTaken => EventMask::HEAL_TAKEN,
            Self::AuraApplied => EventMask::AURA_APPLIED,
            Self::AuraRemoved => EventMask::AURA_REMOVED,
        }
    }
}

bitflags! {
    /// Set of event kinds a proc spec listens to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct EventMask: u16 {
        const CAST_START    = 1 << 0;
        const CAST_COMPLETE = 1 << 1;
        const DAMAGE_DEALT  = 1 << 2;
        const DAMAGE_TAKEN  = 1 << 3;
        const HEAL_DEALT    = 1 << 4;
        const HEAL_TAKEN    = 1 << 5;
        const AURA_APPLIED  = 1 << 6;
        const AURA_REMOVED  = 1 << 7;

        const CAST = Self::CAST_START.bits() | Self::CAST_COMPLETE.bits();
        const DAMAGE = Self::DAMAGE_DEALT.bits() | Self::DAMAGE_TAKEN.bits();
        const HEAL = Self::HEAL_DEALT.bits() | Self::HEAL_TAKEN.bits();
    }
}

impl EventMask {
    pub fn matches(self, kind: EventKind) -> bool {
        self.contains(kind.mask())
    }
}

/// Resource spent by the cast that produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceCost {
    pub kind: ResourceKind,
    pub amount: u32,
}

/// One combat event.
///
/// `source` is the actor that caused the event and `target` the actor it
/// happened to. Events are published on one actor at a time; which side that
/// is depends on the kind (`DamageDealt` on the attacker, `DamageTaken` on
/// the victim).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatEvent {
    pub kind: EventKind,
    pub source: Option<ActorId>,
    pub target: Option<ActorId>,
    pub ability: Option<AbilityId>,
    pub aura: Option<AuraId>,
    /// Damage or healing amount; zero for events without one.
    pub magnitude: u32,
    pub cost: Option<ResourceCost>,
    pub critical: bool,
    pub remove_reason: Option<RemoveReason>,
}

impl CombatEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            source: None,
            target: None,
            ability: None,
            aura: None,
            magnitude: 0,
            cost: None,
            critical: false,
            remove_reason: None,
        }
    }

    pub fn cast_start(caster: ActorId, ability: AbilityId) -> Self {
        Self::new(EventKind::CastStart)
            .from(caster)
            .with_ability(ability)
    }

    pub fn cast_complete(caster: ActorId, target: ActorId, ability: AbilityId) -> Self {
        Self::new(EventKind::CastComplete)
            .from(caster)
            .to(target)
            .with_ability(ability)
    }

    pub fn damage_dealt(source: ActorId, target: ActorId, amount: u32) -> Self {
        Self::new(EventKind::DamageDealt)
            .from(source)
            .to(target)
            .with_magnitude(amount)
    }

    pub fn damage_taken(source: ActorId, target: ActorId, amount: u32) -> Self {
        Self::new(EventKind::DamageTaken)
            .from(source)
            .to(target)
            .with_magnitude(amount)
    }

    pub fn heal_dealt(source: ActorId, target: ActorId, amount: u32) -> Self {
        Self::new(EventKind::HealDealt)
            .from(source)
            .to(target)
            .with_magnitude(amount)
    }

    pub fn heal_taken(source: ActorId, target: ActorId, amount: u32) -> Self {
        Self::new(EventKind::HealTaken)
            .from(source)
            .to(target)
            .with_magnitude(amount)
    }

    pub fn aura_applied(target: ActorId, aura: AuraId, caster: Option<ActorId>) -> Self {
        Self {
            source: caster,
            aura: Some(aura),
            ..Self::new(EventKind::AuraApplied).to(target)
        }
    }

    pub fn aura_removed(
        target: ActorId,
        aura: AuraId,
        caster: Option<ActorId>,
        reason: RemoveReason,
    ) -> Self {
        Self {
            source: caster,
            aura: Some(aura),
            remove_reason: Some(reason),
            ..Self::new(EventKind::AuraRemoved).to(target)
        }
    }

    #[must_use]
    pub fn from(mut self, source: ActorId) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn to(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_ability(mut self, ability: AbilityId) -> Self {
        self.ability = Some(ability);
        self
    }

    #[must_use]
    pub fn with_magnitude(mut self, magnitude: u32) -> Self {
        self.magnitude = magnitude;
        self
    }

    #[must_use]
    pub fn with_cost(mut self, kind: ResourceKind, amount: u32) -> Self {
        self.cost = Some(ResourceCost { kind, amount });
        self
    }

    #[must_use]
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}
