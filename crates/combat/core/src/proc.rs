//! Proc evaluation: does this event trigger this slot?
//!
//! Evaluation runs in a fixed order and stops at the first gate that fails:
//!
//! 1. structural filter (event kind mask, optional ability list)
//! 2. internal cooldown of the slot
//! 3. declarative requirements, then the script's custom predicate
//! 4. probability roll against the injected [`RandomSource`]
//!
//! Nothing is mutated here. Recording the proc time and running the reaction
//! is the caller's job, which is what makes "exactly once per slot" easy to
//! uphold.

use bitflags::bitflags;

use crate::config::EngineConfig;
use crate::event::{CombatEvent, EventMask};
use crate::rng::RandomSource;
use crate::types::{AbilityId, ActorId, Tick};

/// Probability that a structurally matching event procs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcChance {
    /// Always procs and never consumes a roll.
    #[default]
    Always,
    /// Fixed chance in basis points (10 000 = 100%).
    BasisPoints(u32),
    /// Chance grows with the event magnitude: `magnitude * per_unit`, capped.
    Scaled { per_unit: u32, cap: u32 },
}

impl ProcChance {
    pub fn percent(percent: u32) -> Self {
        Self::BasisPoints(percent.saturating_mul(100))
    }

    /// Effective chance in basis points for an event of `magnitude`.
    pub fn resolve(self, magnitude: u32) -> u32 {
        match self {
            Self::Always => EngineConfig::BASIS_POINTS,
            Self::BasisPoints(bp) => bp.min(EngineConfig::BASIS_POINTS),
            Self::Scaled { per_unit, cap } => magnitude
                .saturating_mul(per_unit)
                .min(cap)
                .min(EngineConfig::BASIS_POINTS),
        }
    }
}

bitflags! {
    /// Declarative conditions checked before any custom predicate.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProcRequirements: u8 {
        /// The event must carry a non-zero magnitude.
        const NONZERO_AMOUNT    = 1 << 0;
        /// The triggering cast must have spent a resource.
        const HAS_RESOURCE_COST = 1 << 1;
        /// The event target must be alive.
        const TARGET_ALIVE      = 1 << 2;
        /// The event must have been caused by the aura's owner.
        const FROM_OWNER        = 1 << 3;
        /// The event must be a critical hit or heal.
        const CRITICAL          = 1 << 4;
    }
}

/// Static proc configuration of a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcSpec {
    pub mask: EventMask,
    pub chance: ProcChance,
    pub requirements: ProcRequirements,
    /// Minimum time between two procs of the same slot on one instance.
    pub internal_cooldown: Option<u64>,
    /// Restricts procs to events carrying one of these abilities. Empty
    /// accepts every event.
    pub abilities: Vec<AbilityId>,
}

impl ProcSpec {
    pub fn on(mask: EventMask) -> Self {
        Self {
            mask,
            chance: ProcChance::Always,
            requirements: ProcRequirements::empty(),
            internal_cooldown: None,
            abilities: Vec::new(),
        }
    }

    #[must_use]
    pub fn chance(mut self, chance: ProcChance) -> Self {
        self.chance = chance;
        self
    }

    #[must_use]
    pub fn requires(mut self, requirements: ProcRequirements) -> Self {
        self.requirements |= requirements;
        self
    }

    #[must_use]
    pub fn internal_cooldown(mut self, millis: u64) -> Self {
        self.internal_cooldown = Some(millis);
        self
    }

    #[must_use]
    pub fn only_abilities(mut self, abilities: impl IntoIterator<Item = AbilityId>) -> Self {
        self.abilities.extend(abilities);
        self
    }
}

/// What the evaluator needs to know about one (instance, slot, event).
#[derive(Clone, Copy, Debug)]
pub struct ProcInput<'a> {
    pub event: &'a CombatEvent,
    /// Owner of the aura being evaluated.
    pub owner: ActorId,
    pub now: Tick,
    pub last_proc_at: Option<Tick>,
    pub target_alive: bool,
}

/// Outcome of one evaluation, naming the gate that stopped it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ProcDecision {
    Filtered,
    OnCooldown,
    ConditionFailed,
    RollFailed,
    Proc,
}

impl ProcDecision {
    pub fn is_proc(self) -> bool {
        self == ProcDecision::Proc
    }
}

/// Stateless proc evaluator.
pub struct ProcEvaluator;

impl ProcEvaluator {
    /// Runs every gate for one slot.
    ///
    /// `condition` is the custom predicate and is only called when every
    /// earlier gate passed. The random source is touched only when the chance
    /// is strictly between 0 and 100%.
    pub fn evaluate<R>(
        spec: &ProcSpec,
        input: &ProcInput<'_>,
        condition: impl FnOnce() -> bool,
        rng: &mut R,
    ) -> ProcDecision
    where
        R: RandomSource + ?Sized,
    {
        if !Self::matches(spec, input.event) {
            return ProcDecision::Filtered;
        }
        if Self::on_cooldown(spec, input) {
            return ProcDecision::OnCooldown;
        }
        if !Self::requirements_met(spec.requirements, input) || !condition() {
            return ProcDecision::ConditionFailed;
        }
        if !rng.chance(spec.chance.resolve(input.event.magnitude)) {
            return ProcDecision::RollFailed;
        }
        ProcDecision::Proc
    }

    /// Structural filter only.
    pub fn matches(spec: &ProcSpec, event: &CombatEvent) -> bool {
        if !spec.mask.matches(event.kind) {
            return false;
        }
        spec.abilities.is_empty()
            || event
                .ability
                .is_some_and(|ability| spec.abilities.contains(&ability))
    }

    fn on_cooldown(spec: &ProcSpec, input: &ProcInput<'_>) -> bool {
        match (spec.internal_cooldown, input.last_proc_at) {
            (Some(icd), Some(last)) => input.now.since(last) < icd,
            _ => false,
        }
    }

    fn requirements_met(requirements: ProcRequirements, input: &ProcInput<'_>) -> bool {
        let event = input.event;
        if requirements.contains(ProcRequirements::NONZERO_AMOUNT) && event.magnitude == 0 {
            return false;
        }
        if requirements.contains(ProcRequirements::HAS_RESOURCE_COST)
            && !event.cost.is_some_and(|c| c.amount > 0)
        {
            return false;
        }
        if requirements.contains(ProcRequirements::TARGET_ALIVE) && !input.target_alive {
            return false;
        }
        if requirements.contains(ProcRequirements::FROM_OWNER) && event.source != Some(input.owner)
        {
            return false;
        }
        if requirements.contains(ProcRequirements::CRITICAL) && !event.critical {
            return false;
        }
        true
    }
}
