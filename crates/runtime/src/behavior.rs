//! Built-in slot behaviors, run when no script replaces them.
//!
//! | kind | periodic tick | proc |
//! |---|---|---|
//! | `PeriodicHeal`, `PeriodicDamage` | caster casts trigger on owner | |
//! | `PeriodicTrigger` | owner casts trigger on itself | |
//! | `ProcTrigger` | | owner casts trigger on the other party |
//! | `Accumulate` | flush, cast trigger if non-zero | collect event magnitude |
//!
//! Stat modifiers are kept in sync with the host on apply, stack change and
//! removal rather than on events.
use combat_core::{
    AbilityId, ActorId, AuraHandle, CastOptions, CastOutcome, CombatEvent, EffectKind,
    SlotDefinition,
};
use tracing::debug;

use crate::context::Origin;
use crate::dispatcher::Dispatcher;
use crate::trace::{TraceOutcome, TracePhase, TraceSource};

impl Dispatcher<'_> {
    /// Pushes the difference between a stat slot's amount and what the host
    /// already has.
    pub(crate) fn sync_stat(&mut self, handle: AuraHandle, slot: u8) {
        let Some((EffectKind::StatModifier(stat), _)) = self.slot_kind(handle, slot) else {
            return;
        };
        let Some(instance) = self.core.world.aura_mut(handle) else {
            return;
        };
        let owner = instance.owner();
        let origin = Origin::for_aura(instance, Some(slot));
        let Some(runtime) = instance.slot_mut(slot) else {
            return;
        };
        let delta = runtime.amount.saturating_sub(runtime.applied);
        if delta == 0 {
            return;
        }
        runtime.applied = runtime.amount;

        self.modify_stat(owner, stat, delta);
        self.record(
            origin,
            TracePhase::Apply,
            TraceSource::BuiltIn,
            TraceOutcome::Completed,
        );
    }

    /// Takes back whatever a stat slot pushed to the host.
    pub(crate) fn revert_stat(&mut self, handle: AuraHandle, slot: u8) {
        let Some((EffectKind::StatModifier(stat), _)) = self.slot_kind(handle, slot) else {
            return;
        };
        let Some(instance) = self.core.world.aura_mut(handle) else {
            return;
        };
        let owner = instance.owner();
        let origin = Origin::for_aura(instance, Some(slot));
        let Some(runtime) = instance.slot_mut(slot) else {
            return;
        };
        let applied = std::mem::take(&mut runtime.applied);
        if applied == 0 {
            return;
        }

        self.modify_stat(owner, stat, applied.saturating_neg());
        self.record(
            origin,
            TracePhase::Remove,
            TraceSource::BuiltIn,
            TraceOutcome::Completed,
        );
    }

    pub(crate) fn periodic_default(&mut self, handle: AuraHandle, slot: u8, origin: Origin) {
        let Some((kind, trigger)) = self.slot_kind(handle, slot) else {
            return;
        };
        let amount = self
            .core
            .world
            .aura(handle)
            .and_then(|instance| instance.slot_amount(slot))
            .unwrap_or_default();

        let outcome = match (kind, trigger) {
            (EffectKind::PeriodicHeal | EffectKind::PeriodicDamage, Some(ability)) => {
                let caster = origin.caster.unwrap_or(origin.owner);
                self.trigger(caster, origin.owner, ability, Some(amount), &origin)
            }
            (EffectKind::PeriodicTrigger, Some(ability)) => {
                self.trigger(origin.owner, origin.owner, ability, None, &origin)
            }
            (EffectKind::Accumulate { .. }, Some(ability)) => {
                let collected = self
                    .core
                    .world
                    .aura_mut(handle)
                    .and_then(|instance| instance.slot_mut(slot))
                    .map_or(0, |runtime| runtime.accumulator.flush());
                if collected <= 0 {
                    return;
                }
                let amount = i32::try_from(collected).unwrap_or(i32::MAX);
                self.trigger(origin.owner, origin.owner, ability, Some(amount), &origin)
            }
            _ => return,
        };
        self.record(origin, TracePhase::Periodic, TraceSource::BuiltIn, outcome);
    }

    pub(crate) fn proc_default(
        &mut self,
        handle: AuraHandle,
        slot: u8,
        event: &CombatEvent,
        origin: Origin,
    ) {
        let Some((kind, trigger)) = self.slot_kind(handle, slot) else {
            return;
        };

        let outcome = match (kind, trigger) {
            (EffectKind::ProcTrigger, Some(ability)) => {
                let amount = self
                    .core
                    .world
                    .aura(handle)
                    .and_then(|instance| instance.slot_amount(slot))
                    .filter(|amount| *amount != 0);
                let target = other_party(origin.owner, event);
                self.trigger(origin.owner, target, ability, amount, &origin)
            }
            (EffectKind::Accumulate { percent }, _) => {
                if let Some(runtime) = self
                    .core
                    .world
                    .aura_mut(handle)
                    .and_then(|instance| instance.slot_mut(slot))
                {
                    runtime.accumulator.add(event.magnitude, percent);
                }
                TraceOutcome::Completed
            }
            _ => return,
        };
        self.record(origin, TracePhase::Proc, TraceSource::BuiltIn, outcome);
    }

    fn trigger(
        &mut self,
        caster: ActorId,
        target: ActorId,
        ability: AbilityId,
        base_point: Option<i32>,
        origin: &Origin,
    ) -> TraceOutcome {
        let mut options = CastOptions::triggered().with_origin(self.cast_origin(origin));
        if let Some(amount) = base_point {
            options = options.with_base_point(0, amount);
        }
        match self.cast(caster, target, ability, options) {
            CastOutcome::Cast => TraceOutcome::Completed,
            CastOutcome::Failed(failure) => {
                debug!(
                    target: "runtime::dispatcher",
                    ability = %ability,
                    failure = %failure,
                    "triggered cast refused by host"
                );
                TraceOutcome::Failed("REACTION_CAST_FAILED")
            }
        }
    }

    fn slot_kind(&self, handle: AuraHandle, slot: u8) -> Option<(EffectKind, Option<AbilityId>)> {
        let instance = self.core.world.aura(handle)?;
        let def: &SlotDefinition = self
            .scripts
            .definition(instance.definition())?
            .slot_at(slot)?;
        Some((def.kind, def.trigger))
    }
}

/// The actor on the far side of `event` from `owner`.
fn other_party(owner: ActorId, event: &CombatEvent) -> ActorId {
    match (event.source, event.target) {
        (Some(source), Some(target)) if source == owner => target,
        (Some(source), _) if source != owner => source,
        (_, Some(target)) => target,
        _ => owner,
    }
}
