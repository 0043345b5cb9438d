//! Aura lifecycle driven through the dispatcher.
//!
//! ```text
//! Inactive -> Applying -> Active <-> Refreshing | StackChanging
//!                           |
//!                           v
//!                       Removing -> Removed
//! ```
//!
//! Every state change goes through [`AuraInstance::transition`]; a refused
//! transition is handed to the invariant policy instead of being ignored.
use combat_core::{
    ActorId, ApplyKind, AuraDefinition, AuraHandle, AuraId, AuraInstance, AuraState, CombatEvent,
    InvariantViolation, PreconditionError, RemoveReason,
};
use tracing::{debug, warn};

use crate::context::Origin;
use crate::dispatcher::{Dispatcher, HookStatus};
use crate::error::ReactionError;
use crate::script::AmountCalc;
use crate::trace::TracePhase;

impl Dispatcher<'_> {
    /// Applies `definition` to `target`, or reapplies the existing instance
    /// that shares its key.
    pub(crate) fn apply_aura(
        &mut self,
        target: ActorId,
        definition: AuraId,
        caster: Option<ActorId>,
    ) -> Result<AuraHandle, ReactionError> {
        let scripts = self.scripts;
        let def = scripts
            .definition(definition)
            .ok_or(PreconditionError::UnknownDefinition { definition })?;
        match self.core.world.actor(target) {
            None => return Err(PreconditionError::ActorNotFound(target).into()),
            Some(actor) if !actor.alive => return Err(PreconditionError::ActorDead(target).into()),
            Some(_) => {}
        }

        if let Some(existing) = self.find_keyed(target, def, caster) {
            self.reapply(existing, def, caster)?;
            return Ok(existing);
        }

        if let Some(group) = def.exclusive_group {
            self.remove_exclusive_rivals(target, definition, group);
        }

        let now = self.now();
        let handle = self
            .core
            .world
            .arena_mut()
            .insert_with(|handle| AuraInstance::new(handle, def, target, caster, now));
        self.core.world.require_actor_mut(target)?.attach(handle);
        self.transition(handle, AuraState::Applying)?;
        self.recalculate(handle);

        debug!(
            target: "runtime::auras",
            aura = %handle,
            definition = %definition,
            owner = %target,
            caster = ?caster,
            "aura applied"
        );

        self.with_executing(handle, |d| {
            d.fire_apply(handle, ApplyKind::Real);
            d.transition(handle, AuraState::Active)
        })?;

        if self.core.world.is_live(handle) {
            let event = CombatEvent::aura_applied(target, definition, caster);
            self.announce(target, &event, Some(handle));
        }
        Ok(handle)
    }

    /// Removes an aura. Removing an aura that is already being removed is a
    /// no-op; removing one whose reactions are still running is deferred
    /// until they return.
    pub(crate) fn remove_aura(
        &mut self,
        handle: AuraHandle,
        reason: RemoveReason,
    ) -> Result<(), ReactionError> {
        let state = self.require_aura(handle)?.state();
        if matches!(state, AuraState::Removing | AuraState::Removed) {
            return Ok(());
        }

        if self.is_executing(handle) {
            if !self.core.deferred.iter().any(|(h, _)| *h == handle) {
                debug!(
                    target: "runtime::auras",
                    aura = %handle,
                    reason = %reason,
                    "removal deferred until reactions return"
                );
                self.core.deferred.push((handle, reason));
            }
            return Ok(());
        }

        self.core.deferred.retain(|(h, _)| *h != handle);
        self.transition(handle, AuraState::Removing)?;
        self.with_executing(handle, |d| d.fire_remove(handle, reason));
        self.transition(handle, AuraState::Removed)?;

        let Some(instance) = self.core.world.arena_mut().remove(handle) else {
            return Err(self.invariant(InvariantViolation::StaleHandle { handle }));
        };
        if let Some(actor) = self.core.world.actor_mut(instance.owner()) {
            actor.detach(handle);
        }

        debug!(
            target: "runtime::auras",
            aura = %handle,
            definition = %instance.definition(),
            owner = %instance.owner(),
            reason = %reason,
            "aura removed"
        );

        let event = CombatEvent::aura_removed(
            instance.owner(),
            instance.definition(),
            instance.caster(),
            reason,
        );
        self.announce(instance.owner(), &event, None);
        Ok(())
    }

    /// Publishes a lifecycle event. Depth refusals are already logged by the
    /// bus; anything else is reported here.
    fn announce(&mut self, actor: ActorId, event: &CombatEvent, exclude: Option<AuraHandle>) {
        if let Err(error) = self.publish(actor, event, exclude)
            && !error.is_depth_limit()
        {
            warn!(
                target: "runtime::auras",
                actor = %actor,
                kind = %event.kind,
                error = %error,
                "lifecycle event not published"
            );
        }
    }

    /// Changes the stack count by `delta`, clamped to the definition's
    /// maximum. Dropping to zero removes the aura with
    /// [`RemoveReason::StacksDepleted`] and returns 0.
    pub(crate) fn modify_stack(
        &mut self,
        handle: AuraHandle,
        delta: i32,
    ) -> Result<u32, ReactionError> {
        let instance = self.require_aura(handle)?;
        match instance.state() {
            AuraState::Applying | AuraState::Active => {}
            AuraState::Refreshing | AuraState::StackChanging => {
                return Err(PreconditionError::AuraBusy(handle).into());
            }
            _ => return Err(PreconditionError::AuraNotActive(handle).into()),
        }

        let current = instance.stack();
        let next = instance.stack_after(delta);
        if next == 0 {
            self.remove_aura(handle, RemoveReason::StacksDepleted)?;
            return Ok(0);
        }
        if next != current {
            self.change_stack(handle, next)?;
        }
        Ok(next)
    }

    /// Sets the remaining duration, clamped to the maximum.
    pub(crate) fn set_duration(
        &mut self,
        handle: AuraHandle,
        millis: u64,
    ) -> Result<u64, ReactionError> {
        let now = self.now();
        let state = self.require_aura(handle)?.state();
        if !(state.is_live() || state == AuraState::Applying) {
            return Err(PreconditionError::AuraNotActive(handle).into());
        }
        let applied = self
            .core
            .world
            .aura_mut(handle)
            .map_or(0, |instance| instance.set_duration(millis, now));
        Ok(applied)
    }

    /// Marks `actor` dead and removes every aura on it with
    /// [`RemoveReason::TargetDied`]. Returns how many were removed.
    pub(crate) fn actor_died(&mut self, actor: ActorId) -> Result<usize, ReactionError> {
        let state = self.core.world.require_actor_mut(actor)?;
        state.alive = false;
        let handles = state.auras().to_vec();

        let mut removed = 0;
        for handle in handles {
            if !self.core.world.aura(handle).is_some_and(|a| a.state().is_live()) {
                continue;
            }
            match self.remove_aura(handle, RemoveReason::TargetDied) {
                Ok(()) => removed += 1,
                Err(error) => debug!(
                    target: "runtime::auras",
                    aura = %handle,
                    error = %error,
                    "removal on death failed"
                ),
            }
        }
        Ok(removed)
    }

    /// Recomputes every slot amount: the default formula first, then each
    /// registered amount hook in registration order.
    pub(crate) fn recalculate(&mut self, handle: AuraHandle) {
        let scripts = self.scripts;
        let Some(def) = self
            .core
            .world
            .aura(handle)
            .and_then(|instance| scripts.definition(instance.definition()))
        else {
            return;
        };
        if let Some(instance) = self.core.world.aura_mut(handle) {
            instance.recalculate_amounts(def);
        }

        let Some(instance) = self.core.world.aura(handle) else {
            return;
        };
        let world = &self.core.world;
        let amounts: Vec<Option<i32>> = (0..instance.slot_count() as u8)
            .map(|slot| {
                let mut hooks = scripts.calc_amount_hooks(def.id, slot).peekable();
                hooks.peek()?;
                let mut current = instance.slot_amount(slot).unwrap_or_default();
                for (_, hook) in hooks {
                    current = (hook.calc)(&AmountCalc {
                        world,
                        aura: instance,
                        slot,
                        current,
                    });
                }
                Some(current)
            })
            .collect();

        if let Some(instance) = self.core.world.aura_mut(handle) {
            for (slot, amount) in amounts.into_iter().enumerate() {
                if let (Some(amount), Some(runtime)) = (amount, instance.slot_mut(slot as u8)) {
                    runtime.amount = amount;
                }
            }
        }
    }

    /// Fires every due periodic slot of `handle`, in slot order.
    pub(crate) fn tick_periodic(&mut self, handle: AuraHandle) {
        let scripts = self.scripts;
        let now = self.now();
        let Some(instance) = self.core.world.aura(handle) else {
            return;
        };
        let Some(def) = scripts.definition(instance.definition()) else {
            return;
        };
        let due: Vec<u8> = instance.due_slots(now).collect();

        for slot in due {
            if !self.core.world.is_live(handle) {
                break;
            }
            let period = def.slot_at(slot).and_then(|s| s.period).unwrap_or(1);
            if let Some(instance) = self.core.world.aura_mut(handle) {
                instance.advance_tick(slot, period);
            }
            let aborted = self.with_executing(handle, |d| d.fire_periodic(handle, slot));
            if aborted {
                break;
            }
        }
    }

    fn reapply(
        &mut self,
        handle: AuraHandle,
        def: &AuraDefinition,
        caster: Option<ActorId>,
    ) -> Result<(), ReactionError> {
        let instance = self.require_aura(handle)?;
        if instance.state() != AuraState::Active {
            return Err(PreconditionError::AuraBusy(handle).into());
        }
        let next_stack = instance.stack_after(1);
        let grows = def.is_stackable() && next_stack != instance.stack();

        self.with_executing(handle, |d| {
            if grows {
                d.change_stack(handle, next_stack)?;
            }
            d.transition(handle, AuraState::Refreshing)?;
            let now = d.now();
            if let Some(instance) = d.core.world.aura_mut(handle) {
                instance.refresh_duration(now);
                if caster.is_some() {
                    instance.set_caster(caster);
                }
            }
            debug!(
                target: "runtime::auras",
                aura = %handle,
                definition = %def.id,
                stack = next_stack,
                "aura refreshed"
            );
            d.fire_apply(handle, ApplyKind::Reapply);
            d.transition(handle, AuraState::Active)
        })
    }

    /// Sets the stack and resynchronizes amounts. An `Applying` aura is
    /// updated in place; an `Active` one passes through `StackChanging`.
    fn change_stack(&mut self, handle: AuraHandle, stack: u32) -> Result<(), ReactionError> {
        let passes_through = self.require_aura(handle)?.state() == AuraState::Active;
        if passes_through {
            self.transition(handle, AuraState::StackChanging)?;
        }

        let result = match self.core.world.aura_mut(handle) {
            Some(instance) => instance.set_stack(stack),
            None => Err(InvariantViolation::StaleHandle { handle }),
        };
        if let Err(violation) = result {
            let error = self.invariant(violation);
            if passes_through {
                self.transition(handle, AuraState::Active)?;
            }
            return Err(error);
        }

        self.recalculate(handle);
        let slots = self
            .core
            .world
            .aura(handle)
            .map_or(0, |instance| instance.slot_count());
        for slot in 0..slots as u8 {
            self.sync_stat(handle, slot);
        }

        if passes_through {
            self.transition(handle, AuraState::Active)?;
        }
        Ok(())
    }

    fn fire_apply(&mut self, handle: AuraHandle, kind: ApplyKind) {
        let scripts = self.scripts;
        let Some(instance) = self.core.world.aura(handle) else {
            return;
        };
        let definition = instance.definition();
        let slots = instance.slot_count() as u8;

        for slot in 0..slots {
            self.sync_stat(handle, slot);
            let Some(instance) = self.core.world.aura(handle) else {
                return;
            };
            let origin = Origin::for_aura(instance, Some(slot));
            for (script, hook) in scripts.apply_hooks(definition, slot) {
                if !hook.mode.observes(kind) {
                    continue;
                }
                let status =
                    self.run_hook(script, origin, TracePhase::Apply, |ctx| (hook.run)(ctx, kind));
                if status == HookStatus::Aborted {
                    return;
                }
            }
        }
    }

    fn fire_remove(&mut self, handle: AuraHandle, reason: RemoveReason) {
        let scripts = self.scripts;
        let Some(instance) = self.core.world.aura(handle) else {
            return;
        };
        let definition = instance.definition();
        let slots = instance.slot_count() as u8;
        let mut aborted = false;

        for slot in 0..slots {
            let Some(instance) = self.core.world.aura(handle) else {
                return;
            };
            let origin = Origin::for_aura(instance, Some(slot));
            if !aborted {
                for (script, hook) in scripts.remove_hooks(definition, slot) {
                    if !hook.filter.allows(reason) {
                        continue;
                    }
                    let status = self.run_hook(script, origin, TracePhase::Remove, |ctx| {
                        (hook.run)(ctx, reason)
                    });
                    if status == HookStatus::Aborted {
                        aborted = true;
                        break;
                    }
                }
            }
            // Stat bookkeeping is reverted even after a critical failure.
            self.revert_stat(handle, slot);
        }
    }

    fn fire_periodic(&mut self, handle: AuraHandle, slot: u8) -> bool {
        let scripts = self.scripts;
        let Some(instance) = self.core.world.aura(handle) else {
            return false;
        };
        let definition = instance.definition();
        let origin = Origin::for_aura(instance, Some(slot));

        let mut suppress = false;
        for (script, hook) in scripts.periodic_hooks(definition, slot) {
            let status = self.run_hook(script, origin, TracePhase::Periodic, |ctx| (hook.run)(ctx));
            if status == HookStatus::Aborted {
                return true;
            }
            suppress |= hook.replaces_default && status.suppresses_default();
        }
        if !suppress {
            self.periodic_default(handle, slot, origin);
        }
        false
    }

    fn find_keyed(
        &self,
        target: ActorId,
        def: &AuraDefinition,
        caster: Option<ActorId>,
    ) -> Option<AuraHandle> {
        let world = &self.core.world;
        world.actor(target)?.auras().iter().copied().find(|handle| {
            world.aura(*handle).is_some_and(|instance| {
                instance.definition() == def.id
                    && (!def.per_caster || instance.caster() == caster)
                    && (instance.state().is_live() || instance.state() == AuraState::Applying)
            })
        })
    }

    fn remove_exclusive_rivals(&mut self, target: ActorId, definition: AuraId, group: u32) {
        let scripts = self.scripts;
        let rivals: Vec<AuraHandle> = self
            .core
            .world
            .auras_on(target)
            .filter(|instance| instance.definition() != definition)
            .filter(|instance| {
                scripts
                    .definition(instance.definition())
                    .is_some_and(|def| def.exclusive_group == Some(group))
            })
            .map(AuraInstance::handle)
            .collect();

        for rival in rivals {
            if !self.core.world.is_live(rival) {
                continue;
            }
            if let Err(error) = self.remove_aura(rival, RemoveReason::ReplacedByExclusive) {
                debug!(
                    target: "runtime::auras",
                    aura = %rival,
                    error = %error,
                    "exclusive replacement failed"
                );
            }
        }
    }

    fn require_aura(&self, handle: AuraHandle) -> Result<&AuraInstance, ReactionError> {
        self.core
            .world
            .aura(handle)
            .ok_or_else(|| self.invariant(InvariantViolation::StaleHandle { handle }))
    }

    pub(crate) fn transition(
        &mut self,
        handle: AuraHandle,
        next: AuraState,
    ) -> Result<(), ReactionError> {
        let result = match self.core.world.aura_mut(handle) {
            Some(instance) => instance.transition(next),
            None => Err(InvariantViolation::StaleHandle { handle }),
        };
        result.map_err(|violation| self.invariant(violation))
    }
}
