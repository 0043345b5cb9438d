//! What a script sees while it runs.
use combat_core::{
    AbilityId, ActorId, AuraHandle, AuraId, AuraInstance, CastOptions, CastOutcome, CombatEvent,
    CooldownKey, InvariantViolation, RandomSource, RemoveReason, ResourceKind, StatKind, Tick,
};

use crate::bus::PublishReport;
use crate::dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher};
use crate::error::ReactionError;
use crate::scheduler::{DelayedAction, Liveness, ScheduleHandle};
use crate::world::World;

/// Where a reaction or delayed effect came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Origin {
    pub owner: ActorId,
    pub caster: Option<ActorId>,
    pub aura: Option<AuraHandle>,
    pub definition: Option<AuraId>,
    pub slot: Option<u8>,
    /// Ability on the event that set the reaction off, if any.
    pub trigger: Option<AbilityId>,
}

impl Origin {
    /// Origin with no aura attached, for effects scheduled by the host.
    pub fn actor(owner: ActorId) -> Self {
        Self {
            owner,
            caster: None,
            aura: None,
            definition: None,
            slot: None,
            trigger: None,
        }
    }

    /// Origin of a reaction running on `aura`, optionally for one slot.
    pub fn for_aura(aura: &AuraInstance, slot: Option<u8>) -> Self {
        Self {
            owner: aura.owner(),
            caster: aura.caster(),
            aura: Some(aura.handle()),
            definition: Some(aura.definition()),
            slot,
            trigger: None,
        }
    }

    /// Records the ability on the event that set this reaction off.
    #[must_use]
    pub fn with_trigger(mut self, ability: Option<AbilityId>) -> Self {
        self.trigger = ability;
        self
    }
}

/// Handle passed to every script callback.
///
/// All mutation goes through the dispatcher it wraps; scripts never hold a
/// reference to the world across calls.
pub struct ReactionContext<'a> {
    dispatcher: Dispatcher<'a>,
    origin: Origin,
}

impl<'a> ReactionContext<'a> {
    pub(crate) fn new(dispatcher: Dispatcher<'a>, origin: Origin) -> Self {
        Self { dispatcher, origin }
    }

    /// Current engine time.
    pub fn now(&self) -> Tick {
        self.dispatcher.now()
    }

    /// Where this reaction came from.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Actor the reacting aura sits on.
    pub fn owner(&self) -> ActorId {
        self.origin.owner
    }

    /// Actor that applied the reacting aura, if any.
    pub fn caster(&self) -> Option<ActorId> {
        self.origin.caster
    }

    /// Handle of the reacting aura.
    pub fn aura(&self) -> Option<AuraHandle> {
        self.origin.aura
    }

    /// Effect slot the reaction is registered on.
    pub fn slot(&self) -> Option<u8> {
        self.origin.slot
    }

    /// Definition of the reacting aura.
    pub fn definition(&self) -> Option<AuraId> {
        self.origin.definition
    }

    /// The aura this reaction belongs to, if it still exists.
    pub fn instance(&self) -> Option<&AuraInstance> {
        self.world().aura(self.origin.aura?)
    }

    /// Current amount of the reacting slot.
    pub fn amount(&self) -> Option<i32> {
        self.instance()?.slot_amount(self.origin.slot?)
    }

    /// Current stack count of the reacting aura.
    pub fn stack(&self) -> Option<u32> {
        self.instance().map(AuraInstance::stack)
    }

    /// Read-only view of actors and auras.
    pub fn world(&self) -> &World {
        &self.dispatcher.core.world
    }

    /// Whether `actor` exists and is alive.
    pub fn is_alive(&self, actor: ActorId) -> bool {
        self.world().is_alive(actor)
    }

    /// The engine's random source.
    pub fn rng(&mut self) -> &mut dyn RandomSource {
        &mut *self.dispatcher.core.rng
    }

    /// Routes a secondary effect through the dispatcher.
    pub fn dispatch(&mut self, request: DispatchRequest) -> Result<DispatchOutcome, ReactionError> {
        self.dispatcher.dispatch(request)
    }

    /// Casts `ability` from the owner with triggered-cast options linked back
    /// to this aura. A refused cast is reported as [`ReactionError::CastFailed`].
    pub fn cast(&mut self, target: ActorId, ability: AbilityId) -> Result<(), ReactionError> {
        let options = CastOptions::triggered();
        self.cast_with(self.origin.owner, target, ability, options)
    }

    /// Casts with explicit caster and options. Options without an origin get this reaction's origin.
    pub fn cast_with(
        &mut self,
        caster: ActorId,
        target: ActorId,
        ability: AbilityId,
        options: CastOptions,
    ) -> Result<(), ReactionError> {
        let options = match options.origin {
            Some(_) => options,
            None => options.with_origin(self.dispatcher.cast_origin(&self.origin)),
        };
        match self.dispatcher.cast(caster, target, ability, options) {
            CastOutcome::Cast => Ok(()),
            CastOutcome::Failed(failure) => Err(ReactionError::CastFailed { ability, failure }),
        }
    }

    /// Adjusts a resource on any actor. Returns the delta actually applied.
    pub fn adjust_resource(
        &mut self,
        actor: ActorId,
        kind: ResourceKind,
        delta: i32,
    ) -> Result<i32, ReactionError> {
        Ok(self.dispatcher.adjust_resource(actor, kind, delta)?)
    }

    /// Current value of a resource, if the actor tracks it.
    pub fn peek_resource(&self, actor: ActorId, kind: ResourceKind) -> Option<u32> {
        self.world().peek_resource(actor, kind)
    }

    /// Starts the usage cooldown of `key` on `actor`.
    pub fn start_cooldown(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        duration: u64,
    ) -> Result<(), ReactionError> {
        Ok(self.dispatcher.start_cooldown(actor, key, duration)?)
    }

    /// Shifts a running cooldown by `delta` milliseconds, floored at zero.
    pub fn modify_cooldown(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        delta: i64,
    ) -> Result<Option<u64>, ReactionError> {
        Ok(self.dispatcher.modify_cooldown(actor, key, delta)?)
    }

    /// Clears a cooldown, optionally restoring one charge.
    pub fn reset_cooldown(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        restore_charge: bool,
    ) -> Result<bool, ReactionError> {
        Ok(self.dispatcher.reset_cooldown(actor, key, restore_charge)?)
    }

    /// Gives back one charge, up to the maximum.
    pub fn restore_charge(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
    ) -> Result<Option<u32>, ReactionError> {
        Ok(self.dispatcher.restore_charge(actor, key)?)
    }

    /// Shifts the pending charge recovery by `delta` milliseconds.
    pub fn modify_charge_recovery(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        delta: i64,
    ) -> Result<Option<u32>, ReactionError> {
        Ok(self.dispatcher.modify_charge_recovery(actor, key, delta)?)
    }

    /// Asks the host to change a stat.
    pub fn modify_stat(&mut self, actor: ActorId, stat: StatKind, delta: i32) {
        self.dispatcher.modify_stat(actor, stat, delta);
    }

    /// Applies `definition` to `target` with the owner as caster.
    pub fn apply_aura(
        &mut self,
        target: ActorId,
        definition: AuraId,
    ) -> Result<AuraHandle, ReactionError> {
        let caster = Some(self.origin.owner);
        self.dispatcher.apply_aura(target, definition, caster)
    }

    /// Removes another aura immediately, or defers if its reactions are running.
    pub fn remove_aura(
        &mut self,
        handle: AuraHandle,
        reason: RemoveReason,
    ) -> Result<(), ReactionError> {
        self.dispatcher.remove_aura(handle, reason)
    }

    /// Removes the reacting aura. The removal takes effect once every
    /// reaction currently running on it has returned.
    pub fn remove_self(&mut self, reason: RemoveReason) -> Result<(), ReactionError> {
        let handle = self.origin.aura.ok_or_else(|| {
            ReactionError::script("remove_self called outside an aura reaction")
        })?;
        self.dispatcher.remove_aura(handle, reason)
    }

    /// Changes the stack of `handle`. Reaching zero removes the aura.
    pub fn modify_stack(&mut self, handle: AuraHandle, delta: i32) -> Result<u32, ReactionError> {
        self.dispatcher.modify_stack(handle, delta)
    }

    /// Sets the remaining duration of `handle`, clamped to the definition.
    pub fn set_duration(&mut self, handle: AuraHandle, millis: u64) -> Result<u64, ReactionError> {
        self.dispatcher.set_duration(handle, millis)
    }

    /// Schedules `action` to run `delay` milliseconds from now, owned by the
    /// current reaction.
    pub fn schedule_after(
        &mut self,
        delay: u64,
        liveness: Liveness,
        action: impl Into<DelayedAction>,
    ) -> ScheduleHandle {
        let origin = self.origin;
        self.dispatcher
            .schedule_after(delay, origin, liveness, action.into())
    }

    /// Schedules a closure to run `delay` milliseconds from now.
    pub fn schedule_callback(
        &mut self,
        delay: u64,
        liveness: Liveness,
        f: impl FnOnce(&mut ReactionContext<'_>) -> Result<(), ReactionError> + 'static,
    ) -> ScheduleHandle {
        self.schedule_after(delay, liveness, DelayedAction::callback(f))
    }

    /// Cancels a pending delayed effect. Returns false if it already ran.
    pub fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        self.dispatcher.core.scheduler.cancel(handle)
    }

    /// Publishes a follow-up event on `actor`. Nested publishes count
    /// against the reaction depth limit.
    pub fn publish(
        &mut self,
        actor: ActorId,
        event: CombatEvent,
    ) -> Result<PublishReport, ReactionError> {
        self.dispatcher.publish(actor, &event, None)
    }

    /// Reads a per-instance scratch value.
    pub fn scratch(&self, key: u32) -> Option<i64> {
        self.instance()?.scratch(key)
    }

    /// Stores a per-instance scratch value.
    pub fn set_scratch(&mut self, key: u32, value: i64) -> Result<(), ReactionError> {
        let instance = self.own_instance_mut()?;
        instance.set_scratch(key, value);
        Ok(())
    }

    /// Removes and returns a per-instance scratch value.
    pub fn take_scratch(&mut self, key: u32) -> Result<Option<i64>, ReactionError> {
        Ok(self.own_instance_mut()?.take_scratch(key))
    }

    /// Overrides the current amount of the reacting slot until the next
    /// recalculation.
    pub fn set_amount(&mut self, amount: i32) -> Result<(), ReactionError> {
        let slot = self
            .origin
            .slot
            .ok_or_else(|| ReactionError::script("set_amount called outside a slot reaction"))?;
        let instance = self.own_instance_mut()?;
        if let Some(runtime) = instance.slot_mut(slot) {
            runtime.amount = amount;
        }
        Ok(())
    }

    fn own_instance_mut(&mut self) -> Result<&mut AuraInstance, ReactionError> {
        let handle = self
            .origin
            .aura
            .ok_or_else(|| ReactionError::script("no aura attached to this reaction"))?;
        let stale = InvariantViolation::StaleHandle { handle };
        if self.dispatcher.core.world.aura(handle).is_none() {
            return Err(self.dispatcher.invariant(stale));
        }
        self.dispatcher
            .core
            .world
            .aura_mut(handle)
            .ok_or(ReactionError::Invariant(stale))
    }
}
