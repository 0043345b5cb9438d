//! The engine façade the host talks to.
//!
//! [`ProcEngine`] owns the script registry and all mutable state. Every
//! public operation builds a short-lived dispatcher, runs to completion and
//! returns; nothing is retained between calls except world state, pending
//! delayed effects and the trace.
mod state;

pub(crate) use state::EngineCore;

use combat_core::{
    AbilityCatalog, ActorId, ActorState, AuraDefinition, AuraHandle, AuraId, CombatEvent,
    CooldownKey, HostWorld, RandomSource, RemoveReason, ResourceKind, Tick,
};
use tracing::{debug, info};

use crate::bus::PublishReport;
use crate::config::RuntimeConfig;
use crate::context::Origin;
use crate::dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher};
use crate::error::{Result, RuntimeError};
use crate::random::StdRandom;
use crate::scheduler::{DelayedAction, Liveness, ScheduleHandle};
use crate::script::{AuraScript, Rejection, ScriptRegistry};
use crate::trace::DispatchTrace;
use crate::world::World;

/// Owns the world, the registry and the clock; see the module docs.
pub struct ProcEngine {
    registry: ScriptRegistry,
    core: EngineCore,
}

impl ProcEngine {
    /// Starts building an engine.
    pub fn builder() -> ProcEngineBuilder {
        ProcEngineBuilder::new()
    }

    fn dispatcher(&mut self) -> Dispatcher<'_> {
        Dispatcher::new(&mut self.core, &self.registry)
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.core.config
    }

    /// Current engine time.
    pub fn now(&self) -> Tick {
        self.core.world.now()
    }

    /// Read-only view of actors and auras.
    pub fn world(&self) -> &World {
        &self.core.world
    }

    /// Registered definitions and scripts.
    pub fn registry(&self) -> &ScriptRegistry {
        &self.registry
    }

    /// Recent reaction outcomes.
    pub fn trace(&self) -> &DispatchTrace {
        &self.core.trace
    }

    /// Drops every trace entry.
    pub fn clear_trace(&mut self) {
        self.core.trace.clear();
    }

    /// Definitions and scripts refused at registration, in order.
    pub fn rejected_scripts(&self) -> &[Rejection] {
        self.registry.rejected()
    }

    /// Adds an actor. Fails if the id is taken.
    pub fn add_actor(&mut self, actor: ActorState) -> Result<()> {
        let id = actor.id;
        if !self.core.world.insert_actor(actor) {
            return Err(RuntimeError::DuplicateActor(id));
        }
        debug!(target: "runtime::engine", actor = %id, "actor added");
        Ok(())
    }

    /// Registers a definition after construction. Rejections are also recorded.
    pub fn register_definition(&mut self, definition: AuraDefinition) -> Result<()> {
        Ok(self.registry.register_definition(definition)?)
    }

    /// Registers a script after construction. Rejections are also recorded.
    pub fn register_script(&mut self, script: AuraScript) -> Result<()> {
        Ok(self.registry.register_script(script)?)
    }

    /// Applies `definition` to `target`, or reapplies the existing instance.
    pub fn apply_aura(
        &mut self,
        target: ActorId,
        definition: AuraId,
        caster: Option<ActorId>,
    ) -> Result<AuraHandle> {
        Ok(self.dispatcher().apply_aura(target, definition, caster)?)
    }

    /// Removes an aura with `reason`.
    pub fn remove_aura(&mut self, handle: AuraHandle, reason: RemoveReason) -> Result<()> {
        Ok(self.dispatcher().remove_aura(handle, reason)?)
    }

    /// Returns the new stack count; 0 means the aura was removed.
    pub fn modify_stack(&mut self, handle: AuraHandle, delta: i32) -> Result<u32> {
        Ok(self.dispatcher().modify_stack(handle, delta)?)
    }

    /// Returns the duration actually set after clamping.
    pub fn set_duration(&mut self, handle: AuraHandle, millis: u64) -> Result<u64> {
        Ok(self.dispatcher().set_duration(handle, millis)?)
    }

    /// Marks the actor dead and strips its auras with
    /// [`RemoveReason::TargetDied`].
    pub fn actor_died(&mut self, actor: ActorId) -> Result<usize> {
        Ok(self.dispatcher().actor_died(actor)?)
    }

    /// Delivers `event` to every live aura on `actor`.
    pub fn publish(&mut self, actor: ActorId, event: CombatEvent) -> Result<PublishReport> {
        Ok(self.dispatcher().publish(actor, &event, None)?)
    }

    /// Publishes `event` on each actor in turn, skipping unknown ones.
    pub fn publish_area(
        &mut self,
        actors: impl IntoIterator<Item = ActorId>,
        event: CombatEvent,
    ) -> PublishReport {
        let actors: Vec<ActorId> = actors.into_iter().collect();
        self.dispatcher().publish_area(&actors, &event)
    }

    /// Runs a single secondary effect.
    pub fn dispatch(&mut self, request: DispatchRequest) -> Result<DispatchOutcome> {
        Ok(self.dispatcher().dispatch(request)?)
    }

    /// Adjusts a resource. Returns the delta actually applied.
    pub fn adjust_resource(&mut self, actor: ActorId, kind: ResourceKind, delta: i32) -> Result<i32> {
        Ok(self.dispatcher().adjust_resource(actor, kind, delta)?)
    }

    /// Current value of a resource, if the actor tracks it.
    pub fn peek_resource(&self, actor: ActorId, kind: ResourceKind) -> Option<u32> {
        self.core.world.peek_resource(actor, kind)
    }

    /// Makes `key` charge-based for `actor`.
    pub fn define_charges(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        maximum: u32,
        recovery: u64,
    ) -> Result<()> {
        let state = self.core.world.require_actor_mut(actor)?;
        state.cooldowns.define_charges(key, maximum, recovery);
        Ok(())
    }

    /// Starts the usage cooldown of `key`.
    pub fn start_cooldown(&mut self, actor: ActorId, key: CooldownKey, duration: u64) -> Result<()> {
        Ok(self.dispatcher().start_cooldown(actor, key, duration)?)
    }

    /// Spends one use of `key`: a charge if it is charge-based, otherwise the
    /// usage cooldown.
    pub fn try_use(&mut self, actor: ActorId, key: CooldownKey) -> Result<()> {
        let now = self.now();
        let state = self.core.world.require_actor_mut(actor)?;
        Ok(state.cooldowns.try_use(key, now)?)
    }

    /// Shifts a running cooldown by `delta` milliseconds. `None` if untracked.
    pub fn modify_cooldown(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        delta: i64,
    ) -> Result<Option<u64>> {
        Ok(self.dispatcher().modify_cooldown(actor, key, delta)?)
    }

    /// Clears a cooldown, optionally restoring one charge.
    pub fn reset_cooldown(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        restore_charge: bool,
    ) -> Result<bool> {
        Ok(self.dispatcher().reset_cooldown(actor, key, restore_charge)?)
    }

    /// Gives back one charge. Returns the new count.
    pub fn restore_charge(&mut self, actor: ActorId, key: CooldownKey) -> Result<Option<u32>> {
        Ok(self.dispatcher().restore_charge(actor, key)?)
    }

    /// Shifts the pending charge recovery. Returns the charge count after.
    pub fn modify_charge_recovery(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        delta: i64,
    ) -> Result<Option<u32>> {
        Ok(self.dispatcher().modify_charge_recovery(actor, key, delta)?)
    }

    /// Milliseconds until `key` is ready; untracked keys read 0.
    pub fn remaining_cooldown(&self, actor: ActorId, key: CooldownKey) -> Option<u64> {
        let now = self.now();
        Some(self.core.world.actor(actor)?.cooldowns.remaining(key, now))
    }

    /// Available charges, for charge-based keys.
    pub fn charges(&self, actor: ActorId, key: CooldownKey) -> Option<u32> {
        let now = self.now();
        self.core.world.actor(actor)?.cooldowns.charges(key, now)
    }

    /// Schedules a host-owned delayed effect on `actor`.
    pub fn schedule_after(
        &mut self,
        actor: ActorId,
        delay: u64,
        liveness: Liveness,
        action: impl Into<DelayedAction>,
    ) -> ScheduleHandle {
        self.dispatcher()
            .schedule_after(delay, Origin::actor(actor), liveness, action.into())
    }

    /// Cancels a pending delayed effect.
    pub fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        self.core.scheduler.cancel(handle)
    }

    /// Delayed effects still waiting.
    pub fn pending_delayed(&self) -> usize {
        self.core.scheduler.len()
    }

    /// Runs every periodic tick, delayed effect and expiry up to `target`.
    pub fn advance_to(&mut self, target: Tick) {
        self.dispatcher().advance_to(target);
    }

    /// Advances the clock by `millis`.
    pub fn advance_by(&mut self, millis: u64) {
        let target = self.now() + millis;
        self.advance_to(target);
    }
}

impl std::fmt::Debug for ProcEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcEngine")
            .field("now", &self.now())
            .field("actors", &self.core.world.actor_ids())
            .field("auras", &self.core.world.aura_count())
            .field("pending_delayed", &self.core.scheduler.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ProcEngine`].
///
/// Only the host is required. Invalid definitions and scripts do not fail
/// the build; they are rejected one by one and listed by
/// [`ProcEngine::rejected_scripts`].
pub struct ProcEngineBuilder {
    config: RuntimeConfig,
    host: Option<Box<dyn HostWorld>>,
    rng: Option<Box<dyn RandomSource>>,
    catalog: Option<Box<dyn AbilityCatalog>>,
    definitions: Vec<AuraDefinition>,
    scripts: Vec<AuraScript>,
    actors: Vec<ActorState>,
}

impl ProcEngineBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            host: None,
            rng: None,
            catalog: None,
            definitions: Vec::new(),
            scripts: Vec::new(),
            actors: Vec::new(),
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: impl HostWorld + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    /// Overrides the random source. Defaults to [`StdRandom`] seeded with
    /// `RuntimeConfig::rng_seed`.
    pub fn rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Ability catalog used to validate trigger abilities and script
    /// references.
    pub fn catalog(mut self, catalog: impl AbilityCatalog + 'static) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    pub fn definition(mut self, definition: AuraDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn definitions(mut self, definitions: impl IntoIterator<Item = AuraDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    pub fn script(mut self, script: AuraScript) -> Self {
        self.scripts.push(script);
        self
    }

    pub fn scripts(mut self, scripts: impl IntoIterator<Item = AuraScript>) -> Self {
        self.scripts.extend(scripts);
        self
    }

    pub fn actor(mut self, actor: ActorState) -> Self {
        self.actors.push(actor);
        self
    }

    /// Registers everything queued on the builder. Fails without a host or
    /// on a duplicate actor id; invalid definitions and scripts only reject.
    pub fn build(self) -> Result<ProcEngine> {
        let host = self.host.ok_or(RuntimeError::MissingHost)?;
        let rng: Box<dyn RandomSource> = match self.rng {
            Some(rng) => rng,
            None => Box::new(StdRandom::seeded(self.config.rng_seed)),
        };

        let mut registry = ScriptRegistry::new();
        if let Some(catalog) = self.catalog {
            registry.set_catalog(catalog);
        }
        // Rejections are recorded by the registry.
        for definition in self.definitions {
            let _ = registry.register_definition(definition);
        }
        for script in self.scripts {
            let _ = registry.register_script(script);
        }

        let mut engine = ProcEngine {
            registry,
            core: EngineCore::new(self.config, host, rng),
        };
        for actor in self.actors {
            engine.add_actor(actor)?;
        }

        info!(
            target: "runtime::engine",
            definitions = engine.registry.definitions().count(),
            rejected = engine.registry.rejected().len(),
            actors = engine.core.world.actor_ids().len(),
            strict_invariants = engine.core.config.strict_invariants,
            "proc engine ready"
        );
        Ok(engine)
    }
}
