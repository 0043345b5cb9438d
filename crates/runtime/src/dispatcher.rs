//! Effect dispatcher: the only path by which reactions mutate anything.
//!
//! A [`Dispatcher`] pairs mutable engine state with the immutable script
//! registry. Every reaction gets a reborrowed dispatcher through its
//! [`ReactionContext`], so nested work (a reaction applying an aura whose
//! apply hooks cast something) runs on the same synchronous call stack.
use combat_core::{
    AbilityId, ActorId, AuraHandle, AuraId, CastOptions, CastOrigin, CastOutcome, CastRequest,
    CooldownKey, EngineError, InvariantViolation, PreconditionError, RemoveReason, ResourceKind,
    StatKind, Tick,
};
use tracing::{debug, error};

use crate::context::{Origin, ReactionContext};
use crate::engine::EngineCore;
use crate::error::ReactionError;
use crate::scheduler::{DelayedAction, Liveness, ScheduleHandle, Scheduled};
use crate::script::{AuraScript, ReactionCriticality, ReactionResult, ScriptRegistry};
use crate::trace::{TraceEntry, TraceOutcome, TracePhase, TraceSource};

/// A secondary effect, described as data.
///
/// Resource and cooldown requests name the actor whose ledger they touch, so
/// a reaction on one actor can refund another actor's resources without
/// reaching into its state directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchRequest {
    Cast(CastRequest),
    AdjustResource {
        actor: ActorId,
        kind: ResourceKind,
        delta: i32,
    },
    StartCooldown {
        actor: ActorId,
        key: CooldownKey,
        duration: u64,
    },
    ModifyCooldown {
        actor: ActorId,
        key: CooldownKey,
        delta: i64,
    },
    ResetCooldown {
        actor: ActorId,
        key: CooldownKey,
        restore_charge: bool,
    },
    RestoreCharge {
        actor: ActorId,
        key: CooldownKey,
    },
    ModifyChargeRecovery {
        actor: ActorId,
        key: CooldownKey,
        delta: i64,
    },
    ModifyStat {
        actor: ActorId,
        stat: StatKind,
        delta: i32,
    },
    ApplyAura {
        target: ActorId,
        definition: AuraId,
        caster: Option<ActorId>,
    },
    RemoveAura {
        handle: AuraHandle,
        reason: RemoveReason,
    },
    ModifyStack {
        handle: AuraHandle,
        delta: i32,
    },
    SetDuration {
        handle: AuraHandle,
        millis: u64,
    },
    Despawn {
        actor: ActorId,
    },
}

/// Result of a [`DispatchRequest`], one variant per kind of answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Cast(CastOutcome),
    /// Delta actually applied to the resource.
    Adjusted(i32),
    /// Remaining cooldown after the change; `None` when untracked.
    Remaining(Option<u64>),
    Reset(bool),
    /// Charges available after the change; `None` when not charge-based.
    Charges(Option<u32>),
    Applied(AuraHandle),
    Stack(u32),
    Duration(u64),
    Done,
}

/// How a single hook invocation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HookStatus {
    Completed,
    /// Precondition failure: nothing changed, default behavior still runs.
    FellThrough,
    Failed,
    /// Critical failure: remaining reactions of the aura are skipped.
    Aborted,
}

impl HookStatus {
    pub(crate) fn suppresses_default(self) -> bool {
        !matches!(self, Self::FellThrough)
    }
}

pub(crate) struct Dispatcher<'a> {
    pub(crate) core: &'a mut EngineCore,
    pub(crate) scripts: &'a ScriptRegistry,
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn new(core: &'a mut EngineCore, scripts: &'a ScriptRegistry) -> Self {
        Self { core, scripts }
    }

    pub(crate) fn reborrow(&mut self) -> Dispatcher<'_> {
        Dispatcher {
            core: &mut *self.core,
            scripts: self.scripts,
        }
    }

    pub(crate) fn now(&self) -> Tick {
        self.core.world.now()
    }

    pub(crate) fn dispatch(
        &mut self,
        request: DispatchRequest,
    ) -> Result<DispatchOutcome, ReactionError> {
        let outcome = match request {
            DispatchRequest::Cast(cast) => DispatchOutcome::Cast(self.cast(
                cast.caster,
                cast.target,
                cast.ability,
                cast.options,
            )),
            DispatchRequest::AdjustResource { actor, kind, delta } => {
                DispatchOutcome::Adjusted(self.adjust_resource(actor, kind, delta)?)
            }
            DispatchRequest::StartCooldown {
                actor,
                key,
                duration,
            } => {
                self.start_cooldown(actor, key, duration)?;
                DispatchOutcome::Done
            }
            DispatchRequest::ModifyCooldown { actor, key, delta } => {
                DispatchOutcome::Remaining(self.modify_cooldown(actor, key, delta)?)
            }
            DispatchRequest::ResetCooldown {
                actor,
                key,
                restore_charge,
            } => DispatchOutcome::Reset(self.reset_cooldown(actor, key, restore_charge)?),
            DispatchRequest::RestoreCharge { actor, key } => {
                DispatchOutcome::Charges(self.restore_charge(actor, key)?)
            }
            DispatchRequest::ModifyChargeRecovery { actor, key, delta } => {
                DispatchOutcome::Charges(self.modify_charge_recovery(actor, key, delta)?)
            }
            DispatchRequest::ModifyStat { actor, stat, delta } => {
                self.modify_stat(actor, stat, delta);
                DispatchOutcome::Done
            }
            DispatchRequest::ApplyAura {
                target,
                definition,
                caster,
            } => DispatchOutcome::Applied(self.apply_aura(target, definition, caster)?),
            DispatchRequest::RemoveAura { handle, reason } => {
                self.remove_aura(handle, reason)?;
                DispatchOutcome::Done
            }
            DispatchRequest::ModifyStack { handle, delta } => {
                DispatchOutcome::Stack(self.modify_stack(handle, delta)?)
            }
            DispatchRequest::SetDuration { handle, millis } => {
                DispatchOutcome::Duration(self.set_duration(handle, millis)?)
            }
            DispatchRequest::Despawn { actor } => {
                self.core.host.despawn(actor);
                debug!(target: "runtime::dispatcher", actor = %actor, "despawn");
                DispatchOutcome::Done
            }
        };
        Ok(outcome)
    }

    pub(crate) fn cast_origin(&self, origin: &Origin) -> CastOrigin {
        CastOrigin {
            aura: origin.definition,
            handle: origin.aura,
            ability: origin.trigger,
        }
    }

    pub(crate) fn cast(
        &mut self,
        caster: ActorId,
        target: ActorId,
        ability: AbilityId,
        options: CastOptions,
    ) -> CastOutcome {
        let request = CastRequest {
            caster,
            target,
            ability,
            options,
        };
        let outcome = self.core.host.cast_ability(&request);
        debug!(
            target: "runtime::dispatcher",
            caster = %caster,
            target_actor = %target,
            ability = %ability,
            base_point = ?options.base_point(0),
            outcome = ?outcome,
            "cast"
        );
        outcome
    }

    pub(crate) fn adjust_resource(
        &mut self,
        actor: ActorId,
        kind: ResourceKind,
        delta: i32,
    ) -> Result<i32, PreconditionError> {
        let state = self.core.world.require_actor_mut(actor)?;
        Ok(state.resources.adjust(kind, delta))
    }

    pub(crate) fn start_cooldown(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        duration: u64,
    ) -> Result<(), PreconditionError> {
        let now = self.now();
        let state = self.core.world.require_actor_mut(actor)?;
        state.cooldowns.start_cooldown(key, duration, now);
        Ok(())
    }

    pub(crate) fn modify_cooldown(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        delta: i64,
    ) -> Result<Option<u64>, PreconditionError> {
        let now = self.now();
        let state = self.core.world.require_actor_mut(actor)?;
        Ok(state.cooldowns.modify_cooldown(key, delta, now))
    }

    pub(crate) fn reset_cooldown(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        restore_charge: bool,
    ) -> Result<bool, PreconditionError> {
        let now = self.now();
        let state = self.core.world.require_actor_mut(actor)?;
        Ok(state.cooldowns.reset_cooldown(key, now, restore_charge))
    }

    pub(crate) fn restore_charge(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
    ) -> Result<Option<u32>, PreconditionError> {
        let now = self.now();
        let state = self.core.world.require_actor_mut(actor)?;
        Ok(state.cooldowns.restore_charge(key, now))
    }

    pub(crate) fn modify_charge_recovery(
        &mut self,
        actor: ActorId,
        key: CooldownKey,
        delta: i64,
    ) -> Result<Option<u32>, PreconditionError> {
        let now = self.now();
        let state = self.core.world.require_actor_mut(actor)?;
        Ok(state.cooldowns.modify_charge_recovery(key, delta, now))
    }

    pub(crate) fn modify_stat(&mut self, actor: ActorId, stat: StatKind, delta: i32) {
        if delta == 0 {
            return;
        }
        self.core.host.modify_stat(actor, stat, delta);
        debug!(
            target: "runtime::dispatcher",
            actor = %actor,
            stat = %stat,
            delta,
            "modify stat"
        );
    }

    pub(crate) fn schedule_after(
        &mut self,
        delay: u64,
        origin: Origin,
        liveness: Liveness,
        action: DelayedAction,
    ) -> ScheduleHandle {
        let fire_at = self.now() + delay;
        let handle = self
            .core
            .scheduler
            .schedule(fire_at, origin, liveness, action);
        debug!(
            target: "runtime::scheduler",
            owner = %origin.owner,
            fire_at = %fire_at,
            liveness = ?liveness,
            handle = ?handle,
            "delayed effect scheduled"
        );
        handle
    }

    /// Runs one delayed effect that came due.
    pub(crate) fn run_delayed(&mut self, entry: Scheduled) {
        let Scheduled {
            handle,
            origin,
            liveness,
            action,
        } = entry;

        let owner_alive = match liveness {
            Liveness::FireAlways => true,
            Liveness::RequireOwner => match origin.aura {
                Some(aura) => self.core.world.is_live(aura),
                None => self.core.world.is_alive(origin.owner),
            },
        };
        if !owner_alive {
            debug!(
                target: "runtime::scheduler",
                handle = ?handle,
                owner = %origin.owner,
                "owner gone, delayed effect dropped"
            );
            self.record(
                origin,
                TracePhase::Delayed,
                TraceSource::Scheduler,
                TraceOutcome::Skipped,
            );
            return;
        }

        let result = match action {
            DelayedAction::Dispatch(request) => self.dispatch(request).map(|_| ()),
            DelayedAction::Callback(callback) => {
                let mut ctx = ReactionContext::new(self.reborrow(), origin);
                callback(&mut ctx)
            }
        };

        let outcome = match &result {
            Ok(()) => TraceOutcome::Completed,
            Err(e) if e.falls_through() => TraceOutcome::FellThrough(e.error_code()),
            Err(e) => TraceOutcome::Failed(e.error_code()),
        };
        self.record(origin, TracePhase::Delayed, TraceSource::Scheduler, outcome);

        match result {
            Err(error) if error.falls_through() => debug!(
                target: "runtime::scheduler",
                handle = ?handle,
                owner = %origin.owner,
                code = error.error_code(),
                "delayed effect aborted on precondition"
            ),
            Err(error) => error!(
                target: "runtime::scheduler",
                handle = ?handle,
                owner = %origin.owner,
                code = error.error_code(),
                error = %error,
                "delayed effect failed"
            ),
            Ok(()) => {}
        }
    }

    /// Runs one script hook inside a fresh reaction context, records it in
    /// the trace, and reports a failure according to the script's
    /// criticality.
    pub(crate) fn run_hook(
        &mut self,
        script: &AuraScript,
        origin: Origin,
        phase: TracePhase,
        hook: impl FnOnce(&mut ReactionContext<'_>) -> ReactionResult,
    ) -> HookStatus {
        let result = {
            let mut ctx = ReactionContext::new(self.reborrow(), origin);
            hook(&mut ctx)
        };

        let (status, outcome) = match &result {
            Ok(()) => (HookStatus::Completed, TraceOutcome::Completed),
            Err(e) if e.falls_through() => {
                (HookStatus::FellThrough, TraceOutcome::FellThrough(e.error_code()))
            }
            Err(e) => match script.criticality() {
                ReactionCriticality::Critical => {
                    (HookStatus::Aborted, TraceOutcome::Failed(e.error_code()))
                }
                _ => (HookStatus::Failed, TraceOutcome::Failed(e.error_code())),
            },
        };
        self.record(origin, phase, TraceSource::Script(script.name()), outcome);

        if let Err(error) = &result {
            report_failure(script, phase, status, error);
        }
        status
    }

    /// Runs `f` with `handle` marked as executing. Removals of an executing
    /// aura are deferred until the outermost frame for that aura returns.
    pub(crate) fn with_executing<T>(
        &mut self,
        handle: AuraHandle,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.core.executing.push(handle);
        let output = f(self);
        if let Some(pos) = self.core.executing.iter().rposition(|h| *h == handle) {
            self.core.executing.remove(pos);
        }

        if !self.is_executing(handle)
            && let Some(pos) = self.core.deferred.iter().position(|(h, _)| *h == handle)
        {
            let (_, reason) = self.core.deferred.remove(pos);
            if let Err(error) = self.remove_aura(handle, reason) {
                debug!(
                    target: "runtime::auras",
                    aura = %handle,
                    error = %error,
                    "deferred removal skipped"
                );
            }
        }
        output
    }

    pub(crate) fn is_executing(&self, handle: AuraHandle) -> bool {
        self.core.executing.contains(&handle)
    }

    /// Applies the invariant policy: panic when strict, otherwise log and
    /// hand the violation back as an error.
    pub(crate) fn invariant(&self, violation: InvariantViolation) -> ReactionError {
        if self.core.config.strict_invariants {
            panic!("invariant violated: {violation}");
        }
        error!(
            target: "runtime::invariants",
            code = violation.error_code(),
            error = %violation,
            "invariant violation ignored"
        );
        ReactionError::Invariant(violation)
    }

    pub(crate) fn record(
        &mut self,
        origin: Origin,
        phase: TracePhase,
        source: TraceSource,
        outcome: TraceOutcome,
    ) {
        let entry = TraceEntry {
            at: self.now(),
            owner: origin.owner,
            definition: origin.definition,
            aura: origin.aura,
            slot: origin.slot,
            phase,
            source,
            outcome,
        };
        self.core.trace.record(entry);
    }
}

fn report_failure(script: &AuraScript, phase: TracePhase, status: HookStatus, error: &ReactionError) {
    let level = script.criticality().as_str();
    match (status, script.criticality()) {
        (HookStatus::FellThrough, _) | (_, ReactionCriticality::Optional) => debug!(
            target: "runtime::bus",
            script = script.name(),
            definition = %script.definition(),
            phase = ?phase,
            criticality = level,
            code = error.error_code(),
            error = %error,
            "reaction did not complete"
        ),
        (HookStatus::Aborted, _) => error!(
            target: "runtime::bus",
            script = script.name(),
            definition = %script.definition(),
            phase = ?phase,
            criticality = level,
            code = error.error_code(),
            error = %error,
            "critical reaction failed, skipping remaining reactions of this aura"
        ),
        _ => error!(
            target: "runtime::bus",
            script = script.name(),
            definition = %script.definition(),
            phase = ?phase,
            criticality = level,
            code = error.error_code(),
            error = %error,
            "reaction failed"
        ),
    }
}
