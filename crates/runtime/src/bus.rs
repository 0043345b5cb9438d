//! Synchronous event bus.
//!
//! `publish` snapshots the actor's aura list, then walks it in registration
//! order. For each live aura, every slot with a proc spec is evaluated once
//! against the event; a proc runs the slot's proc hooks and then its
//! built-in behavior unless a replacing hook suppressed it.
use combat_core::{
    ActorId, AuraHandle, CombatEvent, PreconditionError, ProcDecision, ProcEvaluator, ProcInput,
    ProcSpec,
};
use tracing::{error, trace};

use crate::context::Origin;
use crate::dispatcher::{Dispatcher, HookStatus};
use crate::error::ReactionError;
use crate::script::ProcCheck;
use crate::trace::TracePhase;

/// What one publish did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Auras the event was offered to.
    pub delivered: usize,
    /// Slots that procced.
    pub procs: usize,
}

impl PublishReport {
    pub(crate) fn merge(&mut self, other: PublishReport) {
        self.delivered += other.delivered;
        self.procs += other.procs;
    }
}

impl Dispatcher<'_> {
    /// Delivers `event` to every live aura on `actor` except `exclude`.
    pub(crate) fn publish(
        &mut self,
        actor: ActorId,
        event: &CombatEvent,
        exclude: Option<AuraHandle>,
    ) -> Result<PublishReport, ReactionError> {
        let depth = self.core.depth;
        if depth >= self.core.config.engine.max_reaction_depth {
            error!(
                target: "runtime::bus",
                actor = %actor,
                kind = %event.kind,
                depth,
                "reaction depth exceeded, nested publish aborted"
            );
            return Err(PreconditionError::ReactionDepthExceeded { depth }.into());
        }

        let snapshot = self
            .core
            .world
            .actor(actor)
            .ok_or(PreconditionError::ActorNotFound(actor))?
            .auras()
            .to_vec();

        self.core.depth += 1;
        let mut report = PublishReport::default();
        for handle in snapshot {
            if Some(handle) == exclude || !self.core.world.is_live(handle) {
                continue;
            }
            report.delivered += 1;
            report.procs += self.deliver(handle, event);
        }
        self.core.depth -= 1;

        trace!(
            target: "runtime::bus",
            actor = %actor,
            kind = %event.kind,
            delivered = report.delivered,
            procs = report.procs,
            "event published"
        );
        Ok(report)
    }

    /// Publishes on each actor in turn. Per-actor failures are logged and
    /// skipped.
    pub(crate) fn publish_area(
        &mut self,
        actors: &[ActorId],
        event: &CombatEvent,
    ) -> PublishReport {
        let mut report = PublishReport::default();
        for actor in actors {
            match self.publish(*actor, event, None) {
                Ok(partial) => report.merge(partial),
                Err(error) => trace!(
                    target: "runtime::bus",
                    actor = %actor,
                    error = %error,
                    "area publish skipped actor"
                ),
            }
        }
        report
    }

    fn deliver(&mut self, handle: AuraHandle, event: &CombatEvent) -> usize {
        let scripts = self.scripts;
        let Some(def) = self
            .core
            .world
            .aura(handle)
            .and_then(|instance| scripts.definition(instance.definition()))
        else {
            return 0;
        };

        let mut procs = 0;
        for (index, slot_def) in def.slots.iter().enumerate() {
            let Some(spec) = &slot_def.proc else {
                continue;
            };
            if !self.core.world.is_live(handle) {
                break;
            }
            let slot = index as u8;
            if !self.evaluate_proc(handle, slot, spec, event).is_proc() {
                continue;
            }

            procs += 1;
            let now = self.now();
            if let Some(runtime) = self
                .core
                .world
                .aura_mut(handle)
                .and_then(|instance| instance.slot_mut(slot))
            {
                runtime.last_proc_at = Some(now);
            }

            let aborted = self.with_executing(handle, |d| d.fire_proc(handle, slot, event));
            if aborted {
                break;
            }
        }
        procs
    }

    fn evaluate_proc(
        &mut self,
        handle: AuraHandle,
        slot: u8,
        spec: &ProcSpec,
        event: &CombatEvent,
    ) -> ProcDecision {
        let scripts = self.scripts;
        let core = &mut *self.core;
        let Some(instance) = core.world.aura(handle) else {
            return ProcDecision::Filtered;
        };
        let world = &core.world;
        let now = world.now();

        let input = ProcInput {
            event,
            owner: instance.owner(),
            now,
            last_proc_at: instance.slot(slot).and_then(|s| s.last_proc_at),
            target_alive: event.target.is_none_or(|target| world.is_alive(target)),
        };
        let condition = || {
            scripts
                .check_proc_hooks(instance.definition(), slot)
                .all(|(_, hook)| {
                    (hook.check)(&ProcCheck {
                        world,
                        aura: instance,
                        slot,
                        event,
                        now,
                    })
                })
        };

        let decision = ProcEvaluator::evaluate(spec, &input, condition, &mut *core.rng);
        trace!(
            target: "runtime::bus",
            aura = %handle,
            slot,
            kind = %event.kind,
            decision = %decision,
            "proc evaluated"
        );
        decision
    }

    fn fire_proc(&mut self, handle: AuraHandle, slot: u8, event: &CombatEvent) -> bool {
        let scripts = self.scripts;
        let Some(instance) = self.core.world.aura(handle) else {
            return false;
        };
        let definition = instance.definition();
        let origin = Origin::for_aura(instance, Some(slot)).with_trigger(event.ability);

        let mut suppress = false;
        for (script, hook) in scripts.proc_hooks(definition, slot) {
            let status =
                self.run_hook(script, origin, TracePhase::Proc, |ctx| (hook.run)(ctx, event));
            if status == HookStatus::Aborted {
                return true;
            }
            suppress |= hook.replaces_default && status.suppresses_default();
        }
        if !suppress {
            self.proc_default(handle, slot, event, origin);
        }
        false
    }
}
