//! Mutable engine state and the clock loop.
use combat_core::{AuraHandle, HostWorld, RandomSource, RemoveReason, Tick};
use tracing::{debug, error};

use crate::config::RuntimeConfig;
use crate::dispatcher::Dispatcher;
use crate::scheduler::Scheduler;
use crate::trace::DispatchTrace;
use crate::world::World;

/// Upper bound on work rounds at one instant. Each round runs every due
/// periodic tick, delayed effect and expiry; a round that finds nothing due
/// ends the instant.
const MAX_ROUNDS_PER_INSTANT: usize = 64;

pub(crate) struct EngineCore {
    pub(crate) config: RuntimeConfig,
    pub(crate) world: World,
    pub(crate) scheduler: Scheduler,
    pub(crate) host: Box<dyn HostWorld>,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) trace: DispatchTrace,
    /// Current nesting of `publish` calls.
    pub(crate) depth: usize,
    /// Auras whose reactions are on the call stack, innermost last.
    pub(crate) executing: Vec<AuraHandle>,
    /// Removals requested while the aura was executing.
    pub(crate) deferred: Vec<(AuraHandle, RemoveReason)>,
}

impl EngineCore {
    pub(crate) fn new(
        config: RuntimeConfig,
        host: Box<dyn HostWorld>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let trace = DispatchTrace::with_capacity(config.trace_capacity);
        Self {
            config,
            world: World::new(),
            scheduler: Scheduler::new(),
            host,
            rng,
            trace,
            depth: 0,
            executing: Vec::new(),
            deferred: Vec::new(),
        }
    }
}

impl Dispatcher<'_> {
    /// Advances the clock to `target`, stopping at every instant where a
    /// periodic tick, delayed effect or expiry is due.
    ///
    /// At one instant, periodic ticks fire first, then delayed effects in
    /// FIFO order, then expirations.
    pub(crate) fn advance_to(&mut self, target: Tick) {
        if target < self.now() {
            debug!(
                target: "runtime::clock",
                now = %self.now(),
                requested = %target,
                "clock never moves backwards"
            );
            return;
        }

        while let Some(instant) = self.next_instant().filter(|at| *at <= target) {
            let instant = instant.max(self.now());
            self.core.world.set_now(instant);
            if !self.run_instant(instant) {
                break;
            }
        }
        self.core.world.set_now(target);
    }

    fn next_instant(&self) -> Option<Tick> {
        [
            self.core.world.next_periodic(),
            self.core.scheduler.next_due(),
            self.core.world.next_expiry(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Returns false when the instant did not settle within the round limit.
    fn run_instant(&mut self, now: Tick) -> bool {
        for _ in 0..MAX_ROUNDS_PER_INSTANT {
            let periodic = self.core.world.due_periodic(now);
            for handle in &periodic {
                self.tick_periodic(*handle);
            }

            let mut delayed = 0usize;
            while let Some(entry) = self.core.scheduler.pop_due(now) {
                self.run_delayed(entry);
                delayed += 1;
            }

            let expired = self.core.world.due_expirations(now);
            for handle in &expired {
                // An earlier removal hook may already have taken it.
                if !self.core.world.is_live(*handle) {
                    continue;
                }
                if let Err(error) = self.remove_aura(*handle, RemoveReason::Expired) {
                    debug!(
                        target: "runtime::clock",
                        aura = %handle,
                        error = %error,
                        "expiry skipped"
                    );
                }
            }

            if periodic.is_empty() && delayed == 0 && expired.is_empty() {
                return true;
            }
        }

        error!(
            target: "runtime::clock",
            now = %now,
            rounds = MAX_ROUNDS_PER_INSTANT,
            "instant did not settle, remaining work postponed"
        );
        false
    }
}
