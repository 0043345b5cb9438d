//! Capability registration for aura scripts.
//!
//! A script attaches behavior to one aura definition by registering
//! individual capabilities against effect slots:
//!
//! - `on_apply` runs when the aura is applied, filtered by [`ApplyMode`]
//! - `on_remove` runs when it is removed, filtered by [`RemovalFilter`]
//! - `on_periodic` runs on each periodic tick of the slot
//! - `on_proc` runs when the slot procs
//! - `check_proc` adds a custom predicate to the proc evaluation
//! - `calc_amount` overrides the slot amount formula
//!
//! Periodic and proc capabilities registered through the `replace_default_*`
//! variants suppress the slot's built-in behavior when they run.
//!
//! There is no base type to inherit from; a script is just the set of
//! capabilities it registered.

mod registry;

pub use registry::{Rejection, ScriptRegistry};

use combat_core::{
    AbilityId, ApplyKind, ApplyMode, AuraId, AuraInstance, CombatEvent, RemovalFilter,
    RemoveReason, Tick,
};

use crate::context::ReactionContext;
use crate::error::ReactionError;
use crate::world::World;

pub type ReactionResult = Result<(), ReactionError>;

pub type ApplyFn = Box<dyn Fn(&mut ReactionContext<'_>, ApplyKind) -> ReactionResult>;
pub type RemoveFn = Box<dyn Fn(&mut ReactionContext<'_>, RemoveReason) -> ReactionResult>;
pub type PeriodicFn = Box<dyn Fn(&mut ReactionContext<'_>) -> ReactionResult>;
pub type ProcFn = Box<dyn Fn(&mut ReactionContext<'_>, &CombatEvent) -> ReactionResult>;
pub type CheckProcFn = Box<dyn Fn(&ProcCheck<'_>) -> bool>;
pub type CalcAmountFn = Box<dyn Fn(&AmountCalc<'_>) -> i32>;

/// How a failing reaction is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionCriticality {
    /// Logged as an error; the remaining reactions of the same aura for
    /// the current event are skipped.
    Critical,

    /// Logged as an error; dispatch continues.
    #[default]
    Important,

    /// Logged at debug level; dispatch continues.
    Optional,
}

impl ReactionCriticality {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Important => "important",
            Self::Optional => "optional",
        }
    }
}

/// Read-only view handed to `check_proc` predicates.
pub struct ProcCheck<'a> {
    pub world: &'a World,
    pub aura: &'a AuraInstance,
    pub slot: u8,
    pub event: &'a CombatEvent,
    pub now: Tick,
}

/// Read-only view handed to `calc_amount` hooks.
///
/// `current` is the default formula's result, or the previous hook's output
/// when several hooks are registered for the same slot.
pub struct AmountCalc<'a> {
    pub world: &'a World,
    pub aura: &'a AuraInstance,
    pub slot: u8,
    pub current: i32,
}

pub(crate) trait SlotHook {
    fn slot(&self) -> u8;
}

pub struct ApplyHook {
    pub slot: u8,
    pub mode: ApplyMode,
    pub(crate) run: ApplyFn,
}

pub struct RemoveHook {
    pub slot: u8,
    pub filter: RemovalFilter,
    pub(crate) run: RemoveFn,
}

pub struct PeriodicHook {
    pub slot: u8,
    pub replaces_default: bool,
    pub(crate) run: PeriodicFn,
}

pub struct ProcHook {
    pub slot: u8,
    pub replaces_default: bool,
    pub(crate) run: ProcFn,
}

pub struct CheckProcHook {
    pub slot: u8,
    pub(crate) check: CheckProcFn,
}

pub struct CalcAmountHook {
    pub slot: u8,
    pub(crate) calc: CalcAmountFn,
}

macro_rules! impl_slot_hook {
    ($($hook:ty),* $(,)?) => {
        $(impl SlotHook for $hook {
            fn slot(&self) -> u8 {
                self.slot
            }
        })*
    };
}

impl_slot_hook!(
    ApplyHook,
    RemoveHook,
    PeriodicHook,
    ProcHook,
    CheckProcHook,
    CalcAmountHook
);

/// Behavior attached to one aura definition.
pub struct AuraScript {
    name: &'static str,
    definition: AuraId,
    criticality: ReactionCriticality,
    pub(crate) apply: Vec<ApplyHook>,
    pub(crate) remove: Vec<RemoveHook>,
    pub(crate) periodic: Vec<PeriodicHook>,
    pub(crate) proc: Vec<ProcHook>,
    pub(crate) check_proc: Vec<CheckProcHook>,
    pub(crate) calc_amount: Vec<CalcAmountHook>,
    references: Vec<AbilityId>,
}

impl AuraScript {
    pub fn new(name: &'static str, definition: AuraId) -> Self {
        Self {
            name,
            definition,
            criticality: ReactionCriticality::default(),
            apply: Vec::new(),
            remove: Vec::new(),
            periodic: Vec::new(),
            proc: Vec::new(),
            check_proc: Vec::new(),
            calc_amount: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn definition(&self) -> AuraId {
        self.definition
    }

    pub fn criticality(&self) -> ReactionCriticality {
        self.criticality
    }

    #[must_use]
    pub fn with_criticality(mut self, criticality: ReactionCriticality) -> Self {
        self.criticality = criticality;
        self
    }

    /// Declares abilities the script casts, so registration can check them
    /// against the host catalog.
    #[must_use]
    pub fn references(mut self, abilities: impl IntoIterator<Item = AbilityId>) -> Self {
        self.references.extend(abilities);
        self
    }

    #[must_use]
    pub fn on_apply(
        mut self,
        slot: u8,
        mode: ApplyMode,
        run: impl Fn(&mut ReactionContext<'_>, ApplyKind) -> ReactionResult + 'static,
    ) -> Self {
        self.apply.push(ApplyHook {
            slot,
            mode,
            run: Box::new(run),
        });
        self
    }

    #[must_use]
    pub fn on_remove(
        mut self,
        slot: u8,
        filter: RemovalFilter,
        run: impl Fn(&mut ReactionContext<'_>, RemoveReason) -> ReactionResult + 'static,
    ) -> Self {
        self.remove.push(RemoveHook {
            slot,
            filter,
            run: Box::new(run),
        });
        self
    }

    #[must_use]
    pub fn on_periodic(
        self,
        slot: u8,
        run: impl Fn(&mut ReactionContext<'_>) -> ReactionResult + 'static,
    ) -> Self {
        self.push_periodic(slot, false, Box::new(run))
    }

    #[must_use]
    pub fn replace_default_periodic(
        self,
        slot: u8,
        run: impl Fn(&mut ReactionContext<'_>) -> ReactionResult + 'static,
    ) -> Self {
        self.push_periodic(slot, true, Box::new(run))
    }

    #[must_use]
    pub fn on_proc(
        self,
        slot: u8,
        run: impl Fn(&mut ReactionContext<'_>, &CombatEvent) -> ReactionResult + 'static,
    ) -> Self {
        self.push_proc(slot, false, Box::new(run))
    }

    #[must_use]
    pub fn replace_default_proc(
        self,
        slot: u8,
        run: impl Fn(&mut ReactionContext<'_>, &CombatEvent) -> ReactionResult + 'static,
    ) -> Self {
        self.push_proc(slot, true, Box::new(run))
    }

    #[must_use]
    pub fn check_proc(
        mut self,
        slot: u8,
        check: impl Fn(&ProcCheck<'_>) -> bool + 'static,
    ) -> Self {
        self.check_proc.push(CheckProcHook {
            slot,
            check: Box::new(check),
        });
        self
    }

    #[must_use]
    pub fn calc_amount(
        mut self,
        slot: u8,
        calc: impl Fn(&AmountCalc<'_>) -> i32 + 'static,
    ) -> Self {
        self.calc_amount.push(CalcAmountHook {
            slot,
            calc: Box::new(calc),
        });
        self
    }

    fn push_periodic(mut self, slot: u8, replaces_default: bool, run: PeriodicFn) -> Self {
        self.periodic.push(PeriodicHook {
            slot,
            replaces_default,
            run,
        });
        self
    }

    fn push_proc(mut self, slot: u8, replaces_default: bool, run: ProcFn) -> Self {
        self.proc.push(ProcHook {
            slot,
            replaces_default,
            run,
        });
        self
    }

    /// Every slot index any capability of this script is registered on.
    pub(crate) fn slots(&self) -> impl Iterator<Item = u8> + '_ {
        fn of<H: SlotHook>(hooks: &[H]) -> impl Iterator<Item = u8> + '_ {
            hooks.iter().map(SlotHook::slot)
        }
        of(&self.apply)
            .chain(of(&self.remove))
            .chain(of(&self.periodic))
            .chain(of(&self.proc))
            .chain(of(&self.check_proc))
            .chain(of(&self.calc_amount))
    }

    pub(crate) fn referenced_abilities(&self) -> &[AbilityId] {
        &self.references
    }
}

impl std::fmt::Debug for AuraScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuraScript")
            .field("name", &self.name)
            .field("definition", &self.definition)
            .field("criticality", &self.criticality)
            .field("apply", &self.apply.len())
            .field("remove", &self.remove.len())
            .field("periodic", &self.periodic.len())
            .field("proc", &self.proc.len())
            .finish_non_exhaustive()
    }
}
