//! Deterministic data model and state machines for the proc engine.
//!
//! `combat-core` defines how time-boxed modifiers (auras) are described,
//! how their instances move through the apply/refresh/stack/remove lifecycle,
//! and how per-actor resources, cooldowns and charges are accounted. It does
//! no logging and owns no clock; the runtime crate drives everything here
//! through plain method calls and decides how violations are surfaced.
//!
//! Modules are organized by responsibility:
//! - [`types`] identifiers and the millisecond [`Tick`]
//! - [`resources`] and [`cooldown`] the per-actor ledgers
//! - [`aura`] definitions, instances, lifecycle and the generational arena
//! - [`proc`] and [`event`] proc evaluation against typed combat events
//! - [`host`] the boundary traits implemented by the embedding game server
pub mod actor;
pub mod aura;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod event;
pub mod host;
pub mod proc;
pub mod resources;
pub mod rng;
pub mod types;

pub use actor::ActorState;
pub use aura::{
    Accumulator, ApplyKind, ApplyMode, AuraArena, AuraDefinition, AuraHandle, AuraInstance,
    AuraState, EffectKind, RemovalFilter, RemoveReason, SlotDefinition, SlotRuntime, StackScaling,
    StatKind,
};
pub use config::EngineConfig;
pub use cooldown::{ChargeState, CooldownEntry, CooldownError, CooldownKey, CooldownManager};
pub use error::{
    ConfigError, EngineError, ErrorSeverity, InvariantViolation, PreconditionError,
};
pub use event::{CombatEvent, EventKind, EventMask, ResourceCost};
pub use host::{
    AbilityCatalog, AuraQuery, CastFailure, CastOptions, CastOrigin, CastOutcome, CastRequest,
    HostWorld, TriggerFlags,
};
pub use proc::{ProcChance, ProcDecision, ProcEvaluator, ProcInput, ProcRequirements, ProcSpec};
pub use resources::{ResourceKind, ResourceLedger, ResourcePool};
pub use rng::{FixedRolls, PcgRandom, RandomSource};
pub use types::{AbilityId, ActorId, AuraId, CategoryId, Tick};
