//! Imperative shell around `combat-core`.
//!
//! This crate owns everything that runs: the script registry, the event bus,
//! the delayed-effect scheduler, the effect dispatcher and the clock. Hosts
//! embed a [`ProcEngine`], publish [`CombatEvent`]s into it and advance its
//! clock; the engine calls back through [`HostWorld`] for anything that
//! touches the game world.
//!
//! Modules are organized by responsibility:
//! - [`engine`] hosts the façade, its builder and the clock loop
//! - [`script`] holds capability registration and validation
//! - [`bus`] delivers events and evaluates procs
//! - [`scheduler`] keeps delayed effects as ordered messages
//! - [`dispatcher`] carries out secondary effects
//! - [`trace`] records which reactions ran, in order
//!
//! [`CombatEvent`]: combat_core::CombatEvent
//! [`HostWorld`]: combat_core::HostWorld
pub mod bus;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod random;
pub mod scheduler;
pub mod script;
pub mod telemetry;
pub mod trace;
pub mod world;

mod behavior;
mod lifecycle;

pub use bus::PublishReport;
pub use config::RuntimeConfig;
pub use context::{Origin, ReactionContext};
pub use dispatcher::{DispatchOutcome, DispatchRequest};
pub use engine::{ProcEngine, ProcEngineBuilder};
pub use error::{ReactionError, Result, RuntimeError};
pub use random::StdRandom;
pub use scheduler::{DelayedAction, DelayedCallback, Liveness, ScheduleHandle, Scheduler};
pub use script::{
    AmountCalc, AuraScript, ProcCheck, ReactionCriticality, ReactionResult, Rejection,
    ScriptRegistry,
};
pub use trace::{DispatchTrace, TraceEntry, TraceOutcome, TracePhase, TraceSource};
pub use world::World;
