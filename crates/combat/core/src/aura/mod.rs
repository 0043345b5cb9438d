//! Auras: time-boxed modifiers attached to actors.
//!
//! A static [`AuraDefinition`] describes stacking, duration and an ordered
//! list of [`SlotDefinition`]s. Applying a definition to an actor creates an
//! [`AuraInstance`] stored in the [`AuraArena`] and addressed by a
//! generational [`AuraHandle`]. Instances move through the
//! [`AuraState`] machine; everything that fires callbacks around those
//! transitions lives in the runtime crate.

mod arena;
mod definition;
mod instance;
mod lifecycle;
mod slot;

pub use arena::{AuraArena, AuraHandle};
pub use definition::AuraDefinition;
pub use instance::AuraInstance;
pub use lifecycle::{ApplyKind, ApplyMode, AuraState, RemovalFilter, RemoveReason};
pub use slot::{Accumulator, EffectKind, SlotDefinition, SlotRuntime, StackScaling, StatKind};
