//! Common error infrastructure for combat-core.
//!
//! Errors fall into three families that are handled differently by the
//! runtime:
//!
//! - **Configuration**: a definition or script references data the host does
//!   not have. Detected at registration, the offending script never runs.
//! - **Precondition**: a reaction cannot proceed right now (actor gone,
//!   target dead). The reaction is aborted without mutation.
//! - **Invariant**: a programming error such as acting on a removed aura.
//!   Fatal in development builds, logged and absorbed in production.

use crate::aura::{AuraHandle, AuraState};
use crate::resources::ResourceKind;
use crate::types::{AbilityId, ActorId, AuraId};

/// Severity of an engine error, used to pick a handling strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Static data is inconsistent; reject the script at registration time.
    Configuration,

    /// A runtime precondition failed; abort the current reaction only.
    Precondition,

    /// An engine invariant was violated; indicates a bug in a script or host.
    Invariant,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Precondition => "precondition",
            Self::Invariant => "invariant",
        }
    }

    /// Returns true if this error indicates a bug rather than a game situation.
    pub const fn is_bug(&self) -> bool {
        matches!(self, Self::Invariant | Self::Configuration)
    }
}

/// Common trait for all engine errors.
pub trait EngineError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Static-data problems detected while registering definitions and scripts.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigError {
    #[error("{definition} is registered twice")]
    DuplicateDefinition { definition: AuraId },

    #[error("{definition} is not a registered aura definition")]
    UnknownDefinition { definition: AuraId },

    #[error("{definition} references {ability}, which the host catalog does not know")]
    UnknownAbility {
        definition: AuraId,
        ability: AbilityId,
    },

    #[error("{definition} has no effect slot {slot}")]
    SlotOutOfRange { definition: AuraId, slot: u8 },

    #[error("{definition} declares {count} effect slots (limit {limit})")]
    TooManySlots {
        definition: AuraId,
        count: usize,
        limit: usize,
    },

    #[error("{definition} must allow at least one stack")]
    ZeroMaxStack { definition: AuraId },

    #[error("{definition} slot {slot} is periodic but has no positive period")]
    MissingPeriod { definition: AuraId, slot: u8 },

    #[error("{definition} slot {slot} needs a trigger ability for its built-in behavior")]
    MissingTriggerAbility { definition: AuraId, slot: u8 },

    #[error("{definition} slot {slot} reacts to procs but declares no proc spec")]
    MissingProcSpec { definition: AuraId, slot: u8 },
}

impl EngineError for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Configuration
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateDefinition { .. } => "CONFIG_DUPLICATE_DEFINITION",
            Self::UnknownDefinition { .. } => "CONFIG_UNKNOWN_DEFINITION",
            Self::UnknownAbility { .. } => "CONFIG_UNKNOWN_ABILITY",
            Self::SlotOutOfRange { .. } => "CONFIG_SLOT_OUT_OF_RANGE",
            Self::TooManySlots { .. } => "CONFIG_TOO_MANY_SLOTS",
            Self::ZeroMaxStack { .. } => "CONFIG_ZERO_MAX_STACK",
            Self::MissingPeriod { .. } => "CONFIG_MISSING_PERIOD",
            Self::MissingTriggerAbility { .. } => "CONFIG_MISSING_TRIGGER_ABILITY",
            Self::MissingProcSpec { .. } => "CONFIG_MISSING_PROC_SPEC",
        }
    }
}

/// A reaction could not run against the current world state.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PreconditionError {
    #[error("actor {0} is not known to the engine")]
    ActorNotFound(ActorId),

    #[error("actor {0} is dead")]
    ActorDead(ActorId),

    #[error("aura {0} is no longer active")]
    AuraNotActive(AuraHandle),

    #[error("aura {0} is still being applied")]
    AuraBusy(AuraHandle),

    #[error("{definition} is not a registered aura definition")]
    UnknownDefinition { definition: AuraId },

    #[error("reaction has no caster to act on behalf of")]
    NoCaster,

    #[error("actor {actor} has no {kind} pool")]
    MissingResource { actor: ActorId, kind: ResourceKind },

    #[error("reaction depth {depth} exceeds the configured limit")]
    ReactionDepthExceeded { depth: usize },
}

impl EngineError for PreconditionError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Precondition
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ActorNotFound(_) => "PRECONDITION_ACTOR_NOT_FOUND",
            Self::ActorDead(_) => "PRECONDITION_ACTOR_DEAD",
            Self::AuraNotActive(_) => "PRECONDITION_AURA_NOT_ACTIVE",
            Self::AuraBusy(_) => "PRECONDITION_AURA_BUSY",
            Self::UnknownDefinition { .. } => "PRECONDITION_UNKNOWN_DEFINITION",
            Self::NoCaster => "PRECONDITION_NO_CASTER",
            Self::MissingResource { .. } => "PRECONDITION_MISSING_RESOURCE",
            Self::ReactionDepthExceeded { .. } => "PRECONDITION_REACTION_DEPTH",
        }
    }
}

/// Programming errors: the engine was asked to do something its invariants forbid.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvariantViolation {
    #[error("aura handle {handle} is stale (instance already removed)")]
    StaleHandle { handle: AuraHandle },

    #[error("aura {handle} is removed and cannot transition to {attempted:?}")]
    TransitionFromRemoved {
        handle: AuraHandle,
        attempted: AuraState,
    },

    #[error("aura {handle} cannot transition from {from:?} to {to:?}")]
    IllegalTransition {
        handle: AuraHandle,
        from: AuraState,
        to: AuraState,
    },

    #[error("stack count {stack} exceeds maximum {max} for {definition}")]
    StackOverflow {
        definition: AuraId,
        stack: u32,
        max: u32,
    },

    #[error("stack count of {handle} cannot drop to zero while the aura is kept")]
    EmptyStack { handle: AuraHandle },

    #[error("{definition} has no effect slot {slot}")]
    SlotOutOfRange { definition: AuraId, slot: u8 },
}

impl EngineError for InvariantViolation {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Invariant
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::StaleHandle { .. } => "INVARIANT_STALE_HANDLE",
            Self::TransitionFromRemoved { .. } => "INVARIANT_TRANSITION_FROM_REMOVED",
            Self::IllegalTransition { .. } => "INVARIANT_ILLEGAL_TRANSITION",
            Self::StackOverflow { .. } => "INVARIANT_STACK_OVERFLOW",
            Self::EmptyStack { .. } => "INVARIANT_EMPTY_STACK",
            Self::SlotOutOfRange { .. } => "INVARIANT_SLOT_OUT_OF_RANGE",
        }
    }
}
