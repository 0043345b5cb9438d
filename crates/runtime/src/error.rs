//! Errors surfaced by reactions and by the engine façade.
//!
//! [`ReactionError`] is what a script callback returns. The bus logs it
//! according to the registration's criticality and keeps dispatching, so it
//! never unwinds past the reaction that produced it. [`RuntimeError`] is what
//! the façade returns to the host.
use combat_core::{
    AbilityId, ActorId, CastFailure, ConfigError, CooldownError, EngineError, ErrorSeverity,
    InvariantViolation, PreconditionError,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReactionError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Cooldown(#[from] CooldownError),

    #[error("cast of {ability} failed: {failure}")]
    CastFailed {
        ability: AbilityId,
        failure: CastFailure,
    },

    /// Free-form failure raised by a script.
    #[error("{0}")]
    Script(String),
}

impl ReactionError {
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }

    /// Precondition failures leave the world untouched, so the slot's
    /// built-in behavior may still run.
    pub fn falls_through(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Whether the bus refused a nested publish. The bus logs these itself.
    pub fn is_depth_limit(&self) -> bool {
        matches!(
            self,
            Self::Precondition(PreconditionError::ReactionDepthExceeded { .. })
        )
    }
}

impl EngineError for ReactionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Precondition(e) => e.severity(),
            Self::Invariant(e) => e.severity(),
            Self::Cooldown(_) | Self::CastFailed { .. } | Self::Script(_) => {
                ErrorSeverity::Precondition
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Precondition(e) => e.error_code(),
            Self::Invariant(e) => e.error_code(),
            Self::Cooldown(CooldownError::NotReady { .. }) => "COOLDOWN_NOT_READY",
            Self::Cooldown(CooldownError::NoCharges { .. }) => "COOLDOWN_NO_CHARGES",
            Self::CastFailed { .. } => "REACTION_CAST_FAILED",
            Self::Script(_) => "REACTION_SCRIPT",
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("engine requires a host world before building")]
    MissingHost,

    #[error("actor {0} is already registered")]
    DuplicateActor(ActorId),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Cooldown(#[from] CooldownError),

    #[error(transparent)]
    Reaction(ReactionError),
}

impl From<ReactionError> for RuntimeError {
    fn from(error: ReactionError) -> Self {
        match error {
            ReactionError::Precondition(e) => Self::Precondition(e),
            ReactionError::Invariant(e) => Self::Invariant(e),
            ReactionError::Cooldown(e) => Self::Cooldown(e),
            other => Self::Reaction(other),
        }
    }
}

impl EngineError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingHost | Self::DuplicateActor(_) => ErrorSeverity::Configuration,
            Self::Config(e) => e.severity(),
            Self::Precondition(e) => e.severity(),
            Self::Invariant(e) => e.severity(),
            Self::Cooldown(_) => ErrorSeverity::Precondition,
            Self::Reaction(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingHost => "RUNTIME_MISSING_HOST",
            Self::DuplicateActor(_) => "RUNTIME_DUPLICATE_ACTOR",
            Self::Config(e) => e.error_code(),
            Self::Precondition(e) => e.error_code(),
            Self::Invariant(e) => e.error_code(),
            Self::Cooldown(e) => ReactionError::Cooldown(e.clone()).error_code(),
            Self::Reaction(e) => e.error_code(),
        }
    }
}
