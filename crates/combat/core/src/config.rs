/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// How deep reactions may nest (a proc applies an aura, whose application
    /// is published, which procs another aura, ...) before the nested dispatch
    /// is refused.
    pub max_reaction_depth: usize,
}

impl EngineConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum number of effect slots on one aura definition.
    pub const MAX_EFFECT_SLOTS: usize = 8;
    /// Number of distinct resource pools an actor can carry.
    pub const MAX_RESOURCE_KINDS: usize = 8;
    /// Maximum number of explicit base-point overrides on one cast.
    pub const MAX_BASE_POINT_OVERRIDES: usize = 3;
    /// Proc chances are expressed in basis points (1/100 of a percent).
    pub const BASIS_POINTS: u32 = 10_000;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_REACTION_DEPTH: usize = 8;

    pub fn new() -> Self {
        Self {
            max_reaction_depth: Self::DEFAULT_MAX_REACTION_DEPTH,
        }
    }

    pub fn with_max_reaction_depth(max_reaction_depth: usize) -> Self {
        Self { max_reaction_depth }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
