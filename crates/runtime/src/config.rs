//! Runtime configuration and its environment loader.
use std::env;

use combat_core::EngineConfig;

/// Configuration shared by the engine façade and its dispatch machinery.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub engine: EngineConfig,
    /// Panic on invariant violations instead of logging them.
    pub strict_invariants: bool,
    /// Number of entries kept by the dispatch trace (0 disables it).
    pub trace_capacity: usize,
    /// Seed for the default random source.
    pub rng_seed: u64,
}

impl RuntimeConfig {
    pub const DEFAULT_TRACE_CAPACITY: usize = 256;

    /// Construct configuration from process environment variables.
    ///
    /// - `PROC_ENGINE_MAX_REACTION_DEPTH`
    /// - `PROC_ENGINE_STRICT_INVARIANTS` (`true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`)
    /// - `PROC_ENGINE_TRACE_CAPACITY`
    /// - `PROC_ENGINE_RNG_SEED`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(depth) = read_env::<usize>("PROC_ENGINE_MAX_REACTION_DEPTH") {
            config.engine.max_reaction_depth = depth.max(1);
        }

        if let Some(strict) = read_env_bool("PROC_ENGINE_STRICT_INVARIANTS") {
            config.strict_invariants = strict;
        }

        if let Some(capacity) = read_env::<usize>("PROC_ENGINE_TRACE_CAPACITY") {
            config.trace_capacity = capacity;
        }

        if let Some(seed) = read_env::<u64>("PROC_ENGINE_RNG_SEED") {
            config.rng_seed = seed;
        }

        config
    }

    #[must_use]
    pub fn with_strict_invariants(mut self, strict: bool) -> Self {
        self.strict_invariants = strict;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    #[must_use]
    pub fn with_max_reaction_depth(mut self, depth: usize) -> Self {
        self.engine.max_reaction_depth = depth;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            strict_invariants: cfg!(debug_assertions),
            trace_capacity: Self::DEFAULT_TRACE_CAPACITY,
            rng_seed: 0,
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
