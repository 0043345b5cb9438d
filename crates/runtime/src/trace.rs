//! Bounded in-memory record of reactions, in execution order.
//!
//! The trace is what makes dispatch order observable: every script hook and
//! every built-in slot behavior that runs leaves one entry behind.
use std::collections::VecDeque;

use combat_core::{ActorId, AuraHandle, AuraId, Tick};

/// Which lifecycle point a reaction ran at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TracePhase {
    Apply,
    Remove,
    Periodic,
    Proc,
    Delayed,
}

/// Who ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceSource {
    Script(&'static str),
    BuiltIn,
    Scheduler,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceOutcome {
    Completed,
    /// Aborted on a precondition; built-in behavior was allowed to run.
    FellThrough(&'static str),
    Failed(&'static str),
    /// Delayed effect dropped because its owner was gone.
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    pub at: Tick,
    pub owner: ActorId,
    pub definition: Option<AuraId>,
    pub aura: Option<AuraHandle>,
    pub slot: Option<u8>,
    pub phase: TracePhase,
    pub source: TraceSource,
    pub outcome: TraceOutcome,
}

#[derive(Clone, Debug, Default)]
pub struct DispatchTrace {
    capacity: usize,
    entries: VecDeque<TraceEntry>,
}

impl DispatchTrace {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub(crate) fn record(&mut self, entry: TraceEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    /// Names of the scripts that ran, oldest first.
    pub fn script_names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter_map(|e| match e.source {
                TraceSource::Script(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
