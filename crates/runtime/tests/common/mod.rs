//! Shared fixtures for the integration tests: a host that records every call
//! and a few engine builders.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use combat_core::{
    AbilityId, ActorId, ActorState, AuraDefinition, CastFailure, CastOutcome, CastRequest,
    FixedRolls, HostWorld, ResourceKind, ResourceLedger, StatKind,
};
use combat_runtime::{AuraScript, ProcEngine, RuntimeConfig};

pub const PLAYER: ActorId = ActorId(1);
pub const ENEMY: ActorId = ActorId(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostCall {
    Cast(CastRequest),
    Stat {
        actor: ActorId,
        stat: StatKind,
        delta: i32,
    },
    Despawn(ActorId),
}

/// Shared view of everything the engine asked the host to do.
#[derive(Clone, Default)]
pub struct HostLog(Rc<RefCell<Vec<HostCall>>>);

impl HostLog {
    pub fn calls(&self) -> Vec<HostCall> {
        self.0.borrow().clone()
    }

    pub fn casts(&self) -> Vec<CastRequest> {
        self.0
            .borrow()
            .iter()
            .filter_map(|call| match call {
                HostCall::Cast(request) => Some(*request),
                _ => None,
            })
            .collect()
    }

    pub fn casts_of(&self, ability: AbilityId) -> Vec<CastRequest> {
        self.casts()
            .into_iter()
            .filter(|request| request.ability == ability)
            .collect()
    }

    /// Net stat change pushed for `actor`.
    pub fn stat_total(&self, actor: ActorId, stat: StatKind) -> i32 {
        self.0
            .borrow()
            .iter()
            .filter_map(|call| match call {
                HostCall::Stat {
                    actor: a,
                    stat: s,
                    delta,
                } if *a == actor && *s == stat => Some(*delta),
                _ => None,
            })
            .sum()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct RecordingHost {
    log: HostLog,
    refused: BTreeSet<AbilityId>,
}

impl RecordingHost {
    pub fn new() -> (Self, HostLog) {
        let log = HostLog::default();
        let host = Self {
            log: log.clone(),
            refused: BTreeSet::new(),
        };
        (host, log)
    }

    pub fn refusing(mut self, ability: AbilityId) -> Self {
        self.refused.insert(ability);
        self
    }
}

impl HostWorld for RecordingHost {
    fn cast_ability(&mut self, request: &CastRequest) -> CastOutcome {
        self.log.0.borrow_mut().push(HostCall::Cast(*request));
        if self.refused.contains(&request.ability) {
            CastOutcome::Failed(CastFailure::InvalidTarget)
        } else {
            CastOutcome::Cast
        }
    }

    fn modify_stat(&mut self, actor: ActorId, stat: StatKind, delta: i32) {
        self.log
            .0
            .borrow_mut()
            .push(HostCall::Stat { actor, stat, delta });
    }

    fn despawn(&mut self, actor: ActorId) {
        self.log.0.borrow_mut().push(HostCall::Despawn(actor));
    }
}

/// Counter shared between a test and the scripts it registers.
#[derive(Clone, Default)]
pub struct Counter(Rc<Cell<i32>>);

impl Counter {
    pub fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn get(&self) -> i32 {
        self.0.get()
    }
}

/// Ordered record of labels pushed by scripts.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

pub fn actors() -> [ActorState; 2] {
    [
        ActorState::new(PLAYER)
            .with_resources(ResourceLedger::new().with_pool(ResourceKind::Mana, 50, 100)),
        ActorState::new(ENEMY)
            .with_resources(ResourceLedger::new().with_pool(ResourceKind::Mana, 20, 100)),
    ]
}

/// Engine with the two standard actors, every roll succeeding, and
/// non-strict invariants.
pub fn engine(
    definitions: impl IntoIterator<Item = AuraDefinition>,
    scripts: impl IntoIterator<Item = AuraScript>,
) -> (ProcEngine, HostLog) {
    engine_with(
        RuntimeConfig::default().with_strict_invariants(false),
        FixedRolls::new([0]),
        definitions,
        scripts,
    )
}

pub fn engine_with(
    config: RuntimeConfig,
    rolls: FixedRolls,
    definitions: impl IntoIterator<Item = AuraDefinition>,
    scripts: impl IntoIterator<Item = AuraScript>,
) -> (ProcEngine, HostLog) {
    let (host, log) = RecordingHost::new();
    let [player, enemy] = actors();
    let engine = ProcEngine::builder()
        .config(config)
        .host(host)
        .rng(rolls)
        .definitions(definitions)
        .scripts(scripts)
        .actor(player)
        .actor(enemy)
        .build()
        .expect("engine builds");
    assert!(
        engine.rejected_scripts().is_empty(),
        "unexpected rejections: {:?}",
        engine.rejected_scripts()
    );
    (engine, log)
}
