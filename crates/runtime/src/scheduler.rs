//! Delayed effects as scheduled messages.
//!
//! Entries are ordered by `(fire_at, sequence)`, so effects due at the same
//! instant run in the order they were scheduled. Removing an aura does not
//! cancel what it scheduled; each entry carries its own [`Liveness`] rule that
//! is checked when it comes due.
use std::collections::BTreeMap;
use std::fmt;

use combat_core::Tick;

use crate::context::{Origin, ReactionContext};
use crate::dispatcher::DispatchRequest;
use crate::error::ReactionError;

/// Opaque handle used to cancel a pending delayed effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleHandle(u64);

/// Whether a delayed effect still fires after its owner is gone. Every
/// schedule call names one; there is no default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Liveness {
    /// Fires regardless of what happened to the owning aura.
    FireAlways,
    /// Dropped unless the owning aura is still live (or, for effects without
    /// an aura, unless the owning actor is still alive).
    RequireOwner,
}

pub type DelayedCallback = Box<dyn FnOnce(&mut ReactionContext<'_>) -> Result<(), ReactionError>>;

/// What to do when the effect comes due.
pub enum DelayedAction {
    Dispatch(DispatchRequest),
    Callback(DelayedCallback),
}

impl DelayedAction {
    pub fn callback(
        f: impl FnOnce(&mut ReactionContext<'_>) -> Result<(), ReactionError> + 'static,
    ) -> Self {
        Self::Callback(Box::new(f))
    }
}

impl From<DispatchRequest> for DelayedAction {
    fn from(request: DispatchRequest) -> Self {
        Self::Dispatch(request)
    }
}

impl fmt::Debug for DelayedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch(request) => f.debug_tuple("Dispatch").field(request).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Scheduled {
    pub handle: ScheduleHandle,
    pub origin: Origin,
    pub liveness: Liveness,
    pub action: DelayedAction,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BTreeMap<(Tick, u64), Scheduled>,
    next_sequence: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule(
        &mut self,
        fire_at: Tick,
        origin: Origin,
        liveness: Liveness,
        action: DelayedAction,
    ) -> ScheduleHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let handle = ScheduleHandle(sequence);
        self.queue.insert(
            (fire_at, sequence),
            Scheduled {
                handle,
                origin,
                liveness,
                action,
            },
        );
        handle
    }

    /// Returns whether a pending entry was removed.
    pub fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        let key = self
            .queue
            .keys()
            .find(|(_, sequence)| *sequence == handle.0)
            .copied();
        key.is_some_and(|key| self.queue.remove(&key).is_some())
    }

    pub fn next_due(&self) -> Option<Tick> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    /// Pops the oldest entry due at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Tick) -> Option<Scheduled> {
        let (at, _) = *self.queue.keys().next()?;
        if at > now {
            return None;
        }
        self.queue.pop_first().map(|(_, entry)| entry)
    }

    pub fn is_pending(&self, handle: ScheduleHandle) -> bool {
        self.queue.keys().any(|(_, sequence)| *sequence == handle.0)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::ActorId;

    fn origin() -> Origin {
        Origin::actor(ActorId(1))
    }

    fn despawn() -> DelayedAction {
        DispatchRequest::Despawn { actor: ActorId(9) }.into()
    }

    #[test]
    fn same_instant_entries_pop_in_fifo_order() {
        let mut scheduler = Scheduler::new();
        let late = scheduler.schedule(Tick(200), origin(), Liveness::FireAlways, despawn());
        let first = scheduler.schedule(Tick(100), origin(), Liveness::FireAlways, despawn());
        let second = scheduler.schedule(Tick(100), origin(), Liveness::FireAlways, despawn());

        assert_eq!(scheduler.next_due(), Some(Tick(100)));
        assert!(scheduler.pop_due(Tick(99)).is_none());
        assert_eq!(scheduler.pop_due(Tick(100)).map(|e| e.handle), Some(first));
        assert_eq!(scheduler.pop_due(Tick(100)).map(|e| e.handle), Some(second));
        assert!(scheduler.pop_due(Tick(100)).is_none());
        assert_eq!(scheduler.pop_due(Tick(500)).map(|e| e.handle), Some(late));
    }

    #[test]
    fn cancel_removes_only_the_target() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule(Tick(10), origin(), Liveness::FireAlways, despawn());
        let b = scheduler.schedule(Tick(10), origin(), Liveness::RequireOwner, despawn());

        assert!(scheduler.cancel(a));
        assert!(!scheduler.cancel(a));
        assert!(!scheduler.is_pending(a));
        assert!(scheduler.is_pending(b));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn entries_keep_the_liveness_they_were_given() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Tick(5), origin(), Liveness::RequireOwner, despawn());
        scheduler.schedule(Tick(5), origin(), Liveness::FireAlways, despawn());

        let popped: Vec<Liveness> = std::iter::from_fn(|| scheduler.pop_due(Tick(5)))
            .map(|entry| entry.liveness)
            .collect();
        assert_eq!(popped, vec![Liveness::RequireOwner, Liveness::FireAlways]);
    }
}
