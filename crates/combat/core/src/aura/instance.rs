use std::collections::BTreeMap;

use arrayvec::ArrayVec;

use super::arena::AuraHandle;
use super::definition::AuraDefinition;
use super::lifecycle::AuraState;
use super::slot::SlotRuntime;
use crate::config::EngineConfig;
use crate::error::InvariantViolation;
use crate::types::{ActorId, AuraId, Tick};

/// A live aura on an actor.
///
/// Stack count is always in `1..=max_stack` while the instance exists; the
/// runtime removes the instance instead of storing a zero stack.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraInstance {
    handle: AuraHandle,
    definition: AuraId,
    owner: ActorId,
    caster: Option<ActorId>,
    state: AuraState,
    stack: u32,
    max_stack: u32,
    max_duration: Option<u64>,
    applied_at: Tick,
    expires_at: Option<Tick>,
    slots: ArrayVec<SlotRuntime, { EngineConfig::MAX_EFFECT_SLOTS }>,
    /// Script-owned transient values, keyed by script-chosen integers.
    scratch: BTreeMap<u32, i64>,
}

impl AuraInstance {
    /// Builds an `Inactive` instance with one stack and a full duration.
    ///
    /// The definition must have passed [`AuraDefinition::validate`]; slots
    /// beyond `MAX_EFFECT_SLOTS` are ignored.
    pub fn new(
        handle: AuraHandle,
        definition: &AuraDefinition,
        owner: ActorId,
        caster: Option<ActorId>,
        now: Tick,
    ) -> Self {
        let slots = definition
            .slots
            .iter()
            .take(EngineConfig::MAX_EFFECT_SLOTS)
            .map(|slot| SlotRuntime {
                amount: slot.calculate_amount(1),
                next_tick: slot.period.filter(|p| *p > 0).map(|p| now + p),
                ..SlotRuntime::default()
            })
            .collect();

        Self {
            handle,
            definition: definition.id,
            owner,
            caster,
            state: AuraState::Inactive,
            stack: 1,
            max_stack: definition.max_stack.max(1),
            max_duration: definition.max_duration,
            applied_at: now,
            expires_at: definition.max_duration.map(|d| now + d),
            slots,
            scratch: BTreeMap::new(),
        }
    }

    pub fn handle(&self) -> AuraHandle {
        self.handle
    }

    pub fn definition(&self) -> AuraId {
        self.definition
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn caster(&self) -> Option<ActorId> {
        self.caster
    }

    /// A refresh by another caster takes the aura over.
    pub fn set_caster(&mut self, caster: Option<ActorId>) {
        self.caster = caster;
    }

    pub fn state(&self) -> AuraState {
        self.state
    }

    pub fn stack(&self) -> u32 {
        self.stack
    }

    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    pub fn applied_at(&self) -> Tick {
        self.applied_at
    }

    pub fn expires_at(&self) -> Option<Tick> {
        self.expires_at
    }

    pub fn max_duration(&self) -> Option<u64> {
        self.max_duration
    }

    /// Remaining duration at `now`; `None` for a permanent aura.
    pub fn remaining(&self, now: Tick) -> Option<u64> {
        self.expires_at.map(|at| at.since(now))
    }

    pub fn is_expired(&self, now: Tick) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Moves to `next`, refusing anything the state machine forbids.
    pub fn transition(&mut self, next: AuraState) -> Result<(), InvariantViolation> {
        if self.state.is_terminal() {
            return Err(InvariantViolation::TransitionFromRemoved {
                handle: self.handle,
                attempted: next,
            });
        }
        if !self.state.can_transition_to(next) {
            return Err(InvariantViolation::IllegalTransition {
                handle: self.handle,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Resets the duration to its maximum.
    pub fn refresh_duration(&mut self, now: Tick) {
        self.expires_at = self.max_duration.map(|d| now + d);
    }

    /// Sets the remaining duration, clamped to the maximum. Returns the
    /// duration actually set.
    pub fn set_duration(&mut self, millis: u64, now: Tick) -> u64 {
        let clamped = self.max_duration.map_or(millis, |max| millis.min(max));
        self.expires_at = Some(now + clamped);
        clamped
    }

    /// Stack count after applying `delta`, clamped to `[0, max_stack]`.
    /// Zero means the aura should be removed.
    pub fn stack_after(&self, delta: i32) -> u32 {
        let next = i64::from(self.stack) + i64::from(delta);
        next.clamp(0, i64::from(self.max_stack)) as u32
    }

    /// Adds one stack, capped at the maximum. Returns whether it grew.
    pub fn increment_stack(&mut self) -> bool {
        if self.stack >= self.max_stack {
            return false;
        }
        self.stack += 1;
        true
    }

    pub fn set_stack(&mut self, stack: u32) -> Result<(), InvariantViolation> {
        if stack == 0 {
            return Err(InvariantViolation::EmptyStack {
                handle: self.handle,
            });
        }
        if stack > self.max_stack {
            return Err(InvariantViolation::StackOverflow {
                definition: self.definition,
                stack,
                max: self.max_stack,
            });
        }
        self.stack = stack;
        Ok(())
    }

    /// Recomputes every slot amount from the definition and current stack.
    pub fn recalculate_amounts(&mut self, definition: &AuraDefinition) {
        for (runtime, slot) in self.slots.iter_mut().zip(&definition.slots) {
            runtime.amount = slot.calculate_amount(self.stack);
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: u8) -> Option<&SlotRuntime> {
        self.slots.get(usize::from(index))
    }

    pub fn slot_mut(&mut self, index: u8) -> Option<&mut SlotRuntime> {
        self.slots.get_mut(usize::from(index))
    }

    pub fn slot_amount(&self, index: u8) -> Option<i32> {
        self.slot(index).map(|s| s.amount)
    }

    pub fn slots(&self) -> impl Iterator<Item = (u8, &SlotRuntime)> {
        self.slots.iter().enumerate().map(|(i, s)| (i as u8, s))
    }

    /// Earliest periodic tick due across all slots.
    pub fn next_tick(&self) -> Option<Tick> {
        self.slots.iter().filter_map(|s| s.next_tick).min()
    }

    /// Slots whose periodic tick is due at or before `now`, in slot order.
    pub fn due_slots(&self, now: Tick) -> impl Iterator<Item = u8> + '_ {
        self.slots()
            .filter(move |(_, s)| s.next_tick.is_some_and(|at| at <= now))
            .map(|(i, _)| i)
    }

    /// Marks the due tick of `index` as fired and schedules the next one.
    pub fn advance_tick(&mut self, index: u8, period: u64) {
        if let Some(slot) = self.slot_mut(index)
            && let Some(at) = slot.next_tick
        {
            slot.next_tick = Some(at + period.max(1));
            slot.ticks_fired += 1;
        }
    }

    pub fn scratch(&self, key: u32) -> Option<i64> {
        self.scratch.get(&key).copied()
    }

    pub fn set_scratch(&mut self, key: u32, value: i64) {
        self.scratch.insert(key, value);
    }

    pub fn take_scratch(&mut self, key: u32) -> Option<i64> {
        self.scratch.remove(&key)
    }
}
