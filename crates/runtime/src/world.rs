//! Engine-owned world state: actors and the aura arena.
use std::collections::BTreeMap;

use combat_core::{
    ActorId, ActorState, AuraArena, AuraHandle, AuraId, AuraInstance, AuraQuery,
    PreconditionError, ResourceKind, Tick,
};

#[derive(Debug, Default)]
pub struct World {
    now: Tick,
    actors: BTreeMap<ActorId, ActorState>,
    auras: AuraArena,
}

impl World {
    /// Empty world at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the last processed instant.
    pub fn now(&self) -> Tick {
        self.now
    }

    pub(crate) fn set_now(&mut self, now: Tick) {
        self.now = now;
    }

    /// Actor by id.
    pub fn actor(&self, id: ActorId) -> Option<&ActorState> {
        self.actors.get(&id)
    }

    /// Mutable actor by id.
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut ActorState> {
        self.actors.get_mut(&id)
    }

    pub(crate) fn require_actor_mut(
        &mut self,
        id: ActorId,
    ) -> Result<&mut ActorState, PreconditionError> {
        self.actors
            .get_mut(&id)
            .ok_or(PreconditionError::ActorNotFound(id))
    }

    /// Every actor, in id order.
    pub fn actors(&self) -> impl Iterator<Item = &ActorState> {
        self.actors.values()
    }

    /// Ids of every actor, in id order.
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }

    pub(crate) fn insert_actor(&mut self, actor: ActorState) -> bool {
        if self.actors.contains_key(&actor.id) {
            return false;
        }
        self.actors.insert(actor.id, actor);
        true
    }

    /// Whether `id` exists and is alive.
    pub fn is_alive(&self, id: ActorId) -> bool {
        self.actors.get(&id).is_some_and(|a| a.alive)
    }

    /// Instance behind `handle`, including ones mid-removal. `None` once freed.
    pub fn aura(&self, handle: AuraHandle) -> Option<&AuraInstance> {
        self.auras.get(handle)
    }

    pub(crate) fn aura_mut(&mut self, handle: AuraHandle) -> Option<&mut AuraInstance> {
        self.auras.get_mut(handle)
    }

    pub(crate) fn arena_mut(&mut self) -> &mut AuraArena {
        &mut self.auras
    }

    /// Whether `handle` resolves to an instance that takes part in dispatch.
    pub fn is_live(&self, handle: AuraHandle) -> bool {
        self.auras.get(handle).is_some_and(|a| a.state().is_live())
    }

    /// Live auras on `actor`, in registration order.
    pub fn auras_on(&self, actor: ActorId) -> impl Iterator<Item = &AuraInstance> {
        self.actors
            .get(&actor)
            .into_iter()
            .flat_map(|a| a.auras().iter())
            .filter_map(|h| self.auras.get(*h))
            .filter(|a| a.state().is_live())
    }

    /// Instances held by the arena.
    pub fn aura_count(&self) -> usize {
        self.auras.len()
    }

    /// Current value of a resource, if the actor tracks it.
    pub fn peek_resource(&self, actor: ActorId, kind: ResourceKind) -> Option<u32> {
        self.actors.get(&actor)?.resources.peek(kind)
    }

    /// Stack count of `handle`.
    pub fn stack_of(&self, handle: AuraHandle) -> Option<u32> {
        self.auras.get(handle).map(|a| a.stack())
    }

    /// Earliest periodic tick due on any live aura.
    pub(crate) fn next_periodic(&self) -> Option<Tick> {
        self.auras
            .iter()
            .filter(|(_, a)| a.state().is_live())
            .filter_map(|(_, a)| a.next_tick())
            .min()
    }

    /// Earliest expiry of any live aura.
    pub(crate) fn next_expiry(&self) -> Option<Tick> {
        self.auras
            .iter()
            .filter(|(_, a)| a.state().is_live())
            .filter_map(|(_, a)| a.expires_at())
            .min()
    }

    /// Live auras with a periodic tick due at or before `now`, walking actors
    /// in id order and auras in registration order.
    pub(crate) fn due_periodic(&self, now: Tick) -> Vec<AuraHandle> {
        self.live_handles()
            .filter(|h| {
                self.auras
                    .get(*h)
                    .and_then(|a| a.next_tick())
                    .is_some_and(|at| at <= now)
            })
            .collect()
    }

    pub(crate) fn due_expirations(&self, now: Tick) -> Vec<AuraHandle> {
        self.live_handles()
            .filter(|h| self.auras.get(*h).is_some_and(|a| a.is_expired(now)))
            .collect()
    }

    fn live_handles(&self) -> impl Iterator<Item = AuraHandle> + '_ {
        self.actors
            .values()
            .flat_map(|a| a.auras().iter().copied())
            .filter(|h| self.is_live(*h))
    }
}

impl AuraQuery for World {
    fn find_aura(&self, actor: ActorId, definition: AuraId) -> Option<AuraHandle> {
        self.auras_on(actor)
            .find(|a| a.definition() == definition)
            .map(|a| a.handle())
    }

    fn slot_amount(&self, aura: AuraHandle, slot: u8) -> Option<i32> {
        self.auras.get(aura)?.slot_amount(slot)
    }
}
