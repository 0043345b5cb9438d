use crate::aura::AuraHandle;
use crate::cooldown::CooldownManager;
use crate::resources::ResourceLedger;
use crate::types::ActorId;

/// Engine-side view of a host actor.
///
/// The host creates and destroys actors; the engine only keeps what it owns
/// for them: resource pools, cooldowns and the ordered list of auras.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorState {
    pub id: ActorId,
    pub alive: bool,
    pub resources: ResourceLedger,
    pub cooldowns: CooldownManager,
    /// Aura handles in registration order.
    auras: Vec<AuraHandle>,
}

impl ActorState {
    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            alive: true,
            resources: ResourceLedger::new(),
            cooldowns: CooldownManager::new(),
            auras: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_resources(mut self, resources: ResourceLedger) -> Self {
        self.resources = resources;
        self
    }

    pub fn auras(&self) -> &[AuraHandle] {
        &self.auras
    }

    pub fn attach(&mut self, handle: AuraHandle) {
        if !self.auras.contains(&handle) {
            self.auras.push(handle);
        }
    }

    /// Returns whether the handle was attached.
    pub fn detach(&mut self, handle: AuraHandle) -> bool {
        let before = self.auras.len();
        self.auras.retain(|h| *h != handle);
        self.auras.len() != before
    }
}
