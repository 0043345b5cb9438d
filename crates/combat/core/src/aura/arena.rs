//! Generational storage for aura instances.
//!
//! Scripts and delayed effects hold [`AuraHandle`]s instead of references.
//! Removing an instance bumps its slot's generation, so a handle kept past
//! removal no longer resolves even after the slot is reused.

use std::fmt;

use super::instance::AuraInstance;

/// Stable reference to an aura instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraHandle {
    index: u32,
    generation: u32,
}

impl AuraHandle {
    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for AuraHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aura#{}v{}", self.index, self.generation)
    }
}

#[derive(Clone, Debug, Default)]
struct Entry {
    generation: u32,
    value: Option<AuraInstance>,
}

#[derive(Clone, Debug, Default)]
pub struct AuraArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    len: usize,
}

impl AuraArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the instance built by `make`, which receives the handle the
    /// instance will live under.
    pub fn insert_with(&mut self, make: impl FnOnce(AuraHandle) -> AuraInstance) -> AuraHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.entries.push(Entry::default());
                (self.entries.len() - 1) as u32
            }
        };
        let entry = &mut self.entries[index as usize];
        let handle = AuraHandle {
            index,
            generation: entry.generation,
        };
        entry.value = Some(make(handle));
        self.len += 1;
        handle
    }

    pub fn get(&self, handle: AuraHandle) -> Option<&AuraInstance> {
        self.entries
            .get(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
            .and_then(|e| e.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: AuraHandle) -> Option<&mut AuraInstance> {
        self.entries
            .get_mut(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
            .and_then(|e| e.value.as_mut())
    }

    pub fn contains(&self, handle: AuraHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Takes the instance out and invalidates `handle`.
    pub fn remove(&mut self, handle: AuraHandle) -> Option<AuraInstance> {
        let entry = self
            .entries
            .get_mut(handle.index as usize)
            .filter(|e| e.generation == handle.generation)?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (AuraHandle, &AuraInstance)> {
        self.entries.iter().enumerate().filter_map(|(index, e)| {
            e.value.as_ref().map(|value| {
                (
                    AuraHandle {
                        index: index as u32,
                        generation: e.generation,
                    },
                    value,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraDefinition;
    use crate::types::{ActorId, AuraId, Tick};

    fn spawn(arena: &mut AuraArena, id: u32) -> AuraHandle {
        let def = AuraDefinition::new(AuraId(id), "test");
        arena.insert_with(|h| AuraInstance::new(h, &def, ActorId(1), None, Tick::ZERO))
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let mut arena = AuraArena::new();
        let first = spawn(&mut arena, 1);
        assert!(arena.remove(first).is_some());

        let second = spawn(&mut arena, 2);
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);

        assert!(arena.get(first).is_none());
        assert!(arena.remove(first).is_none());
        assert_eq!(arena.get(second).map(|a| a.definition()), Some(AuraId(2)));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn handle_is_recorded_on_instance() {
        let mut arena = AuraArena::new();
        let a = spawn(&mut arena, 1);
        let b = spawn(&mut arena, 2);
        assert_eq!(arena.get(a).map(|i| i.handle()), Some(a));
        assert_eq!(arena.iter().map(|(h, _)| h).collect::<Vec<_>>(), vec![a, b]);
    }
}
