//! Generational entity slot allocator.

use vantage_core::EntityId;
use vantage_core::WorldError;

/// Allocates entity slots with generation counters.
///
/// Destroyed slots go on a free list and are reused with a bumped
/// generation, so stale handles never resolve to a successor entity.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    live_count: usize,
}

impl EntityAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn create(&mut self) -> EntityId {
        self.live_count += 1;
        if let Some(index) = self.free.pop() {
            self.alive[index as usize] = true;
            EntityId {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    pub(crate) fn destroy(&mut self, entity: EntityId) -> Result<(), WorldError> {
        if !self.contains(entity) {
            return Err(WorldError::DeadEntity { entity });
        }
        let idx = entity.index as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free.push(entity.index);
        self.live_count -= 1;
        Ok(())
    }

    pub(crate) fn contains(&self, entity: EntityId) -> bool {
        let idx = entity.index as usize;
        idx < self.alive.len() && self.alive[idx] && self.generations[idx] == entity.generation
    }

    pub(crate) fn count(&self) -> usize {
        self.live_count
    }

    /// Current generation of a slot. Only meaningful for live slots.
    pub(crate) fn generation_of(&self, index: u32) -> u32 {
        self.generations[index as usize]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(idx, _)| EntityId {
                index: idx as u32,
                generation: self.generations[idx],
            })
    }

    /// Mirror `src` into `self`, reusing existing vector capacity.
    pub(crate) fn mirror(&mut self, src: &Self) {
        self.generations.clone_from(&src.generations);
        self.alive.clone_from(&src.alive);
        self.free.clone_from(&src.free);
        self.live_count = src.live_count;
    }

    /// Reset to empty while retaining allocated capacity.
    pub(crate) fn clear(&mut self) {
        self.generations.clear();
        self.alive.clear();
        self.free.clear();
        self.live_count = 0;
    }

    pub(crate) fn approx_memory_bytes(&self) -> usize {
        self.generations.capacity() * std::mem::size_of::<u32>()
            + self.alive.capacity()
            + self.free.capacity() * std::mem::size_of::<u32>()
    }
}
