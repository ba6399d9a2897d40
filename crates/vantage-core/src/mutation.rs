//! Deferred mutation records and the per-worker write-ahead log.
//!
//! Workers never write to a world store directly. They append
//! [`MutationRecord`]s to the [`MutationLog`] embedded in their view;
//! the kernel replays each log against the live store on its own thread
//! after all workers have finished, in registration order.

use smallvec::SmallVec;

use crate::error::ReplayError;
use crate::id::{ComponentTypeId, EntityId};

/// Opaque component payload bytes.
///
/// Payloads up to 16 bytes are stored inline, which covers the common
/// fixed-size numeric components without heap allocation.
pub type ComponentBytes = SmallVec<[u8; 16]>;

/// The entity a mutation record applies to.
///
/// Entity IDs are minted by the live store, so a worker creating an
/// entity cannot know its final ID. [`MutationLog::create_entity`]
/// returns a `Created` target indexing the log's creations in order;
/// the kernel resolves it to the real ID during replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationTarget {
    /// An entity that already existed in the view's snapshot.
    Existing(EntityId),
    /// The n-th entity created by this log, minted at replay time.
    Created(u32),
}

/// A single deferred mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    /// Mint a new entity. Resolved targets index creations in log order.
    CreateEntity,
    /// Destroy an entity and remove its components.
    DestroyEntity {
        /// The entity to destroy.
        target: MutationTarget,
    },
    /// Set or overwrite a component value.
    SetComponent {
        /// The entity to modify.
        target: MutationTarget,
        /// The component type to set.
        component: ComponentTypeId,
        /// The new payload.
        bytes: ComponentBytes,
    },
    /// Remove a component from an entity.
    RemoveComponent {
        /// The entity to modify.
        target: MutationTarget,
        /// The component type to remove.
        component: ComponentTypeId,
    },
}

/// Replay state of a [`MutationLog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogState {
    /// Accepting appends; not yet replayed.
    Open,
    /// Records have been taken for replay (or discarded). Appending or
    /// replaying again is a usage error.
    Replayed,
}

/// An ordered, append-only buffer of deferred mutations.
///
/// Produced by exactly one worker against exactly one tick's view.
/// Appended to only by the owning worker thread; taken for replay
/// exactly once, by the kernel thread. The replay guard makes a second
/// replay of the same log a detectable error rather than a silent
/// duplication of its effects.
#[derive(Debug)]
pub struct MutationLog {
    records: Vec<MutationRecord>,
    created: u32,
    state: LogState,
}

impl Default for MutationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationLog {
    /// Create an empty, open log.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            created: 0,
            state: LogState::Open,
        }
    }

    /// Record the creation of a new entity.
    ///
    /// Returns a [`MutationTarget::Created`] placeholder that later
    /// records in this log may use to address the new entity.
    ///
    /// # Panics
    ///
    /// Panics if the log has already been replayed.
    pub fn create_entity(&mut self) -> MutationTarget {
        self.assert_open();
        let target = MutationTarget::Created(self.created);
        self.created += 1;
        self.records.push(MutationRecord::CreateEntity);
        target
    }

    /// Record the destruction of an entity.
    ///
    /// # Panics
    ///
    /// Panics if the log has already been replayed.
    pub fn destroy_entity(&mut self, target: MutationTarget) {
        self.assert_open();
        self.records.push(MutationRecord::DestroyEntity { target });
    }

    /// Record a component write.
    ///
    /// # Panics
    ///
    /// Panics if the log has already been replayed.
    pub fn set_component(&mut self, target: MutationTarget, component: ComponentTypeId, bytes: &[u8]) {
        self.assert_open();
        self.records.push(MutationRecord::SetComponent {
            target,
            component,
            bytes: ComponentBytes::from_slice(bytes),
        });
    }

    /// Record a component removal.
    ///
    /// # Panics
    ///
    /// Panics if the log has already been replayed.
    pub fn remove_component(&mut self, target: MutationTarget, component: ComponentTypeId) {
        self.assert_open();
        self.records.push(MutationRecord::RemoveComponent { target, component });
    }

    /// The recorded mutations, in append order.
    pub fn records(&self) -> &[MutationRecord] {
        &self.records
    }

    /// Number of recorded mutations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log holds no mutations.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of `CreateEntity` records in the log.
    pub fn created_count(&self) -> u32 {
        self.created
    }

    /// Take the records for replay, sealing the log.
    ///
    /// Returns [`ReplayError::AlreadyReplayed`] if called a second time,
    /// which is how a double replay is detected instead of silently
    /// duplicating entities.
    pub fn take_for_replay(&mut self) -> Result<Vec<MutationRecord>, ReplayError> {
        match self.state {
            LogState::Open => {
                self.state = LogState::Replayed;
                Ok(std::mem::take(&mut self.records))
            }
            LogState::Replayed => Err(ReplayError::AlreadyReplayed),
        }
    }

    /// Discard the log's records without replaying them, sealing the log.
    ///
    /// Used by the kernel for the log of a failed worker.
    pub fn discard(&mut self) -> usize {
        let dropped = self.records.len();
        self.records.clear();
        self.state = LogState::Replayed;
        dropped
    }

    fn assert_open(&self) {
        assert!(
            self.state == LogState::Open,
            "mutation log appended to after replay"
        );
    }
}
