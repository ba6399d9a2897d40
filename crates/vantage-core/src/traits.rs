//! Core abstraction traits for read access to world state.

use crate::id::{ComponentTypeId, EntityId, Tick};

/// Read-only access to entity and component state.
///
/// Implemented by the world store and by snapshot views. Decouples
/// worker-facing code and test doubles from the concrete storage type.
pub trait WorldRead {
    /// The world version this state reflects.
    fn version(&self) -> Tick;

    /// Whether the entity exists (index valid and generation current).
    fn contains(&self, entity: EntityId) -> bool;

    /// Number of live entities.
    fn entity_count(&self) -> usize;

    /// Read a component's payload bytes.
    ///
    /// Returns `None` if the entity is dead, the component type is not
    /// registered, or the entity does not carry the component.
    fn get_component(&self, entity: EntityId, component: ComponentTypeId) -> Option<&[u8]>;
}
