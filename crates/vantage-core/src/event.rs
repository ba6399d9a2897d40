//! World change events and the cursor type used to drain them.

use crate::id::{ComponentTypeId, EntityId, Tick};

/// A change that occurred in the authoritative world store.
///
/// Events are recorded by the live store as mutations are applied and
/// drained into snapshot instances at resync time, so workers can react
/// to changes without diffing whole component tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldEvent {
    /// The world version at which the change was applied.
    pub tick: Tick,
    /// What changed.
    pub kind: WorldEventKind,
}

/// The kinds of change recorded in the world event log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEventKind {
    /// A new entity was created.
    EntityCreated(EntityId),
    /// An entity was destroyed; its components were removed.
    EntityDestroyed(EntityId),
    /// A component value was set or overwritten.
    ComponentChanged {
        /// The entity whose component changed.
        entity: EntityId,
        /// The component type that changed.
        component: ComponentTypeId,
    },
    /// A component was removed from an entity.
    ComponentRemoved {
        /// The entity the component was removed from.
        entity: EntityId,
        /// The removed component type.
        component: ComponentTypeId,
    },
}

/// Position in a world store's event stream.
///
/// Event drains are cursor-based rather than tick-based so that dropped
/// events (the log is bounded) are detected exactly: a drain returns the
/// events recorded after the cursor plus a count of events that were
/// already evicted. Obtain cursors from the store's event head; the
/// default cursor precedes all events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventCursor(pub u64);
