//! The authoritative entity/component store.

use std::sync::Arc;

use indexmap::IndexMap;

use vantage_core::{
    ComponentBytes, ComponentFilter, ComponentSchema, ComponentTypeId, EntityId, EventCursor,
    Tick, WorldError, WorldEvent, WorldEventKind, WorldRead,
};

use crate::entities::EntityAllocator;
use crate::events::EventLog;

/// One table per registered component type, keyed by entity slot index.
///
/// `IndexMap` gives deterministic iteration for identical operation
/// histories, which keeps copies and replay outcomes reproducible.
#[derive(Clone, Debug, Default)]
struct ComponentTable {
    cells: IndexMap<u32, ComponentBytes>,
}

impl ComponentTable {
    /// Mirror `src` into `self`, reusing existing map capacity.
    fn mirror(&mut self, src: &Self) {
        self.cells.clear();
        self.cells
            .extend(src.cells.iter().map(|(k, v)| (*k, v.clone())));
    }

    fn approx_memory_bytes(&self) -> usize {
        let entry = std::mem::size_of::<u32>() + std::mem::size_of::<ComponentBytes>();
        let spilled: usize = self
            .cells
            .values()
            .filter(|v| v.spilled())
            .map(|v| v.capacity())
            .sum();
        self.cells.capacity() * entry + spilled
    }
}

/// A mutable entity/component store with a version counter and event log.
///
/// Exactly one instance per kernel is "live" (authoritative); any number
/// of instances built from the same schema serve as persistent replicas
/// or pooled scratch copies. The live instance is mutated only by the
/// kernel thread; replicas are synchronized from it via
/// [`copy_from`](WorldStore::copy_from) and then read concurrently.
#[derive(Clone, Debug)]
pub struct WorldStore {
    schema: Arc<ComponentSchema>,
    entities: EntityAllocator,
    tables: Vec<ComponentTable>,
    events: EventLog,
    /// Event batch drained from the live store at the last sync.
    /// Unused on the live instance itself.
    inbox: Vec<WorldEvent>,
    tick: Tick,
}

impl WorldStore {
    /// Create an empty store carrying the schema's component tables.
    ///
    /// `event_capacity` bounds the change-event log; overflow evicts the
    /// oldest events and counts them rather than erroring.
    pub fn new(schema: Arc<ComponentSchema>, event_capacity: usize) -> Self {
        let tables = (0..schema.component_count())
            .map(|_| ComponentTable::default())
            .collect();
        Self {
            schema,
            entities: EntityAllocator::new(),
            tables,
            events: EventLog::new(event_capacity),
            inbox: Vec::new(),
            tick: Tick(0),
        }
    }

    /// The schema this store was built from.
    pub fn schema(&self) -> &Arc<ComponentSchema> {
        &self.schema
    }

    /// Advance the version counter by one tick. Returns the new version.
    pub fn advance(&mut self) -> Tick {
        self.tick = Tick(self.tick.0 + 1);
        self.tick
    }

    // ── Entity and component mutation ────────────────────────────

    /// Mint a new entity.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.entities.create();
        self.events
            .record(self.tick, WorldEventKind::EntityCreated(entity));
        entity
    }

    /// Destroy an entity, removing its components from every table.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<(), WorldError> {
        self.entities.destroy(entity)?;
        for table in &mut self.tables {
            table.cells.swap_remove(&entity.index);
        }
        self.events
            .record(self.tick, WorldEventKind::EntityDestroyed(entity));
        Ok(())
    }

    /// Set or overwrite a component's payload.
    pub fn set_component(
        &mut self,
        entity: EntityId,
        component: ComponentTypeId,
        bytes: &[u8],
    ) -> Result<(), WorldError> {
        if !self.schema.contains(component) {
            return Err(WorldError::UnknownComponent { component });
        }
        if !self.entities.contains(entity) {
            return Err(WorldError::DeadEntity { entity });
        }
        self.tables[component.0 as usize]
            .cells
            .insert(entity.index, ComponentBytes::from_slice(bytes));
        self.events
            .record(self.tick, WorldEventKind::ComponentChanged { entity, component });
        Ok(())
    }

    /// Remove a component from an entity.
    ///
    /// Returns `true` if the entity carried the component.
    pub fn remove_component(
        &mut self,
        entity: EntityId,
        component: ComponentTypeId,
    ) -> Result<bool, WorldError> {
        if !self.schema.contains(component) {
            return Err(WorldError::UnknownComponent { component });
        }
        if !self.entities.contains(entity) {
            return Err(WorldError::DeadEntity { entity });
        }
        let existed = self.tables[component.0 as usize]
            .cells
            .swap_remove(&entity.index)
            .is_some();
        if existed {
            self.events
                .record(self.tick, WorldEventKind::ComponentRemoved { entity, component });
        }
        Ok(existed)
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Iterate over all live entities.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter()
    }

    /// Iterate over live entities carrying the given component.
    ///
    /// Yields nothing for an unregistered component type.
    pub fn entities_with(&self, component: ComponentTypeId) -> impl Iterator<Item = EntityId> + '_ {
        self.tables
            .get(component.0 as usize)
            .into_iter()
            .flat_map(|table| table.cells.keys())
            .map(|&index| EntityId {
                index,
                generation: self.entities.generation_of(index),
            })
    }

    /// Number of entities carrying the given component.
    pub fn component_count(&self, component: ComponentTypeId) -> usize {
        self.tables
            .get(component.0 as usize)
            .map_or(0, |t| t.cells.len())
    }

    // ── Synchronization ──────────────────────────────────────────

    /// Mirror `src` into `self`, optionally restricted by a filter.
    ///
    /// Entity liveness and the version counter are always copied in
    /// full. Component tables inside the filter are mirrored; tables
    /// outside it are cleared, so a filtered copy exposes exactly the
    /// filtered components and nothing else. Destination capacity is
    /// reused throughout; no allocation occurs once the destination has
    /// grown to the source's high-water mark.
    ///
    /// The event log and inbox are untouched; event transfer is a
    /// separate, cursor-based drain.
    pub fn copy_from(
        &mut self,
        src: &WorldStore,
        filter: Option<&ComponentFilter>,
    ) -> Result<(), WorldError> {
        if !Arc::ptr_eq(&self.schema, &src.schema) && self.schema != src.schema {
            return Err(WorldError::SchemaMismatch);
        }
        self.entities.mirror(&src.entities);
        self.tick = src.tick;
        for (i, table) in self.tables.iter_mut().enumerate() {
            let id = ComponentTypeId(i as u32);
            match filter {
                Some(f) if !f.contains(id) => table.cells.clear(),
                _ => table.mirror(&src.tables[i]),
            }
        }
        Ok(())
    }

    /// Reset logical content to empty while retaining allocated capacity.
    ///
    /// The schema is kept; entity slots, component cells, events, and
    /// the version counter are cleared. This is the reset applied before
    /// an instance returns to the snapshot pool.
    pub fn clear_retaining_capacity(&mut self) {
        self.entities.clear();
        for table in &mut self.tables {
            table.cells.clear();
        }
        self.events.clear();
        self.inbox.clear();
        self.tick = Tick(0);
    }

    // ── Events ───────────────────────────────────────────────────

    /// The cursor just past the most recently recorded event.
    pub fn event_head(&self) -> EventCursor {
        self.events.head()
    }

    /// Drain events recorded at or after `cursor`.
    ///
    /// Returns the events plus the number of requested events that were
    /// already evicted from the bounded log.
    pub fn events_after(&self, cursor: EventCursor) -> (Vec<WorldEvent>, u64) {
        self.events.drain_after(cursor)
    }

    /// Total events evicted from this store's log.
    pub fn events_dropped(&self) -> u64 {
        self.events.dropped_total()
    }

    /// Replace this instance's pending event batch.
    ///
    /// Called by snapshot providers after a sync; consumed by views.
    pub fn install_events(&mut self, batch: Vec<WorldEvent>) {
        self.inbox.clear();
        self.inbox.extend(batch);
    }

    /// The event batch installed at the last sync.
    pub fn pending_events(&self) -> &[WorldEvent] {
        &self.inbox
    }

    // ── Accounting ───────────────────────────────────────────────

    /// Approximate retained memory in bytes (capacity, not length).
    pub fn approx_memory_bytes(&self) -> usize {
        self.entities.approx_memory_bytes()
            + self
                .tables
                .iter()
                .map(ComponentTable::approx_memory_bytes)
                .sum::<usize>()
    }
}

impl WorldRead for WorldStore {
    fn version(&self) -> Tick {
        self.tick
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(entity)
    }

    fn entity_count(&self) -> usize {
        self.entities.count()
    }

    fn get_component(&self, entity: EntityId, component: ComponentTypeId) -> Option<&[u8]> {
        if !self.entities.contains(entity) {
            return None;
        }
        self.tables
            .get(component.0 as usize)?
            .cells
            .get(&entity.index)
            .map(|bytes| bytes.as_slice())
    }
}
