//! Read-only views onto snapshot instances.

use std::sync::Arc;

use vantage_core::{
    ComponentTypeId, EntityId, MutationLog, ProviderInstanceId, Tick, WorldEvent, WorldRead,
};
use vantage_world::WorldStore;

/// How a view holds its snapshot instance.
///
/// Pooled acquisitions own their instance outright (no reference count,
/// no allocation); replica and cohort acquisitions share one instance
/// through an `Arc`.
#[derive(Debug)]
pub(crate) enum ViewStore {
    /// Exclusively-owned scratch instance (pooled provider).
    Owned(WorldStore),
    /// Shared instance (replica or cohort provider).
    Shared(Arc<WorldStore>),
}

/// A capability-restricted handle onto a snapshot of world state.
///
/// Views expose reads, event consumption, and a deferred [`MutationLog`];
/// they deliberately expose no write operations on the store. A view's
/// lifetime runs from `acquire` to `release` on the provider that issued
/// it — holding one across more than one kernel tick is a usage error
/// that the providers detect.
#[derive(Debug)]
pub struct View {
    store: ViewStore,
    provider: ProviderInstanceId,
    event_cursor: usize,
    log: MutationLog,
}

// Compile-time assertion: View must be Send (it crosses into worker threads).
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<View>();
};

impl View {
    pub(crate) fn owned(store: WorldStore, provider: ProviderInstanceId) -> Self {
        Self {
            store: ViewStore::Owned(store),
            provider,
            event_cursor: 0,
            log: MutationLog::new(),
        }
    }

    pub(crate) fn shared(store: Arc<WorldStore>, provider: ProviderInstanceId) -> Self {
        Self {
            store: ViewStore::Shared(store),
            provider,
            event_cursor: 0,
            log: MutationLog::new(),
        }
    }

    /// Dismantle the view for release. The mutation log is dropped;
    /// callers that need it take it first via [`View::take_log`].
    pub(crate) fn into_store(self) -> (ViewStore, ProviderInstanceId) {
        (self.store, self.provider)
    }

    fn store(&self) -> &WorldStore {
        match &self.store {
            ViewStore::Owned(store) => store,
            ViewStore::Shared(arc) => arc,
        }
    }

    /// The provider instance that issued this view.
    pub fn provider_id(&self) -> ProviderInstanceId {
        self.provider
    }

    /// The world version this view reflects.
    pub fn tick(&self) -> Tick {
        self.store().version()
    }

    /// Whether two views reference the identical snapshot instance.
    pub fn same_instance(&self, other: &View) -> bool {
        std::ptr::eq(self.store(), other.store())
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Iterate over all live entities in the snapshot.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.store().entities()
    }

    /// Iterate over entities carrying the given component.
    pub fn entities_with(&self, component: ComponentTypeId) -> impl Iterator<Item = EntityId> + '_ {
        self.store().entities_with(component)
    }

    /// Number of entities carrying the given component.
    pub fn component_count(&self, component: ComponentTypeId) -> usize {
        self.store().component_count(component)
    }

    // ── Events ───────────────────────────────────────────────────

    /// Consume the events delivered with this snapshot.
    ///
    /// Returns the not-yet-consumed tail of the batch that was drained
    /// from the live store at sync time, and advances this view's
    /// cursor past it. Cohort members each hold their own cursor, so
    /// sharing one instance does not steal events between workers.
    pub fn consume_events(&mut self) -> &[WorldEvent] {
        let events = match &self.store {
            ViewStore::Owned(store) => store.pending_events(),
            ViewStore::Shared(arc) => arc.pending_events(),
        };
        let start = self.event_cursor.min(events.len());
        self.event_cursor = events.len();
        &events[start..]
    }

    // ── Deferred mutations ───────────────────────────────────────

    /// The deferred mutation log for this view's worker.
    pub fn log(&mut self) -> &mut MutationLog {
        &mut self.log
    }

    /// Take the mutation log, leaving an empty one behind.
    ///
    /// Called by the kernel before releasing the view, so the log can be
    /// replayed after the provider has reclaimed the snapshot.
    pub fn take_log(&mut self) -> MutationLog {
        std::mem::take(&mut self.log)
    }
}

impl WorldRead for View {
    fn version(&self) -> Tick {
        self.store().version()
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.store().contains(entity)
    }

    fn entity_count(&self) -> usize {
        self.store().entity_count()
    }

    fn get_component(&self, entity: EntityId, component: ComponentTypeId) -> Option<&[u8]> {
        self.store().get_component(entity, component)
    }
}
