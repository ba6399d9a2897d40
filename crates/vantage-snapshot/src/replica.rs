//! Persistent-replica provider: one long-lived full copy of the world.

use std::sync::Arc;

use vantage_core::{
    ComponentFilter, ComponentSchema, EventCursor, ProviderInstanceId, SnapshotError,
};
use vantage_world::WorldStore;

use crate::provider::{ProviderKind, SnapshotProvider};
use crate::view::View;

/// A provider backed by one replica that lives as long as the provider.
///
/// `update()` performs a full (unfiltered) copy from the live store and
/// installs the events accumulated since the last resync. `acquire()`
/// hands every caller the same replica — zero-copy and allocation-free —
/// and `release()` only validates provenance, since the replica is never
/// pooled. Suits workers that need the freshest full-fidelity state
/// every tick.
///
/// Views are read-only structurally: while any view is outstanding the
/// replica is reachable only through shared references, and `update()`
/// refuses to run.
pub struct ReplicaProvider {
    id: ProviderInstanceId,
    replica: Arc<WorldStore>,
    watermark: EventCursor,
    syncs: u64,
    events_missed: u64,
}

impl ReplicaProvider {
    /// Create a provider with an empty replica built from `schema`.
    ///
    /// The replica first reflects the live world after the first
    /// `update()` call.
    pub fn new(schema: Arc<ComponentSchema>, event_capacity: usize) -> Self {
        Self {
            id: ProviderInstanceId::next(),
            replica: Arc::new(WorldStore::new(schema, event_capacity)),
            watermark: EventCursor::default(),
            syncs: 0,
            events_missed: 0,
        }
    }
}

impl SnapshotProvider for ReplicaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Replica
    }

    fn instance_id(&self) -> ProviderInstanceId {
        self.id
    }

    fn filter(&self) -> Option<&ComponentFilter> {
        None
    }

    fn update(&mut self, live: &WorldStore) -> Result<(), SnapshotError> {
        let replica =
            Arc::get_mut(&mut self.replica).ok_or(SnapshotError::ViewsOutstanding)?;
        replica.copy_from(live, None)?;
        let (batch, missed) = live.events_after(self.watermark);
        self.watermark = live.event_head();
        self.events_missed += missed;
        replica.install_events(batch);
        self.syncs += 1;
        Ok(())
    }

    fn acquire(&self, _live: &WorldStore) -> Result<View, SnapshotError> {
        Ok(View::shared(Arc::clone(&self.replica), self.id))
    }

    fn release(&self, view: View) -> Result<(), SnapshotError> {
        let (_store, provider) = view.into_store();
        if provider != self.id {
            return Err(SnapshotError::ForeignView {
                expected: self.id,
                got: provider,
            });
        }
        Ok(())
    }

    fn sync_count(&self) -> u64 {
        self.syncs
    }

    fn events_missed(&self) -> u64 {
        self.events_missed
    }
}
