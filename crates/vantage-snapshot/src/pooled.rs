//! Pooled on-demand provider: a filtered scratch copy per acquisition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use vantage_core::{ComponentFilter, EventCursor, ProviderInstanceId, SnapshotError};
use vantage_world::WorldStore;

use crate::pool::SnapshotPool;
use crate::provider::{ProviderKind, SnapshotProvider};
use crate::view::{View, ViewStore};

/// A provider with no persistent replica.
///
/// Synchronization is deferred to acquisition time so the data is
/// maximally fresh for whichever tick actually consumes it: `update()`
/// is a no-op, and `acquire()` pulls a scratch instance from the pool,
/// performs one filtered copy restricted to exactly the components its
/// worker reads, and drains the events since the worker's last run.
/// `release()` soft-clears the instance and returns it to the pool.
/// Suits workers running at reduced cadence over a component subset.
pub struct PooledProvider {
    id: ProviderInstanceId,
    pool: Arc<SnapshotPool>,
    filter: ComponentFilter,
    watermark: Mutex<EventCursor>,
    syncs: AtomicU64,
    events_missed: AtomicU64,
}

impl PooledProvider {
    /// Create a provider drawing from `pool`, syncing only `filter`.
    pub fn new(pool: Arc<SnapshotPool>, filter: ComponentFilter) -> Self {
        Self {
            id: ProviderInstanceId::next(),
            pool,
            filter,
            watermark: Mutex::new(EventCursor::default()),
            syncs: AtomicU64::new(0),
            events_missed: AtomicU64::new(0),
        }
    }
}

impl SnapshotProvider for PooledProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pooled
    }

    fn instance_id(&self) -> ProviderInstanceId {
        self.id
    }

    fn filter(&self) -> Option<&ComponentFilter> {
        Some(&self.filter)
    }

    fn update(&mut self, _live: &WorldStore) -> Result<(), SnapshotError> {
        // Sync happens at acquire time; there is no persistent state.
        Ok(())
    }

    fn acquire(&self, live: &WorldStore) -> Result<View, SnapshotError> {
        let mut store = self.pool.get();
        if let Err(e) = store.copy_from(live, Some(&self.filter)) {
            store.clear_retaining_capacity();
            self.pool.put(store);
            return Err(e.into());
        }
        let (batch, missed) = {
            let mut watermark = self.watermark.lock().unwrap();
            let drained = live.events_after(*watermark);
            *watermark = live.event_head();
            drained
        };
        self.events_missed.fetch_add(missed, Ordering::Relaxed);
        store.install_events(batch);
        self.syncs.fetch_add(1, Ordering::Relaxed);
        Ok(View::owned(store, self.id))
    }

    fn release(&self, view: View) -> Result<(), SnapshotError> {
        let (store, provider) = view.into_store();
        if provider != self.id {
            return Err(SnapshotError::ForeignView {
                expected: self.id,
                got: provider,
            });
        }
        match store {
            ViewStore::Owned(mut store) => {
                store.clear_retaining_capacity();
                self.pool.put(store);
                Ok(())
            }
            // Pooled acquisitions always own their instance.
            ViewStore::Shared(_) => Err(SnapshotError::ReleaseWithoutAcquire),
        }
    }

    fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    fn events_missed(&self) -> u64 {
        self.events_missed.load(Ordering::Relaxed)
    }
}
