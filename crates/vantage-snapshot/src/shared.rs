//! Shared/convoy provider: one scratch instance per worker cohort.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use vantage_core::{ComponentFilter, EventCursor, ProviderInstanceId, SnapshotError};
use vantage_world::WorldStore;

use crate::pool::SnapshotPool;
use crate::provider::{ProviderKind, SnapshotProvider};
use crate::view::{View, ViewStore};

/// The cohort's single scratch slot, guarded by one mutex.
///
/// Acquire, release, and update are the critical sections; all three are
/// mutually exclusive on this lock.
#[derive(Debug, Default)]
struct CohortSlot {
    /// The instance currently shared by the cohort, if any acquisition
    /// is outstanding.
    instance: Option<Arc<WorldStore>>,
    /// Outstanding acquisitions of `instance`. The instance returns to
    /// the pool exactly when this transitions to zero.
    refs: u32,
    watermark: EventCursor,
}

/// A provider shared by a cohort of workers running at the same cadence.
///
/// The cohort's filters are unioned at assignment time. The first
/// `acquire()` of a cohort-cycle pulls a scratch instance from the pool
/// and performs one filtered sync and one event drain; every further
/// acquirer in the same cycle observes the identical instance and only
/// bumps the reference count. `release()` decrements the count and, on
/// the transition to zero, soft-clears the instance and returns it to
/// the pool. For K workers needing overlapping data, this collapses K
/// syncs and K instances into one of each.
pub struct SharedProvider {
    id: ProviderInstanceId,
    pool: Arc<SnapshotPool>,
    filter: ComponentFilter,
    slot: Mutex<CohortSlot>,
    syncs: AtomicU64,
    events_missed: AtomicU64,
}

impl SharedProvider {
    /// Create a provider drawing from `pool`, syncing the cohort's
    /// union `filter`.
    pub fn new(pool: Arc<SnapshotPool>, filter: ComponentFilter) -> Self {
        Self {
            id: ProviderInstanceId::next(),
            pool,
            filter,
            slot: Mutex::new(CohortSlot::default()),
            syncs: AtomicU64::new(0),
            events_missed: AtomicU64::new(0),
        }
    }

    /// Outstanding acquisitions in the current cohort-cycle.
    pub fn outstanding(&self) -> u32 {
        self.slot.lock().unwrap().refs
    }

    /// One filtered copy plus one event drain: the per-cohort-cycle sync.
    fn sync_into(
        &self,
        store: &mut WorldStore,
        slot: &mut CohortSlot,
        live: &WorldStore,
    ) -> Result<(), SnapshotError> {
        store.copy_from(live, Some(&self.filter))?;
        let (batch, missed) = live.events_after(slot.watermark);
        slot.watermark = live.event_head();
        self.events_missed.fetch_add(missed, Ordering::Relaxed);
        store.install_events(batch);
        self.syncs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl SnapshotProvider for SharedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Shared
    }

    fn instance_id(&self) -> ProviderInstanceId {
        self.id
    }

    fn filter(&self) -> Option<&ComponentFilter> {
        Some(&self.filter)
    }

    fn update(&mut self, live: &WorldStore) -> Result<(), SnapshotError> {
        let mut slot = self.slot.lock().unwrap();
        let Some(mut arc) = slot.instance.take() else {
            // Nothing held: the next acquire starts a fresh cohort-cycle.
            return Ok(());
        };
        // An instance straddles a tick only while views hold it, and
        // outstanding views make the Arc unsplittable. Resync in place
        // when exclusive, surface the stragglers otherwise.
        let result = match Arc::get_mut(&mut arc) {
            Some(store) => self.sync_into(store, &mut slot, live),
            None => Err(SnapshotError::ViewsOutstanding),
        };
        slot.instance = Some(arc);
        result
    }

    fn acquire(&self, live: &WorldStore) -> Result<View, SnapshotError> {
        let mut slot = self.slot.lock().unwrap();
        let arc = match slot.instance.as_ref() {
            Some(arc) => Arc::clone(arc),
            None => {
                let mut store = self.pool.get();
                if let Err(e) = self.sync_into(&mut store, &mut slot, live) {
                    store.clear_retaining_capacity();
                    self.pool.put(store);
                    return Err(e);
                }
                let arc = Arc::new(store);
                slot.instance = Some(Arc::clone(&arc));
                arc
            }
        };
        slot.refs += 1;
        Ok(View::shared(arc, self.id))
    }

    fn release(&self, view: View) -> Result<(), SnapshotError> {
        let (store, provider) = view.into_store();
        if provider != self.id {
            return Err(SnapshotError::ForeignView {
                expected: self.id,
                got: provider,
            });
        }
        let arc = match store {
            ViewStore::Shared(arc) => arc,
            // Shared acquisitions never own their instance.
            ViewStore::Owned(_) => return Err(SnapshotError::ReleaseWithoutAcquire),
        };
        let mut slot = self.slot.lock().unwrap();
        let current_cohort = slot
            .instance
            .as_ref()
            .is_some_and(|held| Arc::ptr_eq(held, &arc));
        if !current_cohort || slot.refs == 0 {
            // No cohort-cycle in progress, or a view from an earlier
            // cycle: the acquire/release pairing is broken and pooled
            // state would be corrupted by proceeding.
            return Err(SnapshotError::ReleaseWithoutAcquire);
        }
        slot.refs -= 1;
        if slot.refs == 0 {
            if let Some(held) = slot.instance.take() {
                drop(arc);
                match Arc::try_unwrap(held) {
                    Ok(mut store) => {
                        store.clear_retaining_capacity();
                        self.pool.put(store);
                    }
                    // A leaked view still references the instance.
                    Err(_) => return Err(SnapshotError::ViewsOutstanding),
                }
            }
        }
        Ok(())
    }

    fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    fn events_missed(&self) -> u64 {
        self.events_missed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use vantage_core::{ComponentDef, ComponentSchema, ComponentTypeId, WorldRead};

    const POSITION: ComponentTypeId = ComponentTypeId(0);
    const VELOCITY: ComponentTypeId = ComponentTypeId(1);

    fn schema() -> Arc<ComponentSchema> {
        Arc::new(ComponentSchema::new(vec![
            ComponentDef::named("position"),
            ComponentDef::named("velocity"),
        ]))
    }

    fn live_world() -> WorldStore {
        let mut live = WorldStore::new(schema(), 64);
        let e = live.create_entity();
        live.set_component(e, POSITION, &[1]).unwrap();
        live.set_component(e, VELOCITY, &[2]).unwrap();
        live
    }

    fn union_filter() -> ComponentFilter {
        [POSITION, VELOCITY].into_iter().collect()
    }

    #[test]
    fn cohort_members_observe_the_identical_instance() {
        let live = live_world();
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let provider = SharedProvider::new(pool, union_filter());

        let a = provider.acquire(&live).unwrap();
        let b = provider.acquire(&live).unwrap();
        let c = provider.acquire(&live).unwrap();

        assert!(a.same_instance(&b));
        assert!(b.same_instance(&c));
        assert_eq!(provider.outstanding(), 3);

        for view in [a, b, c] {
            provider.release(view).unwrap();
        }
        assert_eq!(provider.outstanding(), 0);
    }

    #[test]
    fn one_sync_per_cohort_cycle_regardless_of_acquirers() {
        let live = live_world();
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let provider = SharedProvider::new(pool, union_filter());

        let views: Vec<View> = (0..8).map(|_| provider.acquire(&live).unwrap()).collect();
        assert_eq!(provider.sync_count(), 1, "convoy collapse: one sync for 8 acquirers");
        for view in views {
            provider.release(view).unwrap();
        }

        // A new cohort-cycle performs exactly one more sync.
        let view = provider.acquire(&live).unwrap();
        assert_eq!(provider.sync_count(), 2);
        provider.release(view).unwrap();
    }

    #[test]
    fn instance_returns_to_pool_exactly_once_after_last_release() {
        let live = live_world();
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let provider = SharedProvider::new(Arc::clone(&pool), union_filter());

        let a = provider.acquire(&live).unwrap();
        let b = provider.acquire(&live).unwrap();

        provider.release(a).unwrap();
        assert_eq!(pool.stats().idle, 0, "instance still held by b");

        provider.release(b).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.idle, 1, "returned after the last release");
        assert_eq!(stats.created, 1);
    }

    #[test]
    fn foreign_view_is_surfaced() {
        let live = live_world();
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let ours = SharedProvider::new(Arc::clone(&pool), union_filter());
        let theirs = SharedProvider::new(pool, union_filter());

        let view = theirs.acquire(&live).unwrap();
        match ours.release(view) {
            Err(SnapshotError::ForeignView { expected, got }) => {
                assert_eq!(expected, ours.instance_id());
                assert_eq!(got, theirs.instance_id());
            }
            other => panic!("expected ForeignView, got {other:?}"),
        }
    }

    #[test]
    fn release_into_empty_cohort_is_loud() {
        let live = live_world();
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let provider = SharedProvider::new(pool, union_filter());

        // A view stamped with this provider's ID but referencing an
        // instance no cohort-cycle is holding: the refcount would
        // underflow if this were accepted.
        let orphan = View::shared(
            Arc::new(WorldStore::new(schema(), 4)),
            provider.instance_id(),
        );
        assert_eq!(
            provider.release(orphan),
            Err(SnapshotError::ReleaseWithoutAcquire)
        );

        // The error must also fire while a genuine cycle is in progress.
        let view = provider.acquire(&live).unwrap();
        let stale = View::shared(
            Arc::new(WorldStore::new(schema(), 4)),
            provider.instance_id(),
        );
        assert_eq!(
            provider.release(stale),
            Err(SnapshotError::ReleaseWithoutAcquire)
        );
        provider.release(view).unwrap();
    }

    #[test]
    fn filtered_sync_uses_the_union_filter() {
        let live = live_world();
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let provider = SharedProvider::new(pool, ComponentFilter::single(POSITION));

        let view = provider.acquire(&live).unwrap();
        let e = view.entities().next().unwrap();
        assert_eq!(view.get_component(e, POSITION), Some(&[1][..]));
        assert_eq!(view.get_component(e, VELOCITY), None);
        provider.release(view).unwrap();
    }

    #[test]
    fn update_with_empty_slot_is_a_no_op() {
        let live = live_world();
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let mut provider = SharedProvider::new(pool, union_filter());

        provider.update(&live).unwrap();
        assert_eq!(provider.sync_count(), 0);
    }

    #[test]
    fn update_with_outstanding_views_is_refused() {
        let live = live_world();
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let mut provider = SharedProvider::new(pool, union_filter());

        let view = provider.acquire(&live).unwrap();
        assert_eq!(provider.update(&live), Err(SnapshotError::ViewsOutstanding));

        provider.release(view).unwrap();
        provider.update(&live).unwrap();
    }

    #[test]
    fn events_drain_once_per_cohort_cycle() {
        let mut live = WorldStore::new(schema(), 64);
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let provider = SharedProvider::new(pool, union_filter());

        live.advance();
        live.create_entity();

        let mut a = provider.acquire(&live).unwrap();
        let mut b = provider.acquire(&live).unwrap();
        assert_eq!(a.consume_events().len(), 1);
        assert_eq!(b.consume_events().len(), 1, "cursors are per-view");
        provider.release(a).unwrap();
        provider.release(b).unwrap();

        // Nothing new happened: the next cycle's batch is empty.
        let mut c = provider.acquire(&live).unwrap();
        assert!(c.consume_events().is_empty());
        provider.release(c).unwrap();
    }

    #[test]
    fn concurrent_cohort_acquires_collapse_to_one_instance() {
        let live = Arc::new(live_world());
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let provider = Arc::new(SharedProvider::new(Arc::clone(&pool), union_filter()));

        thread::scope(|s| {
            for _ in 0..8 {
                let provider = Arc::clone(&provider);
                let live = Arc::clone(&live);
                s.spawn(move || {
                    let view = provider.acquire(&live).unwrap();
                    assert_eq!(view.entity_count(), 1);
                    provider.release(view).unwrap();
                });
            }
        });

        let stats = pool.stats();
        // The slot mutex serializes acquire and release, so at most one
        // instance is ever out of the pool.
        assert_eq!(stats.created, 1);
        assert_eq!(stats.idle, 1);
        assert_eq!(provider.outstanding(), 0);
    }

    #[test]
    fn randomized_interleavings_keep_the_pool_consistent() {
        let live = Arc::new(live_world());
        let pool = Arc::new(SnapshotPool::new(schema(), 64));
        let provider = Arc::new(SharedProvider::new(Arc::clone(&pool), union_filter()));

        thread::scope(|s| {
            for seed in 0..4u64 {
                let provider = Arc::clone(&provider);
                let live = Arc::clone(&live);
                s.spawn(move || {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    let mut held: Vec<View> = Vec::new();
                    for _ in 0..200 {
                        if held.is_empty() || rng.next_u32() & 1 == 0 {
                            held.push(provider.acquire(&live).unwrap());
                        } else {
                            let idx = rng.next_u32() as usize % held.len();
                            provider.release(held.swap_remove(idx)).unwrap();
                        }
                    }
                    for view in held {
                        provider.release(view).unwrap();
                    }
                });
            }
        });

        assert_eq!(provider.outstanding(), 0);
        let stats = pool.stats();
        assert_eq!(
            stats.idle as u64, stats.created,
            "every instance taken from the pool came back exactly once"
        );
    }
}
