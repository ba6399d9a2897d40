//! The snapshot provider strategy abstraction.

use vantage_core::{ComponentFilter, ProviderInstanceId, SnapshotError};
use vantage_world::WorldStore;

use crate::view::View;

/// Which strategy a provider implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    /// One long-lived full replica, resynchronized every tick.
    Replica,
    /// A pooled scratch instance per acquisition, filtered sync on demand.
    Pooled,
    /// One pooled scratch instance shared by a cohort via reference count.
    Shared,
}

/// Produces consistent read-only views of the live world and reclaims them.
///
/// The kernel selects one concrete provider per worker group at
/// assignment time and never re-dispatches per call.
///
/// # Contract
///
/// - [`update`](SnapshotProvider::update) is called only from the kernel
///   thread, between the end of one dispatch cycle and the start of the
///   next. Calling it while views are outstanding is an invariant
///   violation and fails with [`SnapshotError::ViewsOutstanding`].
/// - [`acquire`](SnapshotProvider::acquire) is safe to call from any
///   thread. It may block only on the provider's short internal critical
///   section, never on a full tick.
/// - [`release`](SnapshotProvider::release) must be called exactly once
///   per successful acquire, with the view that acquire returned.
///   Releasing a foreign view or releasing into an empty cohort is
///   surfaced as an error, never swallowed, because it would corrupt
///   pooling and reference-counting state for other workers.
pub trait SnapshotProvider: Send + Sync {
    /// The strategy this provider implements.
    fn kind(&self) -> ProviderKind;

    /// This provider's unique instance ID (stamped into issued views).
    fn instance_id(&self) -> ProviderInstanceId;

    /// The component filter syncs are restricted to; `None` means full.
    fn filter(&self) -> Option<&ComponentFilter>;

    /// Resynchronize persistent provider state from the live store.
    fn update(&mut self, live: &WorldStore) -> Result<(), SnapshotError>;

    /// Acquire a consistent view of the live store.
    fn acquire(&self, live: &WorldStore) -> Result<View, SnapshotError>;

    /// Return a view's resources to the provider.
    fn release(&self, view: View) -> Result<(), SnapshotError>;

    /// Number of world syncs this provider has performed.
    fn sync_count(&self) -> u64;

    /// Number of events lost to event-log eviction before a drain.
    fn events_missed(&self) -> u64;
}
