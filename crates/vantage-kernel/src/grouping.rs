//! Worker auto-grouping onto snapshot providers.
//!
//! Computed once, on the kernel's first tick, and never re-evaluated:
//! workers are grouped by `(tier, cadence)`, the filters of each group
//! are unioned, and one provider is built per group. Adding or removing
//! workers requires constructing a new kernel.

use std::num::NonZeroU64;
use std::sync::Arc;

use indexmap::IndexMap;

use vantage_core::ComponentFilter;
use vantage_snapshot::{
    PooledProvider, ReplicaProvider, SharedProvider, SnapshotPool, SnapshotProvider,
};

use crate::module::Tier;

/// One `(tier, cadence)` cohort and the union of its members' filters.
pub(crate) struct WorkerGroup {
    pub tier: Tier,
    /// Member worker indices, in registration order.
    pub members: Vec<usize>,
    pub filter: ComponentFilter,
}

/// Group workers by `(tier, cadence)`, preserving registration order of
/// first appearance.
pub(crate) fn group_workers<'a, I>(workers: I) -> Vec<WorkerGroup>
where
    I: Iterator<Item = (Tier, NonZeroU64, &'a ComponentFilter)>,
{
    let mut groups: IndexMap<(Tier, NonZeroU64), WorkerGroup> = IndexMap::new();
    for (idx, (tier, cadence, filter)) in workers.enumerate() {
        let group = groups.entry((tier, cadence)).or_insert_with(|| WorkerGroup {
            tier,
            members: Vec::new(),
            filter: ComponentFilter::empty(),
        });
        group.members.push(idx);
        group.filter = group.filter.union(filter);
    }
    groups.into_values().collect()
}

/// Select the provider strategy for a group.
///
/// Fast-tier groups get a persistent full replica. A slow-tier group of
/// one gets pooled on-demand snapshots over its own filter; a slow-tier
/// cohort of two or more shares one pooled instance per cycle over the
/// union filter.
pub(crate) fn build_provider(
    group: &WorkerGroup,
    pool: &Arc<SnapshotPool>,
    event_capacity: usize,
) -> Box<dyn SnapshotProvider> {
    match group.tier {
        Tier::Fast => Box::new(ReplicaProvider::new(
            Arc::clone(pool.schema()),
            event_capacity,
        )),
        Tier::Slow if group.members.len() >= 2 => Box::new(SharedProvider::new(
            Arc::clone(pool),
            group.filter.clone(),
        )),
        Tier::Slow => Box::new(PooledProvider::new(
            Arc::clone(pool),
            group.filter.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::{ComponentDef, ComponentSchema, ComponentTypeId};
    use vantage_snapshot::ProviderKind;

    fn cadence(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    fn pool() -> Arc<SnapshotPool> {
        let schema = Arc::new(ComponentSchema::new(vec![
            ComponentDef::named("position"),
            ComponentDef::named("velocity"),
        ]));
        Arc::new(SnapshotPool::new(schema, 16))
    }

    #[test]
    fn grouping_key_is_tier_and_cadence() {
        let a = ComponentFilter::single(ComponentTypeId(0));
        let b = ComponentFilter::single(ComponentTypeId(1));
        let workers = [
            (Tier::Fast, cadence(1), &a),
            (Tier::Slow, cadence(6), &a),
            (Tier::Slow, cadence(6), &b),
            (Tier::Slow, cadence(4), &b),
        ];
        let groups = group_workers(workers.iter().map(|(t, c, f)| (*t, *c, *f)));

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].members, vec![0]);
        assert_eq!(groups[1].members, vec![1, 2]);
        assert_eq!(groups[2].members, vec![3]);
        assert_eq!(groups[0].tier, Tier::Fast);
        assert_eq!(groups[1].tier, Tier::Slow);
    }

    #[test]
    fn cohort_filter_is_the_union() {
        let a = ComponentFilter::single(ComponentTypeId(0));
        let b = ComponentFilter::single(ComponentTypeId(1));
        let workers = [
            (Tier::Slow, cadence(6), &a),
            (Tier::Slow, cadence(6), &b),
        ];
        let groups = group_workers(workers.iter().map(|(t, c, f)| (*t, *c, *f)));

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].filter, a.union(&b));
    }

    #[test]
    fn strategy_selection_per_group() {
        let filter = ComponentFilter::single(ComponentTypeId(0));
        let pool = pool();

        let fast = WorkerGroup {
            tier: Tier::Fast,
            members: vec![0, 1],
            filter: filter.clone(),
        };
        assert_eq!(
            build_provider(&fast, &pool, 16).kind(),
            ProviderKind::Replica
        );

        let singleton = WorkerGroup {
            tier: Tier::Slow,
            members: vec![2],
            filter: filter.clone(),
        };
        assert_eq!(
            build_provider(&singleton, &pool, 16).kind(),
            ProviderKind::Pooled
        );

        let cohort = WorkerGroup {
            tier: Tier::Slow,
            members: vec![3, 4],
            filter,
        };
        assert_eq!(
            build_provider(&cohort, &pool, 16).kind(),
            ProviderKind::Shared
        );
    }
}
