//! Deferred-mutation replay against the live world store.
//!
//! The single interpreter loop that folds a worker's mutation log back
//! into the authoritative world. Runs on the kernel thread only, after
//! every worker of the tick has joined and released its view.

use vantage_core::{EntityId, MutationLog, MutationRecord, MutationTarget, ReplayError};
use vantage_world::WorldStore;

/// Counters from replaying one worker's log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReplayOutcome {
    /// Records applied to the live store.
    pub applied: u64,
    /// Records that targeted an entity no longer alive at replay time
    /// (destroyed earlier in the same replay pass, or by another
    /// worker's log), or an unregistered component type.
    pub skipped: u64,
}

/// Replay `log` against `live`, sealing the log.
///
/// Entity-creation records mint real IDs in log order; later records in
/// the same log address them through their `Created` placeholders.
/// Records whose target cannot be applied are counted as skipped, never
/// fatal: worker logs are replayed in registration order and a
/// concurrent worker may have destroyed the entity first.
pub(crate) fn apply_log(
    live: &mut WorldStore,
    log: &mut MutationLog,
) -> Result<ReplayOutcome, ReplayError> {
    let records = log.take_for_replay()?;
    let mut created: Vec<EntityId> = Vec::with_capacity(log.created_count() as usize);
    let mut outcome = ReplayOutcome::default();

    for record in records {
        match record {
            MutationRecord::CreateEntity => {
                created.push(live.create_entity());
                outcome.applied += 1;
            }
            MutationRecord::DestroyEntity { target } => {
                let entity = resolve(target, &created)?;
                tally(&mut outcome, live.destroy_entity(entity).is_ok());
            }
            MutationRecord::SetComponent {
                target,
                component,
                bytes,
            } => {
                let entity = resolve(target, &created)?;
                tally(&mut outcome, live.set_component(entity, component, &bytes).is_ok());
            }
            MutationRecord::RemoveComponent { target, component } => {
                let entity = resolve(target, &created)?;
                tally(&mut outcome, live.remove_component(entity, component).is_ok());
            }
        }
    }

    Ok(outcome)
}

fn resolve(target: MutationTarget, created: &[EntityId]) -> Result<EntityId, ReplayError> {
    match target {
        MutationTarget::Existing(entity) => Ok(entity),
        MutationTarget::Created(index) => created
            .get(index as usize)
            .copied()
            .ok_or(ReplayError::UnknownCreation { index }),
    }
}

fn tally(outcome: &mut ReplayOutcome, applied: bool) {
    if applied {
        outcome.applied += 1;
    } else {
        outcome.skipped += 1;
    }
}
