//! Worker-failure isolation: a failing or panicking worker must not
//! stop the tick, corrupt pooled state, or leak its view.

use std::num::NonZeroU64;
use std::sync::Arc;

use vantage_core::{ComponentFilter, ComponentTypeId, ModuleError, Tick, WorldRead};
use vantage_kernel::{Kernel, KernelConfig, WorkerDescriptor};
use vantage_snapshot::View;
use vantage_test_utils::{schema_of, seed_entities, FailingModule, PanickingModule, SpawnModule};

const POSITION: ComponentTypeId = ComponentTypeId(0);

fn cadence(n: u64) -> NonZeroU64 {
    NonZeroU64::new(n).unwrap()
}

#[test]
fn failing_cohort_member_does_not_poison_the_convoy() {
    let mut kernel = Kernel::new(KernelConfig::new(schema_of(&["position"]))).unwrap();
    seed_entities(kernel.world_mut(), 10, POSITION);

    kernel
        .register_worker(WorkerDescriptor::slow(
            "spawner",
            cadence(2),
            ComponentFilter::single(POSITION),
            SpawnModule::new(POSITION, 1, &[7]),
        ))
        .unwrap();
    let failing_id = kernel
        .register_worker(WorkerDescriptor::slow(
            "broken",
            cadence(2),
            ComponentFilter::single(POSITION),
            FailingModule::always(),
        ))
        .unwrap();

    for _ in 0..4 {
        kernel.tick(0.1).unwrap();
    }

    // The spawner's mutations landed on both cohort cycles; the
    // failing member's did not, and the world still advanced.
    assert_eq!(kernel.world().entity_count(), 12);
    assert_eq!(kernel.current_tick(), Tick(4));
    assert_eq!(kernel.worker_failures(failing_id), Some(2));

    // The shared instance came back to the pool every cycle.
    let report = kernel.shutdown();
    assert_eq!(report.pooled_instances as u64, report.pool_created_total);
}

#[test]
fn panicking_worker_is_contained_and_reported() {
    let mut kernel = Kernel::new(KernelConfig::new(schema_of(&["position"]))).unwrap();
    seed_entities(kernel.world_mut(), 5, POSITION);

    kernel
        .register_worker(WorkerDescriptor::fast("bomb", PanickingModule))
        .unwrap();
    kernel
        .register_worker(WorkerDescriptor::fast(
            "spawner",
            SpawnModule::new(POSITION, 1, &[1]),
        ))
        .unwrap();

    for expected in 1..=3u64 {
        let report = kernel.tick(0.1).unwrap();
        assert_eq!(report.metrics.worker_failures, 1);
        assert!(matches!(
            report.workers[0].error,
            Some(ModuleError::Panicked { .. })
        ));
        assert!(report.workers[1].error.is_none());
        // The healthy worker's spawn replayed despite the panic.
        assert_eq!(kernel.world().entity_count(), 5 + expected as usize);
    }
}

#[test]
fn worker_that_recovers_stops_being_reported() {
    let mut kernel = Kernel::new(KernelConfig::new(schema_of(&["position"]))).unwrap();

    // Succeeds twice, then fails forever.
    let id = kernel
        .register_worker(WorkerDescriptor::fast("flaky", FailingModule::after(2)))
        .unwrap();

    let first = kernel.tick(0.1).unwrap();
    let second = kernel.tick(0.1).unwrap();
    let third = kernel.tick(0.1).unwrap();

    assert!(first.all_succeeded());
    assert!(second.all_succeeded());
    assert!(!third.all_succeeded());
    assert_eq!(kernel.worker_failures(id), Some(1));
    assert_eq!(kernel.worker_runs(id), Some(3));
}

#[test]
fn discarded_logs_are_counted_per_worker() {
    let mut kernel = Kernel::new(KernelConfig::new(schema_of(&["position"]))).unwrap();

    // Queues two mutations, then fails: both records must be discarded.
    kernel
        .register_worker(WorkerDescriptor::fast(
            "doomed",
            |view: &mut View, _dt: f64| {
                let e = view.log().create_entity();
                view.log().set_component(e, POSITION, &[1]);
                Err(ModuleError::failed("after queuing"))
            },
        ))
        .unwrap();

    let report = kernel.tick(0.1).unwrap();
    assert_eq!(report.workers[0].mutations_discarded, 2);
    assert_eq!(report.metrics.mutations_applied, 0);
    assert_eq!(kernel.world().entity_count(), 0);
}

#[test]
fn failures_do_not_disturb_other_cadences() {
    let mut kernel = Kernel::new(KernelConfig::new(schema_of(&["position"]))).unwrap();
    seed_entities(kernel.world_mut(), 3, POSITION);

    kernel
        .register_worker(WorkerDescriptor::fast("bomb", PanickingModule))
        .unwrap();
    kernel
        .register_worker(WorkerDescriptor::slow(
            "spawner",
            cadence(3),
            ComponentFilter::single(POSITION),
            SpawnModule::new(POSITION, 2, &[4]),
        ))
        .unwrap();

    for _ in 0..9 {
        kernel.tick(0.1).unwrap();
    }

    // Three slow runs, two spawns each, unaffected by the fast bomb.
    assert_eq!(kernel.world().entity_count(), 3 + 6);
}
