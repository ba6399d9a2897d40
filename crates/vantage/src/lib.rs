//! Vantage: a simulation host with snapshot-isolated worker modules.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Vantage sub-crates. For most users, adding `vantage` as a
//! single dependency is sufficient.
//!
//! An authoritative [`world::WorldStore`] is owned by a
//! [`kernel::Kernel`]; registered worker modules run concurrently each
//! tick against read-only snapshot views, record their mutations into
//! deferred logs, and the kernel folds those logs back into the live
//! world in registration order.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//! use vantage::prelude::*;
//!
//! // Define the component schema the world carries.
//! let schema = Arc::new(ComponentSchema::new(vec![
//!     ComponentDef::named("position"),
//! ]));
//! const POSITION: ComponentTypeId = ComponentTypeId(0);
//!
//! // Build a kernel and seed the live world.
//! let mut kernel = Kernel::new(KernelConfig::new(schema)).unwrap();
//! for i in 0..10u8 {
//!     let e = kernel.world_mut().create_entity();
//!     kernel.world_mut().set_component(e, POSITION, &[i]).unwrap();
//! }
//!
//! // A fast-tier worker that counts entities and spawns one more.
//! let seen = Arc::new(AtomicU64::new(0));
//! let sink = Arc::clone(&seen);
//! kernel
//!     .register_worker(WorkerDescriptor::fast(
//!         "census",
//!         move |view: &mut View, _dt: f64| {
//!             sink.store(view.entity_count() as u64, Ordering::Relaxed);
//!             let spawned = view.log().create_entity();
//!             view.log().set_component(spawned, POSITION, &[0]);
//!             Ok(())
//!         },
//!     ))
//!     .unwrap();
//!
//! // Each tick: advance, resync providers, dispatch, join, replay.
//! for _ in 0..3 {
//!     let report = kernel.tick(1.0 / 60.0).unwrap();
//!     assert!(report.all_succeeded());
//! }
//!
//! // The worker saw 10, then 11, then 12 entities; its third spawn
//! // replayed after its third run.
//! assert_eq!(seen.load(Ordering::Relaxed), 12);
//! assert_eq!(kernel.current_tick(), Tick(3));
//! let report = kernel.shutdown();
//! assert_eq!(report.ticks, Tick(3));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `vantage-core` | IDs, filters, events, mutation records, error types, core traits |
//! | [`world`] | `vantage-world` | The entity/component store and its event log |
//! | [`snapshot`] | `vantage-snapshot` | Snapshot pool, views, and the three provider strategies |
//! | [`kernel`] | `vantage-kernel` | The orchestration kernel and the background host |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`vantage-core`).
///
/// Contains identifiers, the [`types::ComponentFilter`] bitset, world
/// events, deferred mutation records, and the error taxonomy.
pub use vantage_core as types;

/// Entity/component world store (`vantage-world`).
///
/// The authoritative [`world::WorldStore`] plus the bounded change-event
/// log; the same type backs replicas and pooled scratch instances.
pub use vantage_world as world;

/// Snapshot providers, pool, and views (`vantage-snapshot`).
///
/// The [`snapshot::SnapshotProvider`] strategies
/// ([`snapshot::ReplicaProvider`], [`snapshot::PooledProvider`],
/// [`snapshot::SharedProvider`]) and the [`snapshot::SnapshotPool`].
pub use vantage_snapshot as snapshot;

/// Orchestration kernel and background host (`vantage-kernel`).
///
/// [`kernel::Kernel`] for synchronous stepping, [`kernel::KernelHost`]
/// for autonomous background ticking.
pub use vantage_kernel as kernel;

/// Common imports for typical Vantage usage.
///
/// ```rust
/// use vantage::prelude::*;
/// ```
///
/// This imports the most frequently used types: the kernel and its
/// configuration, worker registration, the view and mutation-log
/// surface, schema building blocks, and the error types.
pub mod prelude {
    // Core IDs, schema, and filters
    pub use vantage_core::{
        ComponentDef, ComponentFilter, ComponentSchema, ComponentTypeId, EntityId, Tick, WorkerId,
    };

    // Events and deferred mutations
    pub use vantage_core::{
        EventCursor, MutationLog, MutationRecord, MutationTarget, WorldEvent, WorldEventKind,
    };

    // Errors
    pub use vantage_core::{ModuleError, ReplayError, SnapshotError, WorldError};

    // Core traits
    pub use vantage_core::WorldRead;

    // World store
    pub use vantage_world::WorldStore;

    // Snapshot layer
    pub use vantage_snapshot::{SnapshotPool, SnapshotProvider, View};

    // Kernel
    pub use vantage_kernel::{
        HostConfig, Kernel, KernelConfig, KernelError, KernelHost, KernelMetrics, Module,
        TickReport, Tier, WorkerDescriptor,
    };
}
