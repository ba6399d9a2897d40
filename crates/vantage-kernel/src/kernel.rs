//! The orchestration kernel: registration, grouping, the tick phase
//! loop, concurrent dispatch, and deferred-mutation replay.

use std::error::Error;
use std::fmt;
use std::num::NonZeroU64;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use vantage_core::{
    ComponentFilter, ModuleError, MutationLog, ReplayError, SnapshotError, Tick, WorkerId,
    WorldRead,
};
use vantage_snapshot::{PoolStats, SnapshotPool, SnapshotProvider, View};
use vantage_world::WorldStore;

use crate::config::{ConfigError, KernelConfig};
use crate::grouping;
use crate::metrics::{KernelMetrics, TickReport, WorkerRunReport};
use crate::module::{Module, Tier, WorkerDescriptor};
use crate::replay;

// ── Errors ──────────────────────────────────────────────────────

/// Errors that abort a tick or reject a kernel operation.
///
/// Snapshot and replay variants indicate corrupted pooling or replay
/// invariants; worker-body failures are never a `KernelError` — they
/// are isolated per worker and reported in the [`TickReport`].
#[derive(Debug, PartialEq)]
pub enum KernelError {
    /// Worker registration attempted after the first tick. Grouping is
    /// computed once; changing the roster requires a new kernel.
    AlreadyRunning,
    /// A provider or pool invariant was violated.
    Snapshot(SnapshotError),
    /// A mutation log violated the replay-once discipline.
    Replay(ReplayError),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => {
                write!(f, "workers cannot be registered after the first tick")
            }
            Self::Snapshot(e) => write!(f, "snapshot invariant violated: {e}"),
            Self::Replay(e) => write!(f, "replay invariant violated: {e}"),
        }
    }
}

impl Error for KernelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Snapshot(e) => Some(e),
            Self::Replay(e) => Some(e),
            Self::AlreadyRunning => None,
        }
    }
}

impl From<SnapshotError> for KernelError {
    fn from(e: SnapshotError) -> Self {
        Self::Snapshot(e)
    }
}

impl From<ReplayError> for KernelError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

// ── ShutdownReport ──────────────────────────────────────────────

/// Final accounting from [`Kernel::shutdown`].
#[derive(Clone, Copy, Debug)]
pub struct ShutdownReport {
    /// World version at shutdown.
    pub ticks: Tick,
    /// Registered workers.
    pub workers: usize,
    /// Idle scratch instances drained from the pool.
    pub pooled_instances: usize,
    /// Scratch instances constructed over the kernel's lifetime.
    pub pool_created_total: u64,
}

// ── Kernel ──────────────────────────────────────────────────────

/// One registered worker and its scheduling state.
struct WorkerSlot {
    id: WorkerId,
    name: String,
    tier: Tier,
    cadence: NonZeroU64,
    filter: ComponentFilter,
    module: Box<dyn Module>,
    /// Delta-time accumulated since the worker's last run. Advances
    /// only through `tick(dt)` calls; a paused kernel accumulates
    /// nothing.
    accumulated_dt: f64,
    runs: u64,
    failures: u64,
}

/// The simulation host's coordinating core.
///
/// Owns the live world store, the snapshot pool, the worker registry,
/// and one provider per worker group. Worker threads never touch the
/// live store: they read through views and queue mutations into
/// per-worker logs, which only [`tick`](Kernel::tick) replays, on the
/// calling thread. That single ownership rule is what makes the rest of
/// the system race-free.
///
/// Each tick runs a fixed phase sequence with no step skipped:
/// advance, provider update, dispatch, join, release, replay.
pub struct Kernel {
    live: WorldStore,
    pool: Arc<SnapshotPool>,
    event_capacity: usize,
    workers: Vec<WorkerSlot>,
    /// One provider per worker group, built on the first tick.
    providers: Vec<Box<dyn SnapshotProvider>>,
    /// Worker index to provider index.
    assignment: Vec<usize>,
    started: bool,
    prev_pool: PoolStats,
    prev_events_dropped: u64,
}

impl Kernel {
    /// Create a kernel with an empty live world.
    pub fn new(config: KernelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let live = WorldStore::new(Arc::clone(&config.schema), config.event_capacity);
        let pool = Arc::new(SnapshotPool::with_warmup(
            Arc::clone(&config.schema),
            config.event_capacity,
            config.pool_warmup,
        ));
        let prev_pool = pool.stats();
        Ok(Self {
            live,
            pool,
            event_capacity: config.event_capacity,
            workers: Vec::new(),
            providers: Vec::new(),
            assignment: Vec::new(),
            started: false,
            prev_pool,
            prev_events_dropped: 0,
        })
    }

    /// Register a worker module.
    ///
    /// Only valid before the first [`tick`](Kernel::tick): provider
    /// grouping is computed once and never re-evaluated mid-run.
    pub fn register_worker(
        &mut self,
        descriptor: WorkerDescriptor,
    ) -> Result<WorkerId, KernelError> {
        if self.started {
            return Err(KernelError::AlreadyRunning);
        }
        let id = WorkerId(self.workers.len() as u32);
        self.workers.push(WorkerSlot {
            id,
            name: descriptor.name,
            tier: descriptor.tier,
            cadence: descriptor.cadence,
            filter: descriptor.filter,
            module: descriptor.module,
            accumulated_dt: 0.0,
            runs: 0,
            failures: 0,
        });
        Ok(id)
    }

    /// The authoritative world state.
    pub fn world(&self) -> &WorldStore {
        &self.live
    }

    /// Mutable access to the authoritative world.
    ///
    /// For seeding and host-application mutations between ticks; the
    /// `&mut self` receiver keeps every live-store write on the kernel's
    /// thread of control.
    pub fn world_mut(&mut self) -> &mut WorldStore {
        &mut self.live
    }

    /// The current world version.
    pub fn current_tick(&self) -> Tick {
        self.live.version()
    }

    /// Number of registered workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Current snapshot pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Times a worker has run, by ID.
    pub fn worker_runs(&self, worker: WorkerId) -> Option<u64> {
        self.workers.get(worker.0 as usize).map(|w| w.runs)
    }

    /// Times a worker's run has failed, by ID.
    pub fn worker_failures(&self, worker: WorkerId) -> Option<u64> {
        self.workers.get(worker.0 as usize).map(|w| w.failures)
    }

    /// Execute one tick.
    ///
    /// Phases, in order: advance the world version; resynchronize every
    /// provider exactly once; acquire a view for every worker whose
    /// cadence divides the new tick; run those workers concurrently;
    /// join them all; release every view; replay each worker's mutation
    /// log against the live world in registration order.
    ///
    /// A worker failure (error or panic) does not fail the tick: its
    /// log is discarded and the failure reported per worker in the
    /// returned [`TickReport`]. Provider, pool, and replay invariant
    /// violations abort the tick with a [`KernelError`] after releasing
    /// any views already acquired.
    pub fn tick(&mut self, dt: f64) -> Result<TickReport, KernelError> {
        let tick_start = Instant::now();
        if !self.started {
            self.build_groups();
            self.started = true;
        }

        // Advance.
        let tick = self.live.advance();

        // Provider update. No views are outstanding between ticks, so a
        // refusal here means a view leaked past its tick.
        let update_start = Instant::now();
        for provider in &mut self.providers {
            provider.update(&self.live)?;
        }
        let update_us = elapsed_us(update_start);

        // Cadence accounting for every worker, eligible or not.
        for worker in &mut self.workers {
            worker.accumulated_dt += dt;
        }

        let dispatch_start = Instant::now();
        let providers = &self.providers;
        let assignment = &self.assignment;
        let live = &self.live;

        let eligible = self
            .workers
            .iter_mut()
            .enumerate()
            .filter(|(_, w)| tick.0 % w.cadence.get() == 0);

        // Acquire every view on this thread, then dispatch. A failed
        // acquire hands back what was already taken and aborts.
        let mut dispatch: Vec<(usize, &mut WorkerSlot, View)> = Vec::new();
        for (idx, worker) in eligible {
            match providers[assignment[idx]].acquire(live) {
                Ok(view) => dispatch.push((idx, worker, view)),
                Err(e) => {
                    for (i, _, view) in dispatch {
                        let _ = providers[assignment[i]].release(view);
                    }
                    return Err(e.into());
                }
            }
        }

        // Run workers concurrently; join them all before releasing
        // anything. A panic is contained inside the worker's thread so
        // its view always comes back for release.
        let mut joined: Vec<(usize, View, Result<(), ModuleError>, u64)> =
            Vec::with_capacity(dispatch.len());
        thread::scope(|s| {
            let mut handles = Vec::with_capacity(dispatch.len());
            for (idx, worker, mut view) in dispatch {
                let run_dt = worker.accumulated_dt;
                worker.accumulated_dt = 0.0;
                let module = &mut worker.module;
                handles.push((
                    idx,
                    s.spawn(move || {
                        let start = Instant::now();
                        let outcome =
                            match catch_unwind(AssertUnwindSafe(|| module.run(&mut view, run_dt)))
                            {
                                Ok(result) => result,
                                Err(payload) => Err(ModuleError::Panicked {
                                    reason: panic_reason(payload.as_ref()),
                                }),
                            };
                        (view, outcome, elapsed_us(start))
                    }),
                ));
            }
            for (idx, handle) in handles {
                match handle.join() {
                    Ok((view, outcome, us)) => joined.push((idx, view, outcome, us)),
                    // Only reachable if the containment above is broken.
                    Err(payload) => resume_unwind(payload),
                }
            }
        });
        let dispatch_us = elapsed_us(dispatch_start);

        // Release every view before replay, worker failures included.
        let mut logs: Vec<(usize, MutationLog, Option<ModuleError>, u64)> =
            Vec::with_capacity(joined.len());
        let mut release_error: Option<SnapshotError> = None;
        for (idx, mut view, outcome, us) in joined {
            let log = view.take_log();
            if let Err(e) = providers[assignment[idx]].release(view) {
                release_error.get_or_insert(e);
            }
            logs.push((idx, log, outcome.err(), us));
        }
        if let Some(e) = release_error {
            return Err(e.into());
        }

        // Replay in registration order: deterministic outcome despite
        // unspecified worker execution order.
        let replay_start = Instant::now();
        let mut reports = Vec::with_capacity(logs.len());
        for (idx, mut log, error, duration_us) in logs {
            let (applied, skipped, discarded) = match &error {
                None => {
                    let outcome = replay::apply_log(&mut self.live, &mut log)?;
                    (outcome.applied, outcome.skipped, 0)
                }
                Some(_) => (0, 0, log.discard() as u64),
            };
            let worker = &mut self.workers[idx];
            worker.runs += 1;
            if error.is_some() {
                worker.failures += 1;
            }
            reports.push(WorkerRunReport {
                worker: worker.id,
                name: worker.name.clone(),
                duration_us,
                error,
                mutations_applied: applied,
                mutations_skipped: skipped,
                mutations_discarded: discarded,
            });
        }
        let replay_us = elapsed_us(replay_start);

        Ok(TickReport {
            tick,
            metrics: self.collect_metrics(
                tick_start, update_us, dispatch_us, replay_us, &reports,
            ),
            workers: reports,
        })
    }

    /// Tear the kernel down deterministically.
    ///
    /// Providers drop their replicas, the pool is drained, and the
    /// final counters are reported. Kernels are plain values: several
    /// can coexist and shut down independently in one process.
    pub fn shutdown(self) -> ShutdownReport {
        let ticks = self.live.version();
        let workers = self.workers.len();
        drop(self.providers);
        drop(self.workers);
        let pooled_instances = self.pool.drain();
        let pool_created_total = self.pool.stats().created;
        ShutdownReport {
            ticks,
            workers,
            pooled_instances,
            pool_created_total,
        }
    }

    fn build_groups(&mut self) {
        let groups = grouping::group_workers(
            self.workers
                .iter()
                .map(|w| (w.tier, w.cadence, &w.filter)),
        );
        self.assignment = vec![0; self.workers.len()];
        self.providers = Vec::with_capacity(groups.len());
        for group in &groups {
            let provider_idx = self.providers.len();
            self.providers
                .push(grouping::build_provider(group, &self.pool, self.event_capacity));
            for &member in &group.members {
                self.assignment[member] = provider_idx;
            }
        }
    }

    fn collect_metrics(
        &mut self,
        tick_start: Instant,
        update_us: u64,
        dispatch_us: u64,
        replay_us: u64,
        reports: &[WorkerRunReport],
    ) -> KernelMetrics {
        let pool = self.pool.stats();
        let pool_created = pool.created - self.prev_pool.created;
        let pool_reused = pool.reused - self.prev_pool.reused;
        self.prev_pool = pool;

        let dropped_total = self.live.events_dropped();
        let events_dropped = dropped_total - self.prev_events_dropped;
        self.prev_events_dropped = dropped_total;

        KernelMetrics {
            total_us: elapsed_us(tick_start),
            update_us,
            dispatch_us,
            replay_us,
            worker_us: reports
                .iter()
                .map(|r| (r.name.clone(), r.duration_us))
                .collect(),
            pool_created,
            pool_reused,
            events_dropped,
            mutations_applied: reports.iter().map(|r| r.mutations_applied).sum(),
            mutations_skipped: reports.iter().map(|r| r.mutations_skipped).sum(),
            mutations_discarded: reports.iter().map(|r| r.mutations_discarded).sum(),
            worker_failures: reports.iter().filter(|r| r.error.is_some()).count() as u64,
        }
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("tick", &self.live.version())
            .field("workers", &self.workers.len())
            .field("providers", &self.providers.len())
            .field("started", &self.started)
            .finish()
    }
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
