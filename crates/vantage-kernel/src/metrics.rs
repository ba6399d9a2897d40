//! Per-tick reports and performance metrics.

use vantage_core::{ModuleError, Tick, WorkerId};

/// Timing and counter metrics for a single kernel tick.
///
/// All durations are in microseconds. Pool and event counters are
/// deltas for this tick; `pool_created` growing after warm-up means the
/// pool was empty on an acquire, which is a performance signal rather
/// than an error.
#[derive(Clone, Debug, Default)]
pub struct KernelMetrics {
    /// Wall-clock time for the entire tick.
    pub total_us: u64,
    /// Time spent resynchronizing providers.
    pub update_us: u64,
    /// Time from the first view acquisition to the last worker joining.
    pub dispatch_us: u64,
    /// Time spent replaying deferred mutation logs.
    pub replay_us: u64,
    /// Per-worker execution times: `(name, microseconds)`.
    pub worker_us: Vec<(String, u64)>,
    /// Scratch instances constructed this tick.
    pub pool_created: u64,
    /// Acquisitions served from the pool's free list this tick.
    pub pool_reused: u64,
    /// Change events evicted from the live store's log this tick.
    pub events_dropped: u64,
    /// Mutation records applied during replay.
    pub mutations_applied: u64,
    /// Mutation records skipped during replay (dead target).
    pub mutations_skipped: u64,
    /// Mutation records discarded from failed workers' logs.
    pub mutations_discarded: u64,
    /// Workers whose `run` returned an error or panicked.
    pub worker_failures: u64,
}

/// Outcome of one worker's run within a tick.
#[derive(Clone, Debug)]
pub struct WorkerRunReport {
    /// The worker, by registration order.
    pub worker: WorkerId,
    /// The worker's registered name.
    pub name: String,
    /// Wall-clock time of the worker's `run`, in microseconds.
    pub duration_us: u64,
    /// The failure, if the run did not succeed.
    pub error: Option<ModuleError>,
    /// Mutation records from this worker applied during replay.
    pub mutations_applied: u64,
    /// Mutation records from this worker skipped during replay.
    pub mutations_skipped: u64,
    /// Mutation records discarded because the run failed.
    pub mutations_discarded: u64,
}

/// Result of one successful [`crate::Kernel::tick`] call.
///
/// A tick with failing workers still succeeds: the world advances, the
/// other workers' logs are replayed, and the failures are reported here
/// per worker.
#[derive(Clone, Debug)]
pub struct TickReport {
    /// The world version after this tick.
    pub tick: Tick,
    /// One entry per dispatched worker, in registration order.
    pub workers: Vec<WorkerRunReport>,
    /// Timing and counters for the tick.
    pub metrics: KernelMetrics,
}

impl TickReport {
    /// Whether every dispatched worker ran without error.
    pub fn all_succeeded(&self) -> bool {
        self.workers.iter().all(|w| w.error.is_none())
    }
}
