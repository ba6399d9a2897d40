//! Worker module contract and registration descriptors.

use std::num::NonZeroU64;

use vantage_core::{ComponentFilter, ModuleError};
use vantage_snapshot::View;

/// A background worker dispatched by the kernel.
///
/// `run` receives a read-only [`View`] of world state and the
/// delta-time accumulated since the worker's previous run. Mutations
/// are recorded through [`View::log`]; they are replayed against the
/// live world by the kernel after all workers of the tick have joined.
///
/// An error (or panic) in `run` is contained at the dispatch boundary:
/// the view is still released, the worker's mutation log for that tick
/// is discarded, and other workers are unaffected.
pub trait Module: Send {
    /// Execute one run of the worker against a snapshot of world state.
    fn run(&mut self, view: &mut View, dt: f64) -> Result<(), ModuleError>;
}

impl<F> Module for F
where
    F: FnMut(&mut View, f64) -> Result<(), ModuleError> + Send,
{
    fn run(&mut self, view: &mut View, dt: f64) -> Result<(), ModuleError> {
        self(view, dt)
    }
}

/// How often a worker runs, and which snapshot strategy serves it.
///
/// Fast-tier workers run every tick against a persistent full replica;
/// slow-tier workers run at a reduced cadence against pooled filtered
/// snapshots, shared within a cohort when several run at the same
/// cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Full-fidelity state every tick, served by a persistent replica.
    Fast,
    /// Filtered state at reduced cadence, served from the pool.
    Slow,
}

/// Registration record for a worker module.
pub struct WorkerDescriptor {
    /// Name used in reports and metrics.
    pub name: String,
    /// Scheduling tier.
    pub tier: Tier,
    /// Run every `cadence` ticks: first on tick `cadence`, then on
    /// every tick divisible by it.
    pub cadence: NonZeroU64,
    /// The component types the worker reads. Slow-tier syncs are
    /// restricted to this set (unioned across a cohort); fast-tier
    /// replicas always carry everything.
    pub filter: ComponentFilter,
    /// The worker's entry point.
    pub module: Box<dyn Module>,
}

impl std::fmt::Debug for WorkerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerDescriptor")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .field("cadence", &self.cadence)
            .field("filter", &self.filter)
            .field("module", &"<dyn Module>")
            .finish()
    }
}

impl WorkerDescriptor {
    /// A fast-tier worker: cadence 1, full-fidelity replica views.
    pub fn fast(name: impl Into<String>, module: impl Module + 'static) -> Self {
        Self {
            name: name.into(),
            tier: Tier::Fast,
            cadence: NonZeroU64::MIN,
            filter: ComponentFilter::empty(),
            module: Box::new(module),
        }
    }

    /// A slow-tier worker running every `cadence` ticks over `filter`.
    pub fn slow(
        name: impl Into<String>,
        cadence: NonZeroU64,
        filter: ComponentFilter,
        module: impl Module + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tier: Tier::Slow,
            cadence,
            filter,
            module: Box::new(module),
        }
    }
}
