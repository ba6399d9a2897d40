//! Test utilities and mock worker modules for Vantage development.
//!
//! Provides standard [`Module`] implementations for kernel and provider
//! testing — counting, recording, spawning, failing, panicking — plus
//! schema and world fixtures.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod fixtures;

pub use fixtures::{schema_of, seed_entities};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vantage_core::{ComponentTypeId, ModuleError, WorldRead};
use vantage_kernel::Module;
use vantage_snapshot::View;

/// Counts its runs and samples the view's entity count.
///
/// Clone the probe handles before moving the module into a kernel:
///
/// ```ignore
/// let module = CountingModule::new();
/// let runs = Arc::clone(&module.runs);
/// kernel.register_worker(WorkerDescriptor::fast("counter", module))?;
/// ```
pub struct CountingModule {
    pub runs: Arc<AtomicU64>,
    pub last_entity_count: Arc<AtomicU64>,
}

impl CountingModule {
    pub fn new() -> Self {
        Self {
            runs: Arc::new(AtomicU64::new(0)),
            last_entity_count: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Default for CountingModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for CountingModule {
    fn run(&mut self, view: &mut View, _dt: f64) -> Result<(), ModuleError> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.last_entity_count
            .store(view.entity_count() as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// One observation captured by a [`RecordingModule`] run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunRecord {
    /// World version the view reflected.
    pub tick: u64,
    /// Delta-time handed to the run.
    pub dt: f64,
    /// Entities visible in the view.
    pub entity_count: usize,
    /// Events delivered with the view.
    pub events: usize,
}

/// Records every run's tick, delta-time, entity count, and event count.
pub struct RecordingModule {
    pub records: Arc<Mutex<Vec<RunRecord>>>,
}

impl RecordingModule {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for RecordingModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for RecordingModule {
    fn run(&mut self, view: &mut View, dt: f64) -> Result<(), ModuleError> {
        let record = RunRecord {
            tick: view.tick().0,
            dt,
            entity_count: view.entity_count(),
            events: view.consume_events().len(),
        };
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

/// Creates `per_run` entities carrying `component` on every run.
pub struct SpawnModule {
    pub component: ComponentTypeId,
    pub per_run: u32,
    pub payload: Vec<u8>,
}

impl SpawnModule {
    pub fn new(component: ComponentTypeId, per_run: u32, payload: &[u8]) -> Self {
        Self {
            component,
            per_run,
            payload: payload.to_vec(),
        }
    }
}

impl Module for SpawnModule {
    fn run(&mut self, view: &mut View, _dt: f64) -> Result<(), ModuleError> {
        for _ in 0..self.per_run {
            let target = view.log().create_entity();
            let payload = self.payload.clone();
            view.log().set_component(target, self.component, &payload);
        }
        Ok(())
    }
}

/// Fails deterministically after a configurable number of successful runs.
pub struct FailingModule {
    pub succeed_for: usize,
    calls: AtomicUsize,
}

impl FailingModule {
    /// Fail from the very first run.
    pub fn always() -> Self {
        Self::after(0)
    }

    /// Succeed `succeed_for` times, then fail on every later run.
    pub fn after(succeed_for: usize) -> Self {
        Self {
            succeed_for,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Module for FailingModule {
    fn run(&mut self, _view: &mut View, _dt: f64) -> Result<(), ModuleError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if call < self.succeed_for {
            Ok(())
        } else {
            Err(ModuleError::failed(format!(
                "deliberate failure on call {call}"
            )))
        }
    }
}

/// Panics on every run, for dispatch-boundary containment tests.
pub struct PanickingModule;

impl Module for PanickingModule {
    fn run(&mut self, _view: &mut View, _dt: f64) -> Result<(), ModuleError> {
        panic!("deliberate panic from PanickingModule");
    }
}
