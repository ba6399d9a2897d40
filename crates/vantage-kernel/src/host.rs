//! Background host: a kernel ticking autonomously on a dedicated thread.
//!
//! [`KernelHost`] moves a [`Kernel`] onto its own thread and drives it
//! at a fixed rate. The thread owns the kernel exclusively; control
//! arrives over a bounded crossbeam channel (pause, resume, shutdown)
//! and the latest [`TickReport`] is published into a shared slot. No
//! locks sit on the tick path itself.
//!
//! A kernel invariant violation stops ticking: the host latches the
//! error and idles until shutdown, where the error is handed back
//! alongside the kernel's final report.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::config::{ConfigError, HostConfig};
use crate::kernel::{Kernel, KernelError, ShutdownReport};
use crate::metrics::TickReport;

/// Control messages from the owning thread to the host loop.
enum HostControl {
    Pause,
    Resume,
    Shutdown,
}

/// Errors from host control operations.
#[derive(Debug, PartialEq, Eq)]
pub enum HostError {
    /// The host thread has already stopped.
    Stopped,
    /// The control channel is full (back-pressure).
    ChannelFull,
    /// The host thread could not be joined.
    RecoveryFailed,
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "host thread has stopped"),
            Self::ChannelFull => write!(f, "host control channel full"),
            Self::RecoveryFailed => write!(f, "host thread could not be joined"),
        }
    }
}

impl std::error::Error for HostError {}

/// Final accounting from [`KernelHost::shutdown`].
#[derive(Debug)]
pub struct HostShutdown {
    /// The kernel's own shutdown report.
    pub report: ShutdownReport,
    /// Ticks the host drove.
    pub ticks: u64,
    /// Worker failures accumulated across all ticks.
    pub worker_failures: u64,
    /// The invariant violation that stopped ticking, if one occurred.
    pub error: Option<KernelError>,
}

/// State owned by the host thread's main loop.
struct HostLoop {
    kernel: Kernel,
    control_rx: Receiver<HostControl>,
    latest: Arc<Mutex<Option<TickReport>>>,
    ticks: Arc<AtomicU64>,
    worker_failures: Arc<AtomicU64>,
    tick_budget: Duration,
    dt: f64,
}

impl HostLoop {
    /// Run until shutdown. Returns the kernel so the caller can recover
    /// it, plus the latched error if ticking stopped early.
    fn run(mut self) -> (Kernel, Option<KernelError>) {
        let mut paused = false;
        loop {
            // Drain pending control messages.
            loop {
                match self.control_rx.try_recv() {
                    Ok(HostControl::Pause) => paused = true,
                    Ok(HostControl::Resume) => paused = false,
                    Ok(HostControl::Shutdown) => return (self.kernel, None),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return (self.kernel, None),
                }
            }

            if paused {
                // Block on control instead of spinning. A paused kernel
                // accumulates no delta-time for its workers.
                match self.control_rx.recv() {
                    Ok(HostControl::Pause) => {}
                    Ok(HostControl::Resume) => paused = false,
                    Ok(HostControl::Shutdown) | Err(_) => return (self.kernel, None),
                }
                continue;
            }

            let start = Instant::now();
            match self.kernel.tick(self.dt) {
                Ok(report) => {
                    self.ticks.fetch_add(1, Ordering::Relaxed);
                    self.worker_failures
                        .fetch_add(report.metrics.worker_failures, Ordering::Relaxed);
                    *self.latest.lock().unwrap() = Some(report);
                }
                Err(error) => return self.idle_until_shutdown(error),
            }

            // Sleep off the remaining budget, waking early for control.
            if let Some(remaining) = self.tick_budget.checked_sub(start.elapsed()) {
                match self.control_rx.recv_timeout(remaining) {
                    Ok(HostControl::Pause) => paused = true,
                    Ok(HostControl::Resume) => paused = false,
                    Ok(HostControl::Shutdown) => return (self.kernel, None),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return (self.kernel, None),
                }
            }
        }
    }

    fn idle_until_shutdown(self, error: KernelError) -> (Kernel, Option<KernelError>) {
        loop {
            match self.control_rx.recv() {
                Ok(HostControl::Shutdown) | Err(_) => return (self.kernel, Some(error)),
                Ok(_) => {}
            }
        }
    }
}

/// A kernel running autonomously on a background thread.
///
/// Created with [`spawn`](KernelHost::spawn) after all workers are
/// registered. The host thread is joined on [`shutdown`](KernelHost::shutdown)
/// or drop, whichever comes first.
pub struct KernelHost {
    control_tx: Sender<HostControl>,
    thread: Option<JoinHandle<(Kernel, Option<KernelError>)>>,
    latest: Arc<Mutex<Option<TickReport>>>,
    ticks: Arc<AtomicU64>,
    worker_failures: Arc<AtomicU64>,
}

impl KernelHost {
    /// Move `kernel` onto a new thread ticking at the configured rate.
    pub fn spawn(kernel: Kernel, config: HostConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let dt = 1.0 / config.tick_rate_hz;
        let tick_budget = Duration::from_secs_f64(dt);

        let (control_tx, control_rx) = bounded(config.control_capacity);
        let latest = Arc::new(Mutex::new(None));
        let ticks = Arc::new(AtomicU64::new(0));
        let worker_failures = Arc::new(AtomicU64::new(0));

        let host_loop = HostLoop {
            kernel,
            control_rx,
            latest: Arc::clone(&latest),
            ticks: Arc::clone(&ticks),
            worker_failures: Arc::clone(&worker_failures),
            tick_budget,
            dt,
        };
        let thread = thread::Builder::new()
            .name("vantage-host".into())
            .spawn(move || host_loop.run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            control_tx,
            thread: Some(thread),
            latest,
            ticks,
            worker_failures,
        })
    }

    /// Stop ticking until [`resume`](KernelHost::resume).
    pub fn pause(&self) -> Result<(), HostError> {
        self.send(HostControl::Pause)
    }

    /// Resume ticking after a [`pause`](KernelHost::pause).
    pub fn resume(&self) -> Result<(), HostError> {
        self.send(HostControl::Resume)
    }

    /// The most recent tick's report, if any tick has completed.
    pub fn latest_report(&self) -> Option<TickReport> {
        self.latest.lock().unwrap().clone()
    }

    /// Ticks driven so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Worker failures accumulated across all ticks so far.
    pub fn worker_failures(&self) -> u64 {
        self.worker_failures.load(Ordering::Relaxed)
    }

    /// Stop the host thread, recover the kernel, and tear it down.
    pub fn shutdown(mut self) -> Result<HostShutdown, HostError> {
        let _ = self.control_tx.send(HostControl::Shutdown);
        let thread = self.thread.take().ok_or(HostError::Stopped)?;
        let (kernel, error) = thread.join().map_err(|_| HostError::RecoveryFailed)?;
        Ok(HostShutdown {
            report: kernel.shutdown(),
            ticks: self.ticks.load(Ordering::Relaxed),
            worker_failures: self.worker_failures.load(Ordering::Relaxed),
            error,
        })
    }

    fn send(&self, msg: HostControl) -> Result<(), HostError> {
        use crossbeam_channel::TrySendError;
        match self.control_tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(HostError::ChannelFull),
            Err(TrySendError::Disconnected(_)) => Err(HostError::Stopped),
        }
    }
}

impl Drop for KernelHost {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.control_tx.send(HostControl::Shutdown);
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    use vantage_core::{ComponentDef, ComponentSchema, ModuleError, Tick};
    use vantage_snapshot::View;

    use crate::config::KernelConfig;
    use crate::module::WorkerDescriptor;

    fn counting_kernel() -> (Kernel, Arc<AtomicU64>) {
        let schema = Arc::new(ComponentSchema::new(vec![ComponentDef::named("position")]));
        let mut kernel = Kernel::new(KernelConfig::new(schema)).unwrap();
        let count = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&count);
        kernel
            .register_worker(WorkerDescriptor::fast(
                "counter",
                move |_: &mut View, _dt| {
                    sink.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                },
            ))
            .unwrap();
        (kernel, count)
    }

    fn fast_host_config() -> HostConfig {
        HostConfig {
            tick_rate_hz: 500.0,
            ..HostConfig::default()
        }
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn host_ticks_autonomously() {
        let (kernel, count) = counting_kernel();
        let host = KernelHost::spawn(kernel, fast_host_config()).unwrap();

        assert!(
            wait_until(Duration::from_secs(5), || host.ticks() >= 5),
            "host never reached 5 ticks"
        );
        assert!(host.latest_report().is_some());

        let shutdown = host.shutdown().unwrap();
        assert!(shutdown.error.is_none());
        assert_eq!(shutdown.report.ticks, Tick(shutdown.ticks));
        // The fast worker ran once per tick.
        assert_eq!(count.load(Ordering::Relaxed), shutdown.ticks);
    }

    #[test]
    fn pause_stops_ticking_and_resume_continues() {
        let (kernel, _count) = counting_kernel();
        let host = KernelHost::spawn(kernel, fast_host_config()).unwrap();

        assert!(wait_until(Duration::from_secs(5), || host.ticks() >= 2));
        host.pause().unwrap();
        // Let an in-flight tick settle.
        thread::sleep(Duration::from_millis(50));
        let paused_at = host.ticks();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(host.ticks(), paused_at, "paused host must not tick");

        host.resume().unwrap();
        assert!(
            wait_until(Duration::from_secs(5), || host.ticks() > paused_at),
            "resumed host never ticked"
        );
        host.shutdown().unwrap();
    }

    #[test]
    fn worker_failures_accumulate() {
        let schema = Arc::new(ComponentSchema::new(vec![ComponentDef::named("position")]));
        let mut kernel = Kernel::new(KernelConfig::new(schema)).unwrap();
        kernel
            .register_worker(WorkerDescriptor::fast("broken", |_: &mut View, _| {
                Err(ModuleError::failed("always"))
            }))
            .unwrap();

        let host = KernelHost::spawn(kernel, fast_host_config()).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            host.worker_failures() >= 3
        }));

        let shutdown = host.shutdown().unwrap();
        assert!(shutdown.error.is_none(), "worker failures never stop the host");
        assert_eq!(shutdown.worker_failures, shutdown.ticks);
    }

    #[test]
    fn drop_joins_the_host_thread() {
        let (kernel, _count) = counting_kernel();
        let host = KernelHost::spawn(kernel, fast_host_config()).unwrap();
        assert!(wait_until(Duration::from_secs(5), || host.ticks() >= 1));
        drop(host);
    }

    #[test]
    fn invalid_rate_is_rejected_at_spawn() {
        let (kernel, _count) = counting_kernel();
        let config = HostConfig {
            tick_rate_hz: 0.0,
            ..HostConfig::default()
        };
        assert!(matches!(
            KernelHost::spawn(kernel, config),
            Err(ConfigError::InvalidTickRate { .. })
        ));
    }
}
