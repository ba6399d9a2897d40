//! Orchestration kernel for the Vantage simulation host.
//!
//! [`Kernel`] owns the authoritative [`vantage_world::WorldStore`], a
//! registry of worker modules, and one snapshot provider per worker
//! group. Each [`tick`](Kernel::tick) runs the fixed phase sequence:
//! advance the world version, resynchronize providers, dispatch
//! eligible workers concurrently against read-only views, join them,
//! release the views, and replay their deferred mutation logs against
//! the live world in registration order.
//!
//! [`KernelHost`] wraps a kernel on a dedicated thread ticking at a
//! fixed rate, with pause/resume/shutdown control.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod host;
pub mod kernel;
pub mod metrics;
pub mod module;
mod grouping;
mod replay;

pub use config::{ConfigError, HostConfig, KernelConfig};
pub use host::{HostError, HostShutdown, KernelHost};
pub use kernel::{Kernel, KernelError, ShutdownReport};
pub use metrics::{KernelMetrics, TickReport, WorkerRunReport};
pub use module::{Module, Tier, WorkerDescriptor};
