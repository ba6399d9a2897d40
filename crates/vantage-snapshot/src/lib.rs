//! Snapshot providers, pool, and read-only views.
//!
//! This crate is the isolation layer between the authoritative world
//! store and concurrently-running worker modules. Providers hand out
//! [`View`]s — consistent, read-only world state — under three
//! strategies with different cost/freshness trade-offs, backed by a
//! [`SnapshotPool`] that makes steady-state acquisition allocation-free.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod pool;
pub mod pooled;
pub mod provider;
pub mod replica;
pub mod shared;
pub mod view;

pub use pool::{PoolStats, SnapshotPool};
pub use pooled::PooledProvider;
pub use provider::{ProviderKind, SnapshotProvider};
pub use replica::ReplicaProvider;
pub use shared::SharedProvider;
pub use view::View;
