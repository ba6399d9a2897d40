//! Error types shared across the Vantage workspace.
//!
//! Organized by subsystem: world store misuse, snapshot provider and pool
//! invariant violations, worker-body failures, and mutation-log replay
//! guard violations. Provider and replay errors indicate corrupted
//! invariants and stop the tick; worker errors are isolated per worker.

use std::error::Error;
use std::fmt;

use crate::id::{ComponentTypeId, EntityId, ProviderInstanceId};

/// Errors from world store operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldError {
    /// The entity does not exist or its generation is stale.
    DeadEntity {
        /// The offending handle.
        entity: EntityId,
    },
    /// The component type is not registered in the store's schema.
    UnknownComponent {
        /// The unregistered type.
        component: ComponentTypeId,
    },
    /// A copy was attempted between stores built from different schemas.
    SchemaMismatch,
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadEntity { entity } => write!(f, "entity {entity} is dead or stale"),
            Self::UnknownComponent { component } => {
                write!(f, "component type {component} is not registered")
            }
            Self::SchemaMismatch => write!(f, "stores were built from different schemas"),
        }
    }
}

impl Error for WorldError {}

/// Invariant violations in snapshot providers and the snapshot pool.
///
/// These are usage errors in the sense of the error taxonomy: they
/// indicate a broken acquire/release discipline that would corrupt
/// pooled state for other workers, so they are surfaced loudly and
/// stop the tick rather than being retried or swallowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    /// A view was released against a provider that did not issue it.
    ForeignView {
        /// The provider the release was called on.
        expected: ProviderInstanceId,
        /// The provider recorded in the view.
        got: ProviderInstanceId,
    },
    /// A release was attempted with the reference count already at zero.
    ReleaseWithoutAcquire,
    /// An operation that requires exclusive access to a snapshot
    /// instance found views still outstanding.
    ViewsOutstanding,
    /// The underlying world copy failed.
    Copy(WorldError),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignView { expected, got } => {
                write!(f, "view from provider {got} released against provider {expected}")
            }
            Self::ReleaseWithoutAcquire => {
                write!(f, "release without a matching acquire (refcount underflow)")
            }
            Self::ViewsOutstanding => {
                write!(f, "snapshot instance still has outstanding views")
            }
            Self::Copy(e) => write!(f, "snapshot sync failed: {e}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Copy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WorldError> for SnapshotError {
    fn from(e: WorldError) -> Self {
        Self::Copy(e)
    }
}

/// A failure raised inside a worker module's entry point.
///
/// Contained at the dispatch boundary: the worker's view is still
/// released and other workers are unaffected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleError {
    /// The module's `run` returned an error.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The module's `run` panicked; the panic was contained at the
    /// dispatch boundary.
    Panicked {
        /// The panic payload, if it was a string.
        reason: String,
    },
}

impl ModuleError {
    /// Convenience constructor for [`ModuleError::ExecutionFailed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::Panicked { reason } => write!(f, "panicked: {reason}"),
        }
    }
}

impl Error for ModuleError {}

/// Violations of the mutation-log replay discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayError {
    /// The log was already replayed (or discarded) once.
    AlreadyReplayed,
    /// A record addressed a created-entity placeholder that precedes
    /// its `CreateEntity` record, or exceeds the log's creation count.
    UnknownCreation {
        /// The out-of-range creation index.
        index: u32,
    },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyReplayed => write!(f, "mutation log already replayed"),
            Self::UnknownCreation { index } => {
                write!(f, "record targets unknown creation index {index}")
            }
        }
    }
}

impl Error for ReplayError {}
