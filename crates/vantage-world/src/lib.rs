//! Entity/component world store for the Vantage simulation host.
//!
//! [`WorldStore`] is the authoritative mutable state: a generational
//! entity allocator, one byte-payload component table per registered
//! type, a version counter, and a bounded change-event log. The same
//! type also serves as the scratch/replica instance that snapshot
//! providers synchronize into via [`WorldStore::copy_from`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod entities;
pub mod events;
pub mod store;

pub use events::EventLog;
pub use store::WorldStore;
