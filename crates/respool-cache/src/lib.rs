#![forbid(unsafe_code)]
//! respool-cache: keyed, reference-counted resource cache with deferred eviction.
//!
//! Consumers acquire resources by key; the first acquisition runs a
//! caller-supplied factory, later ones share the same instance. When the last
//! acquisition is released the entry is parked in a bounded FIFO grace buffer
//! where it can be rescued. Overflowing the buffer evicts the oldest entry and
//! hands its resource to the disposer bound at creation.
//!
//! Everything here is single-threaded. [`SharedCache`] and [`Lease`] give RAII
//! release on top of the plain [`ResourceCache`].

pub mod cache;
pub mod entry;
pub mod error;
mod grace;
pub mod guard;
pub mod tracking;

pub use cache::ResourceCache;
pub use entry::Disposer;
pub use error::{Error, Result};
pub use guard::{Lease, SharedCache};
pub use tracking::CacheStats;
