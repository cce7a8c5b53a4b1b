#![forbid(unsafe_code)]
//! respool: keyed, reference-counted resource cache with deferred eviction.
//!
//! Facade over the workspace crates; see `respool-cache` for the cache itself.

pub use respool_cache::{CacheStats, Disposer, Error, Lease, ResourceCache, Result, SharedCache};
pub use respool_core::{CacheConfig, Pooled};
