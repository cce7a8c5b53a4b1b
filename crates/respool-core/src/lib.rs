#![forbid(unsafe_code)]
//! respool-core: shared vocabulary for the respool resource cache.
//!
//! This crate only holds the *interfaces* and plain data the cache is built
//! on: the [`Pooled`] identity trait used by the reverse index, the
//! [`CacheConfig`] knob set, and the core error type. The cache itself lives
//! in `respool-cache`.

pub mod config;
pub mod error;
pub mod handle;
pub mod prelude;

pub use config::CacheConfig;
pub use error::{Error, Result};
pub use handle::Pooled;
