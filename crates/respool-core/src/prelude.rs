//! Convenient re-exports for downstream crates.

pub use crate::config::CacheConfig;
pub use crate::error::{Error, Result};
pub use crate::handle::Pooled;
