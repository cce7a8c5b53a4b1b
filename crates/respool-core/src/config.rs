//! Cache configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Grace-buffer capacity used when nothing else is configured.
pub const DEFAULT_GRACE_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Max number of released (refcount 0) entries kept alive for rescue.
    /// Only enforced when an entry enters the grace buffer.
    pub grace_capacity: usize,

    /// Debug tag attached to tracing events of the cache.
    pub tag: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            grace_capacity: DEFAULT_GRACE_CAPACITY,
            tag: "resource-cache".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn with_grace_capacity(grace_capacity: usize) -> Self {
        Self {
            grace_capacity,
            ..Self::default()
        }
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RESPOOL_GRACE_CAPACITY`: grace-buffer capacity
    /// - `RESPOOL_TAG`: tracing tag
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`], reading variables through `lookup`.
    /// Unparseable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(s) = lookup("RESPOOL_GRACE_CAPACITY") {
            if let Ok(v) = s.trim().parse::<usize>() {
                cfg.grace_capacity = v;
            }
        }

        if let Some(s) = lookup("RESPOOL_TAG") {
            if !s.trim().is_empty() {
                cfg.tag = s;
            }
        }

        cfg
    }

    /// Parse a JSON config document. Missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
