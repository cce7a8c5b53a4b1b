//! YAML replay scripts.
//!
//! Example:
//! ```yaml
//! config: { grace_capacity: 2 }
//! steps:
//!   - { op: acquire, key: "A" }
//!   - { op: acquire, key: "B" }
//!   - { op: release, key: "A" }
//!   - { op: set_capacity, capacity: 4 }
//!   - { op: close }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use respool_core::config::CacheConfig;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("step {index}: {reason}")]
    Invalid { index: usize, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub grace_capacity: Option<usize>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: Option<ScriptConfig>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Step {
    /// Acquire `key`, creating a synthetic resource if it is unseen.
    Acquire { key: String },

    /// Acquire `key` without a factory; fails if the key is not indexed.
    AcquireExisting { key: String },

    /// Release one acquisition of `key`.
    Release { key: String },

    SetCapacity { capacity: usize },

    /// Tear the cache down. Must be the last step.
    Close,
}

impl Script {
    pub fn parse(yaml: &str) -> Result<Self, ScriptError> {
        let script: Script = serde_yaml::from_str(yaml)?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<(), ScriptError> {
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::Acquire { key } | Step::AcquireExisting { key } | Step::Release { key }
                    if key.trim().is_empty() =>
                {
                    return Err(ScriptError::Invalid {
                        index,
                        reason: "key must not be empty".into(),
                    });
                }
                Step::Close if index + 1 != self.steps.len() => {
                    return Err(ScriptError::Invalid {
                        index,
                        reason: "steps after close are not allowed".into(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Layer the script's config on top of `base`.
    pub fn apply_config(&self, base: &mut CacheConfig) {
        if let Some(doc) = &self.config {
            if let Some(capacity) = doc.grace_capacity {
                base.grace_capacity = capacity;
            }
            if let Some(tag) = &doc.tag {
                base.tag = tag.clone();
            }
        }
    }
}
