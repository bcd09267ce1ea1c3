//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for an [`Engine`](crate::reactive::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on collector drain passes within one transaction.
    /// A graph whose collectors keep re-queueing each other is abandoned
    /// once this is exceeded.
    pub max_collector_passes: usize,

    /// Number of cell slots preallocated by the arena.
    pub cell_capacity: usize,
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the config to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_collector_passes: 10_000,
            cell_capacity: 64,
        }
    }
}
