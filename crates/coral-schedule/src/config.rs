//! Expansion limits and default horizons.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables shared by the expander and the checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Hard cap on occurrences produced by a single expansion.
    pub max_occurrences: usize,
    /// Horizon length used when the caller does not pass a window.
    pub default_horizon_days: u32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_occurrences: 10_000,
            default_horizon_days: 60,
        }
    }
}

impl ExpansionConfig {
    /// Parse a JSON config document. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
