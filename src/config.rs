//! Runtime configuration
//!
//! # Example
//!
//! ```toml
//! seed = 42
//! merge_attributes = false
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Runtime settings, loadable from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seed for id generation; `None` seeds from the OS
    pub seed: Option<u64>,

    /// Three-way merge attribute bags of nodes both sides wrote during a
    /// history merge, instead of reporting them as conflicts
    pub merge_attributes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: None,
            merge_attributes: true,
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| GraphError::Config(e.to_string()))
    }

    /// Fix the id RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Toggle attribute three-way merge in history merges
    pub fn with_merge_attributes(mut self, enabled: bool) -> Self {
        self.merge_attributes = enabled;
        self
    }
}
