//! Engine configuration, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::graph::DanglingPolicy;
use crate::schema::stats::StatVector;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Settings shared by every reader session a library opens.
///
/// ```ron
/// (
///     default_stats: {"happiness": 50, "trust": 40},
///     dangling: End,
///     autosave: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Stats a new or reset reading session starts with.
    pub default_stats: StatVector,
    /// What a transition to a missing scene does during play.
    pub dangling: DanglingPolicy,
    /// Save progress after every successful move instead of only on request.
    pub autosave: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_stats: StatVector::default(),
            dangling: DanglingPolicy::Error,
            autosave: false,
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// Stat names of the default vector, the schema impacts are linted against.
    pub fn stat_names(&self) -> Vec<&str> {
        self.default_stats.names().collect()
    }
}
