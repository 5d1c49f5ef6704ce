//! Engine configuration.
//!
//! Every field has a serde default so a partial (or empty) JSON document is
//! a valid configuration file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Wall-clock budget for one path-completion directory scan (ms).
pub const DEFAULT_PATH_SCAN_BUDGET_MS: u64 = 400;

fn default_true() -> bool {
    true
}

fn default_path_budget() -> u64 {
    DEFAULT_PATH_SCAN_BUDGET_MS
}

fn default_min_word_len() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Offer word completions while typing.
    #[serde(default = "default_true")]
    pub word_completion: bool,
    /// Offer directory listings when the line ends in a path-like token.
    #[serde(default = "default_true")]
    pub path_completion: bool,
    /// Offer the matching closing tag after `</` in markup languages.
    #[serde(default = "default_true")]
    pub tag_completion: bool,
    #[serde(default = "default_path_budget")]
    pub path_scan_budget_ms: u64,
    /// Minimum typed-word length before word completion kicks in.
    #[serde(default = "default_min_word_len")]
    pub min_word_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            word_completion: true,
            path_completion: true,
            tag_completion: true,
            path_scan_budget_ms: DEFAULT_PATH_SCAN_BUDGET_MS,
            min_word_len: 1,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| EngineError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    pub fn path_scan_budget(&self) -> Duration {
        Duration::from_millis(self.path_scan_budget_ms)
    }
}
