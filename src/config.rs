//! Run configuration
//!
//! Everything is optional: a JSON file only needs the keys it overrides.
//!
//! ```json
//! {
//!   "traversal": { "link_scope": "document", "settle": { "group_activation": 5000 } },
//!   "selectors": { "popup_container": [".layui-layer"] }
//! }
//! ```

use crate::engine::TraversalConfig;
use crate::error::ConfigError;
use crate::ui::Selectors;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub traversal: TraversalConfig,
    pub selectors: Selectors,
}

impl ScrapeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse { path: "<inline>".to_string(), source })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: display.clone(), source })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse { path: display, source })
    }

    /// Pretty JSON of the effective configuration
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
