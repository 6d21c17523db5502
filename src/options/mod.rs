//! Registry behavior options with TOML preset support.
//!
//! Options serialize to/from TOML so a host can ship per-lesson presets.
//! Every field has a default, so partial files work.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::InstancingError;

/// What `add_instance` does when the instance ID is already in the group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse the add and leave the existing instance untouched.
    #[default]
    Reject,
    /// Overwrite the existing instance in place, keeping its slot.
    Update,
}

/// Top-level registry options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct RegistryOptions {
    /// Handling of duplicate instance IDs within one group.
    pub duplicate_instances: DuplicatePolicy,
    /// RGB written to every slot of a freshly allocated color buffer.
    #[schemars(title = "Initial Instance Color")]
    pub initial_color: [f32; 3],
    /// Log a warning when `create_group` replaces an existing group.
    pub warn_on_group_replace: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            duplicate_instances: DuplicatePolicy::Reject,
            initial_color: [1.0, 1.0, 1.0],
            warn_on_group_replace: true,
        }
    }
}

impl RegistryOptions {
    /// Generate JSON Schema describing the options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(RegistryOptions)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, InstancingError> {
        let content =
            std::fs::read_to_string(path).map_err(InstancingError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse options from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`InstancingError::OptionsParse`] on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, InstancingError> {
        toml::from_str(content)
            .map_err(|e| InstancingError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), InstancingError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| InstancingError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(InstancingError::Io)?;
        }
        std::fs::write(path, content).map_err(InstancingError::Io)
    }
}
