//! Global Configuration (~/.weft/config.toml)
//!
//! Handles user-level configuration stored in `~/.weft/config.toml`.

use crate::workspace::ToolsConfig;
use crate::{validate_jobs, validate_linkage, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.weft/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Tool fallbacks used when the workspace does not name them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Default build profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Default linkage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkage: Option<String>,

    /// Default worker thread count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(defaults) = &self.defaults {
            if let Some(linkage) = &defaults.linkage {
                validate_linkage("defaults.linkage", linkage)?;
            }
            if let Some(jobs) = defaults.jobs {
                validate_jobs("defaults.jobs", jobs)?;
            }
        }
        Ok(())
    }

    /// Get the global config file path (~/.weft/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".weft").join("config.toml"))
    }

    pub fn default_profile(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.profile.as_deref())
    }

    pub fn default_linkage(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.linkage.as_deref())
    }

    pub fn default_jobs(&self) -> Option<usize> {
        self.defaults.as_ref().and_then(|d| d.jobs)
    }

    /// Merge another global config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &GlobalConfig) {
        if other.defaults.is_some() {
            self.defaults = other.defaults.clone();
        }
        if let Some(tools) = &other.tools {
            self.tools.get_or_insert_with(ToolsConfig::default).merge(tools);
        }
    }
}
