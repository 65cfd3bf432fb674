//! Weft Configuration System
//!
//! Provides configuration management for weft workspaces:
//! - Workspace configuration (weft.toml)
//! - Global user configuration (~/.weft/config.toml)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.weft/config.toml)
//! 2. Workspace config (./weft.toml)
//! 3. Environment variables (WEFT_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use weft_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod global;
pub mod loader;
pub mod workspace;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use workspace::{ToolsConfig, WorkspaceConfig};

/// Check a linkage value is one the build understands
pub(crate) fn validate_linkage(field: &str, value: &str) -> ConfigResult<()> {
    if !matches!(value, "static" | "dynamic") {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be 'static' or 'dynamic', got '{}'", value),
        });
    }
    Ok(())
}

/// Check a job count is usable
pub(crate) fn validate_jobs(field: &str, jobs: usize) -> ConfigResult<()> {
    if jobs == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
