//! CLI configuration via environment variables
//!
//! Settings that only shape how the CLI presents results. Build settings
//! live in weft.toml and are loaded through weft-config.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Default to JSON output (WEFT_JSON=1)
    pub default_json: bool,
    /// Disable colored output (WEFT_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            default_json: env::var("WEFT_JSON")
                .map(|v| {
                    let lower = v.to_lowercase();
                    lower == "1" || lower == "true" || lower == "json"
                })
                .unwrap_or(false),
            no_color: env::var("WEFT_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
        }
    }

    /// Turn colored output off when asked to
    pub fn apply_color(&self) {
        if self.no_color {
            colored::control::set_override(false);
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
