//! Workspace Configuration (weft.toml)
//!
//! Handles workspace-level configuration stored in `weft.toml` at the workspace root.

use crate::{validate_jobs, validate_linkage, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Workspace configuration from weft.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Workspace layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceSection>,

    /// Build settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,

    /// External tool locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsConfig>,

    /// External library lookup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libraries: Option<LibrariesConfig>,
}

/// `[workspace]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSection {
    /// Workspace name (used for the top-level build description)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Module root directories, relative to the workspace root
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<PathBuf>,

    /// Output directory (default: "build")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// `[build]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Build profile (dev, release, or custom)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Linkage ("static" or "dynamic")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkage: Option<String>,

    /// Distribute independent per-project work across threads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,

    /// Worker thread count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

/// `[tools]` section, shared with the global config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ToolsConfig {
    /// Directory holding tool asset files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<PathBuf>,

    /// Reflection generator executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<PathBuf>,

    /// Parser generator executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_generator: Option<PathBuf>,
}

impl ToolsConfig {
    /// Merge another tools config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &ToolsConfig) {
        if other.assets.is_some() {
            self.assets = other.assets.clone();
        }
        if other.reflection.is_some() {
            self.reflection = other.reflection.clone();
        }
        if other.parser_generator.is_some() {
            self.parser_generator = other.parser_generator.clone();
        }
    }
}

/// `[libraries]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LibrariesConfig {
    /// Root of a `<name>/{include,lib}` prebuilt library layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prebuilt: Option<PathBuf>,

    /// Directories searched for installed library files
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

impl WorkspaceConfig {
    /// Load workspace configuration from a file
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

    /// Validate the workspace configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ws) = &self.workspace {
            if let Some(name) = &ws.name {
                if name.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "workspace.name".to_string(),
                        reason: "name cannot be empty".to_string(),
                    });
                }
            }
            if ws.modules.iter().any(|m| m.is_absolute()) {
                return Err(ConfigError::ValidationError(
                    "workspace.modules entries must be relative to the workspace root".to_string(),
                ));
            }
        }

        if let Some(build) = &self.build {
            if let Some(linkage) = &build.linkage {
                validate_linkage("build.linkage", linkage)?;
            }
            if let Some(jobs) = build.jobs {
                validate_jobs("build.jobs", jobs)?;
            }
        }

        Ok(())
    }

    /// Workspace name
    pub fn name(&self) -> Option<&str> {
        self.workspace.as_ref().and_then(|w| w.name.as_deref())
    }

    /// Declared module directories (relative)
    pub fn modules(&self) -> &[PathBuf] {
        self.workspace
            .as_ref()
            .map(|w| w.modules.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_workspace() {
        let toml = r#"
[workspace]
name = "game"
modules = ["engine", "thirdparty/zlib"]
"#;
        let config: WorkspaceConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.name(), Some("game"));
        assert_eq!(config.modules().len(), 2);
    }

    #[test]
    fn test_parse_full_workspace() {
        let toml = r#"
[workspace]
name = "game"
modules = ["engine"]
output = "out"

[build]
profile = "release"
linkage = "static"
parallel = false
jobs = 4

[tools]
assets = "tools/assets"
reflection = "tools/bin/reflect"
parser-generator = "tools/bin/lemon"

[libraries]
prebuilt = "prebuilt"
search-paths = ["/usr/lib"]
"#;
        let config: WorkspaceConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        let build = config.build.as_ref().unwrap();
        assert_eq!(build.linkage.as_deref(), Some("static"));
        assert_eq!(build.jobs, Some(4));
        assert_eq!(
            config.tools.as_ref().unwrap().parser_generator,
            Some(PathBuf::from("tools/bin/lemon"))
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[workspace]
nmae = "typo"
"#;
        assert!(toml::from_str::<WorkspaceConfig>(toml).is_err());
    }

    #[test]
    fn test_invalid_linkage() {
        let config = WorkspaceConfig {
            build: Some(BuildSection {
                linkage: Some("hybrid".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_absolute_module_path_rejected() {
        let config = WorkspaceConfig {
            workspace: Some(WorkspaceSection {
                modules: vec![PathBuf::from("/abs/engine")],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tools_merge() {
        let mut base = ToolsConfig {
            assets: Some(PathBuf::from("a")),
            reflection: Some(PathBuf::from("r")),
            parser_generator: None,
        };
        base.merge(&ToolsConfig {
            assets: Some(PathBuf::from("b")),
            ..Default::default()
        });
        assert_eq!(base.assets, Some(PathBuf::from("b")));
        assert_eq!(base.reflection, Some(PathBuf::from("r")));
    }
}
