//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::workspace::{BuildSection, ToolsConfig, WorkspaceConfig, WorkspaceSection};
use crate::{validate_jobs, validate_linkage, ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the workspace configuration file
pub const WORKSPACE_FILE: &str = "weft.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.weft/config.toml) - lowest priority
/// 2. Workspace config (./weft.toml) - overrides global
/// 3. Environment variables (WEFT_*) - overrides workspace
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace configuration
    pub workspace: WorkspaceConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Workspace root directory (where weft.toml was found)
    pub workspace_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config file instead of ~/.weft/config.toml
    pub fn with_global_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find weft.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (workspace_root, workspace_config) = self.find_workspace_config(start_dir)?;
        let global_config = self.load_global_config().unwrap_or_default();
        let workspace_config = self.apply_env_overrides(workspace_config)?;

        Ok(Config {
            workspace: workspace_config,
            global: global_config,
            workspace_root,
        })
    }

    /// Load configuration from a specific workspace config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let workspace_config = WorkspaceConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config().unwrap_or_default();
        let workspace_config = self.apply_env_overrides(workspace_config)?;

        let workspace_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            workspace: workspace_config,
            global: global_config,
            workspace_root,
        })
    }

    /// Find workspace configuration by walking up directory tree
    fn find_workspace_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, WorkspaceConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(WORKSPACE_FILE);

            if config_path.exists() {
                let config = WorkspaceConfig::load_from_file(&config_path)?;
                return Ok((Some(current), config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, WorkspaceConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.weft/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        // Global config is optional - if it doesn't exist, return default
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to workspace config
    ///
    /// Recognized: WEFT_PROFILE, WEFT_LINKAGE, WEFT_OUTPUT, WEFT_JOBS
    fn apply_env_overrides(&self, mut config: WorkspaceConfig) -> ConfigResult<WorkspaceConfig> {
        if let Ok(profile) = env::var("WEFT_PROFILE") {
            config.build.get_or_insert_with(BuildSection::default).profile = Some(profile);
        }

        if let Ok(linkage) = env::var("WEFT_LINKAGE") {
            let linkage = linkage.to_lowercase();
            validate_linkage("WEFT_LINKAGE", &linkage)?;
            config.build.get_or_insert_with(BuildSection::default).linkage = Some(linkage);
        }

        if let Ok(jobs) = env::var("WEFT_JOBS") {
            let jobs: usize = jobs.parse().map_err(|_| ConfigError::InvalidValue {
                field: "WEFT_JOBS".to_string(),
                reason: format!("'{}' is not a number", jobs),
            })?;
            validate_jobs("WEFT_JOBS", jobs)?;
            config.build.get_or_insert_with(BuildSection::default).jobs = Some(jobs);
        }

        if let Ok(output) = env::var("WEFT_OUTPUT") {
            config
                .workspace
                .get_or_insert_with(WorkspaceSection::default)
                .output = Some(PathBuf::from(output));
        }

        Ok(config)
    }

    /// Get the global configuration directory (~/.weft)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".weft"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Get the workspace root directory
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    /// Check if a weft.toml was found
    pub fn is_workspace(&self) -> bool {
        self.workspace_root.is_some()
    }

    /// Workspace name, falling back to the root directory name
    pub fn workspace_name(&self) -> String {
        self.workspace
            .name()
            .map(str::to_string)
            .or_else(|| {
                self.workspace_root
                    .as_ref()
                    .and_then(|r| r.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "workspace".to_string())
    }

    /// Effective profile name (workspace > global > "dev")
    pub fn profile(&self) -> &str {
        self.build()
            .and_then(|b| b.profile.as_deref())
            .or_else(|| self.global.default_profile())
            .unwrap_or("dev")
    }

    /// Effective linkage (workspace > global > "dynamic")
    pub fn linkage(&self) -> &str {
        self.build()
            .and_then(|b| b.linkage.as_deref())
            .or_else(|| self.global.default_linkage())
            .unwrap_or("dynamic")
    }

    /// Whether independent per-project work runs on a thread pool
    pub fn parallel(&self) -> bool {
        self.build().and_then(|b| b.parallel).unwrap_or(true)
    }

    /// Worker thread count, if pinned
    pub fn jobs(&self) -> Option<usize> {
        self.build()
            .and_then(|b| b.jobs)
            .or_else(|| self.global.default_jobs())
    }

    /// Absolute module root directories
    pub fn module_roots(&self) -> Vec<PathBuf> {
        self.workspace
            .modules()
            .iter()
            .map(|m| self.resolve(m))
            .collect()
    }

    /// Absolute output directory (default: `<root>/build`)
    pub fn output_dir(&self) -> PathBuf {
        let output = self
            .workspace
            .workspace
            .as_ref()
            .and_then(|w| w.output.clone())
            .unwrap_or_else(|| PathBuf::from("build"));
        self.resolve(&output)
    }

    /// Effective tool locations (workspace over global), resolved against the root
    pub fn tools(&self) -> ToolsConfig {
        let mut tools = self.global.tools.clone().unwrap_or_default();
        if let Some(ws_tools) = &self.workspace.tools {
            let resolved = ToolsConfig {
                assets: ws_tools.assets.as_ref().map(|p| self.resolve(p)),
                reflection: ws_tools.reflection.as_ref().map(|p| self.resolve(p)),
                parser_generator: ws_tools.parser_generator.as_ref().map(|p| self.resolve(p)),
            };
            tools.merge(&resolved);
        }
        tools
    }

    /// Prebuilt library root, resolved against the workspace root
    pub fn prebuilt_libraries(&self) -> Option<PathBuf> {
        self.workspace
            .libraries
            .as_ref()
            .and_then(|l| l.prebuilt.as_ref())
            .map(|p| self.resolve(p))
    }

    /// System library search paths
    pub fn library_search_paths(&self) -> Vec<PathBuf> {
        self.workspace
            .libraries
            .as_ref()
            .map(|l| l.search_paths.iter().map(|p| self.resolve(p)).collect())
            .unwrap_or_default()
    }

    fn build(&self) -> Option<&BuildSection> {
        self.workspace.build.as_ref()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(WORKSPACE_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn isolated_loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::with_global_path(dir.join("no-global.toml"))
    }

    #[test]
    #[serial]
    fn test_load_workspace_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[workspace]
name = "game"
modules = ["engine"]
"#,
        );

        let mut loader = isolated_loader(temp_dir.path());
        let config = loader.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(config.workspace_name(), "game");
        assert!(config.is_workspace());
        assert_eq!(config.module_roots(), vec![temp_dir.path().join("engine")]);
        assert_eq!(config.output_dir(), temp_dir.path().join("build"));
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[workspace]\nname = \"parent\"\n");

        let sub_dir = temp_dir.path().join("engine/core");
        fs::create_dir_all(&sub_dir).unwrap();

        let mut loader = isolated_loader(temp_dir.path());
        let config = loader.load_from_directory(&sub_dir).unwrap();

        assert_eq!(config.workspace_name(), "parent");
        assert_eq!(config.workspace_root(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_no_workspace_config() {
        let temp_dir = TempDir::new().unwrap();

        let mut loader = isolated_loader(temp_dir.path());
        let config = loader.load_from_directory(temp_dir.path()).unwrap();

        assert!(!config.is_workspace());
        assert_eq!(config.profile(), "dev");
        assert_eq!(config.linkage(), "dynamic");
        assert!(config.parallel());
    }

    #[test]
    #[serial]
    fn test_global_defaults_apply_below_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        fs::write(
            &global,
            r#"
[defaults]
profile = "release"
linkage = "static"
jobs = 3

[tools]
reflection = "/opt/reflect"
"#,
        )
        .unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[build]
profile = "dev"

[tools]
assets = "assets"
"#,
        );

        let mut loader = ConfigLoader::with_global_path(&global);
        let config = loader.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(config.profile(), "dev");
        assert_eq!(config.linkage(), "static");
        assert_eq!(config.jobs(), Some(3));
        let tools = config.tools();
        assert_eq!(tools.assets, Some(temp_dir.path().join("assets")));
        assert_eq!(tools.reflection, Some(PathBuf::from("/opt/reflect")));
    }

    #[test]
    #[serial]
    fn test_env_override_profile_and_linkage() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[build]
profile = "dev"
linkage = "dynamic"
"#,
        );

        env::set_var("WEFT_PROFILE", "release");
        env::set_var("WEFT_LINKAGE", "STATIC");

        let mut loader = isolated_loader(temp_dir.path());
        let config = loader.load_from_directory(temp_dir.path()).unwrap();

        env::remove_var("WEFT_PROFILE");
        env::remove_var("WEFT_LINKAGE");

        assert_eq!(config.profile(), "release");
        assert_eq!(config.linkage(), "static");
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_jobs() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "");

        env::set_var("WEFT_JOBS", "many");
        let mut loader = isolated_loader(temp_dir.path());
        let result = loader.load_from_directory(temp_dir.path());
        env::remove_var("WEFT_JOBS");

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_override_output() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[workspace]\noutput = \"out\"\n");

        env::set_var("WEFT_OUTPUT", "/tmp/weft-out");
        let mut loader = isolated_loader(temp_dir.path());
        let config = loader.load_from_directory(temp_dir.path()).unwrap();
        env::remove_var("WEFT_OUTPUT");

        assert_eq!(config.output_dir(), PathBuf::from("/tmp/weft-out"));
    }
}
