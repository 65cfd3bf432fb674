//! Module records (`module.toml`)

use crate::library::LibraryRecord;
use crate::project::ProjectRecord;
use crate::{ManifestError, ManifestResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File name of a module manifest inside its root directory
pub const MODULE_MANIFEST: &str = "module.toml";

/// A versioned collection of projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleRecord {
    /// Stable module id
    pub id: String,
    /// Directory the manifest was loaded from
    #[serde(skip)]
    pub root: PathBuf,
    /// Whether the module lives in the workspace (false: fetched from elsewhere)
    #[serde(default = "default_local")]
    pub local: bool,
    #[serde(default)]
    pub dependencies: Vec<ModuleDependency>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    /// External libraries this module declares
    #[serde(default)]
    pub libraries: Vec<LibraryRecord>,
    #[serde(default)]
    pub mounts: Vec<DataMount>,
}

fn default_local() -> bool {
    true
}

/// Dependency of one module on another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleDependency {
    /// Remote repository at a branch
    Remote { git: String, branch: String },
    /// Path relative to the depending module's root
    Local { path: PathBuf },
}

/// Data directory exposed by a module under a mount name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMount {
    pub name: String,
    pub path: PathBuf,
}

impl ModuleRecord {
    /// Create an empty local module
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            local: true,
            dependencies: Vec::new(),
            projects: Vec::new(),
            libraries: Vec::new(),
            mounts: Vec::new(),
        }
    }

    /// Mark the module as fetched rather than part of the workspace
    pub fn fetched(mut self) -> Self {
        self.local = false;
        self
    }

    pub fn with_projects(mut self, projects: Vec<ProjectRecord>) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_libraries(mut self, libraries: Vec<LibraryRecord>) -> Self {
        self.libraries = libraries;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<ModuleDependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Parse a module manifest; `root` becomes the module's filesystem root
    pub fn from_str(content: &str, root: impl Into<PathBuf>) -> ManifestResult<Self> {
        let root = root.into();
        let mut module: Self = toml::from_str(content).map_err(|error| ManifestError::Parse {
            path: root.join(MODULE_MANIFEST),
            error,
        })?;
        module.root = root;
        module.validate()?;
        Ok(module)
    }

    /// Load `module.toml` from a module root directory
    pub fn from_dir(root: &Path) -> ManifestResult<Self> {
        let path = root.join(MODULE_MANIFEST);
        let content = std::fs::read_to_string(&path).map_err(|error| ManifestError::Io {
            path: path.clone(),
            error,
        })?;
        Self::from_str(&content, root)
    }

    /// Validate ids and project names
    pub fn validate(&self) -> ManifestResult<()> {
        if self.id.is_empty() {
            return Err(ManifestError::Validation(format!(
                "module at {} has an empty id",
                self.root.display()
            )));
        }

        let mut seen = HashSet::new();
        for project in &self.projects {
            project.validate()?;
            if !seen.insert(project.name.as_str()) {
                return Err(ManifestError::DuplicateProject {
                    module: self.id.clone(),
                    name: project.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Absolute path of a data mount, if the module exposes it
    pub fn mount_path(&self, name: &str) -> Option<PathBuf> {
        self.mounts
            .iter()
            .find(|m| m.name == name)
            .map(|m| self.root.join(&m.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProjectType;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
id = "engine"

[[dependencies]]
git = "https://example.com/thirdparty.git"
branch = "main"

[[dependencies]]
path = "../shared"

[[mounts]]
name = "content"
path = "data"

[[projects]]
name = "core/system"
type = "static-library"

[[projects]]
name = "core/object"
type = "static-library"
dependencies = ["core/system"]

[[libraries]]
name = "zlib"
link-libs = ["z"]
"#;

    #[test]
    fn test_parse_module() {
        let module = ModuleRecord::from_str(MANIFEST, "/work/engine").unwrap();
        assert_eq!(module.id, "engine");
        assert!(module.local);
        assert_eq!(module.root, PathBuf::from("/work/engine"));
        assert_eq!(module.projects.len(), 2);
        assert_eq!(module.projects[1].kind, ProjectType::StaticLibrary);
        assert_eq!(module.libraries[0].link_libs, vec!["z".to_string()]);
        assert_eq!(
            module.dependencies,
            vec![
                ModuleDependency::Remote {
                    git: "https://example.com/thirdparty.git".to_string(),
                    branch: "main".to_string(),
                },
                ModuleDependency::Local {
                    path: PathBuf::from("../shared"),
                },
            ]
        );
        assert_eq!(
            module.mount_path("content"),
            Some(PathBuf::from("/work/engine/data"))
        );
        assert_eq!(module.mount_path("missing"), None);
    }

    #[test]
    fn test_duplicate_project_rejected() {
        let toml = r#"
id = "dup"

[[projects]]
name = "a"
type = "application"

[[projects]]
name = "a"
type = "static-library"
"#;
        let err = ModuleRecord::from_str(toml, "/work/dup").unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateProject { .. }));
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = ModuleRecord::from_str("id = ", "/work/bad").unwrap_err();
        assert!(err.to_string().contains("module.toml"));
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODULE_MANIFEST), MANIFEST).unwrap();
        let module = ModuleRecord::from_dir(dir.path()).unwrap();
        assert_eq!(module.root, dir.path());
    }

    #[test]
    fn test_from_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModuleRecord::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }
}
