//! Project records (`[[projects]]` entries of a module manifest)

use crate::{ManifestError, ManifestResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Separator between the segments of a hierarchical project name
pub const NAME_SEPARATOR: char = '/';

/// Suffix that turns a dependency reference into a prefix filter
pub const WILDCARD: char = '*';

/// Kind of buildable unit a project describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    /// Declared but never built
    Disabled,
    /// Executable program
    Application,
    /// Executable test program (development builds only)
    TestApplication,
    /// Statically linked library
    StaticLibrary,
    /// Dynamically linked library
    SharedLibrary,
    /// Static or shared depending on the build linkage
    AutoLibrary,
    /// Declarations only, nothing to link
    HeaderLibrary,
}

impl ProjectType {
    /// Whether the type produces an executable
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application | Self::TestApplication)
    }

    /// Whether the type can be named by a wildcard dependency
    pub fn is_binary_library(&self) -> bool {
        matches!(self, Self::StaticLibrary | Self::SharedLibrary)
    }

    /// Whether another project may depend on this type by exact name
    pub fn is_linkable(&self) -> bool {
        matches!(
            self,
            Self::StaticLibrary | Self::SharedLibrary | Self::HeaderLibrary
        )
    }

    /// Short name used in diagnostics and generated output
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Application => "application",
            Self::TestApplication => "test-application",
            Self::StaticLibrary => "static-library",
            Self::SharedLibrary => "shared-library",
            Self::AutoLibrary => "auto-library",
            Self::HeaderLibrary => "header-library",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Boolean generation switches declared by a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectFlags {
    /// Aggregate declarations into a precompiled root pair
    pub precompiled: bool,
    /// Register into the static-initialization chain
    pub static_init: bool,
    /// Compile with exception support
    pub exceptions: bool,
    /// Only part of development builds
    pub dev_only: bool,
    /// Link without pulling in dependencies' link inputs
    pub detached: bool,
    /// Synthesize the process entry point
    pub generate_main: bool,
    /// Project tests the tool's own runtime
    pub self_test: bool,
    /// Entry point targets the windowed subsystem
    pub window_subsystem: bool,
    /// Generate a reflection unit from the project's declarations
    pub reflection: bool,
}

/// A single buildable unit declared inside a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectRecord {
    /// Hierarchical name (`group/sub/name`)
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProjectType,
    /// Required project dependencies
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Soft dependencies, silently skipped when absent
    #[serde(default)]
    pub optional_dependencies: Vec<String>,
    /// External library references
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub flags: ProjectFlags,
    /// Preprocessor definitions visible to this project only
    #[serde(default)]
    pub defines: BTreeMap<String, String>,
    /// Preprocessor definitions propagated to dependents
    #[serde(default)]
    pub global_defines: BTreeMap<String, String>,
    /// Source directory relative to the module root (defaults to the name)
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    /// User class the generated entry point delegates to
    #[serde(default)]
    pub entry_class: Option<String>,
}

impl ProjectRecord {
    /// Create a project with no dependencies and default flags
    pub fn new(name: impl Into<String>, kind: ProjectType) -> Self {
        Self {
            name: name.into(),
            kind,
            dependencies: Vec::new(),
            optional_dependencies: Vec::new(),
            libraries: Vec::new(),
            flags: ProjectFlags::default(),
            defines: BTreeMap::new(),
            global_defines: BTreeMap::new(),
            source_dir: None,
            entry_class: None,
        }
    }

    pub fn with_dependencies<S: Into<String>>(mut self, deps: impl IntoIterator<Item = S>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_optional_dependencies<S: Into<String>>(
        mut self,
        deps: impl IntoIterator<Item = S>,
    ) -> Self {
        self.optional_dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_libraries<S: Into<String>>(mut self, libs: impl IntoIterator<Item = S>) -> Self {
        self.libraries = libs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_flags(mut self, flags: ProjectFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    pub fn with_entry_class(mut self, class: impl Into<String>) -> Self {
        self.entry_class = Some(class.into());
        self
    }

    /// Last segment of the hierarchical name
    pub fn leaf_name(&self) -> &str {
        self.name
            .rsplit(NAME_SEPARATOR)
            .next()
            .unwrap_or(&self.name)
    }

    /// Check the name is a well-formed hierarchical name
    pub fn validate(&self) -> ManifestResult<()> {
        let invalid = |reason: &str| ManifestError::InvalidProjectName {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if self.name.contains(WILDCARD) {
            return Err(invalid("wildcard is only valid in dependency references"));
        }
        if self.name.split(NAME_SEPARATOR).any(str::is_empty) {
            return Err(invalid("empty path segment"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_type_linkable() {
        assert!(ProjectType::StaticLibrary.is_linkable());
        assert!(ProjectType::SharedLibrary.is_linkable());
        assert!(ProjectType::HeaderLibrary.is_linkable());
        assert!(!ProjectType::Application.is_linkable());
        assert!(!ProjectType::AutoLibrary.is_linkable());
        assert!(!ProjectType::Disabled.is_linkable());
    }

    #[test]
    fn test_project_type_binary_library() {
        assert!(ProjectType::StaticLibrary.is_binary_library());
        assert!(!ProjectType::HeaderLibrary.is_binary_library());
    }

    #[test]
    fn test_leaf_name() {
        let project = ProjectRecord::new("engine/render/vulkan", ProjectType::StaticLibrary);
        assert_eq!(project.leaf_name(), "vulkan");

        let project = ProjectRecord::new("core", ProjectType::StaticLibrary);
        assert_eq!(project.leaf_name(), "core");
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(ProjectRecord::new("", ProjectType::Application).validate().is_err());
        assert!(ProjectRecord::new("a//b", ProjectType::Application).validate().is_err());
        assert!(ProjectRecord::new("a/", ProjectType::Application).validate().is_err());
        assert!(ProjectRecord::new("a/*", ProjectType::Application).validate().is_err());
        assert!(ProjectRecord::new("a/b", ProjectType::Application).validate().is_ok());
    }

    #[test]
    fn test_parse_project_table() {
        let toml = r#"
name = "tools/editor"
type = "application"
dependencies = ["core/system", "ui/*"]
optional-dependencies = ["extra/profiler"]
libraries = ["zlib"]
entry-class = "EditorApp"

[flags]
generate-main = true
window-subsystem = true

[defines]
EDITOR = "1"
"#;
        let project: ProjectRecord = toml::from_str(toml).unwrap();
        assert_eq!(project.kind, ProjectType::Application);
        assert_eq!(project.dependencies, vec!["core/system", "ui/*"]);
        assert_eq!(project.optional_dependencies, vec!["extra/profiler"]);
        assert!(project.flags.generate_main);
        assert!(project.flags.window_subsystem);
        assert!(!project.flags.static_init);
        assert_eq!(project.defines.get("EDITOR"), Some(&"1".to_string()));
        assert_eq!(project.entry_class.as_deref(), Some("EditorApp"));
    }
}
