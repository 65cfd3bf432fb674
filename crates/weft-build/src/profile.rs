//! Build profile and linkage selection
//!
//! A generation run is parameterized by a profile (which decides whether
//! development-only and test projects take part) and a linkage (which decides
//! how auto libraries are built and when reflection data is produced).

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use weft_manifest::ProjectType;

/// Build profile
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Development profile (default)
    Dev,
    /// Release profile
    Release,
    /// Custom profile
    Custom(String),
}

impl Profile {
    /// Parse profile from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> BuildResult<Self> {
        match s.to_lowercase().as_str() {
            "" => Err(BuildError::InvalidConfig(
                "profile name cannot be empty".to_string(),
            )),
            "dev" | "debug" => Ok(Self::Dev),
            "release" => Ok(Self::Release),
            custom => Ok(Self::Custom(custom.to_string())),
        }
    }

    /// Get profile name
    pub fn name(&self) -> &str {
        match self {
            Self::Dev => "dev",
            Self::Release => "release",
            Self::Custom(name) => name,
        }
    }

    /// Check if this is a built-in profile
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Dev | Self::Release)
    }

    /// Development builds keep dev-only and test projects
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

#[allow(clippy::derivable_impls)]
impl Default for Profile {
    fn default() -> Self {
        Self::Dev
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How binary libraries end up linked into applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Static,
    #[default]
    Dynamic,
}

impl Linkage {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> BuildResult<Self> {
        match s.to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic" | "shared" => Ok(Self::Dynamic),
            other => Err(BuildError::InvalidConfig(format!(
                "unknown linkage '{}' (expected 'static' or 'dynamic')",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }

    /// Concrete type an auto library takes under this linkage
    pub fn library_kind(&self) -> ProjectType {
        match self {
            Self::Static => ProjectType::StaticLibrary,
            Self::Dynamic => ProjectType::SharedLibrary,
        }
    }
}

impl std::fmt::Display for Linkage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Settings for one generation run
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Selected profile
    pub profile: Profile,
    /// Selected linkage
    pub linkage: Linkage,
    /// Root of everything the run writes
    pub output_dir: PathBuf,
    /// Distribute per-project work across threads
    pub parallel: bool,
    /// Worker thread count (None = one per core)
    pub jobs: Option<usize>,
}

impl BuildConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile: Profile::Dev,
            linkage: Linkage::Dynamic,
            output_dir: output_dir.into(),
            parallel: true,
            jobs: None,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Directory generated sources are written under
    pub fn generated_dir(&self) -> PathBuf {
        self.output_dir.join("generated")
    }

    /// Effective type of a declared project under this configuration
    pub fn effective_kind(&self, declared: ProjectType) -> ProjectType {
        match declared {
            ProjectType::AutoLibrary => self.linkage.library_kind(),
            other => other,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new("build")
    }
}
