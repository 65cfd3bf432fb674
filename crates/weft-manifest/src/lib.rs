//! Weft manifest records
//!
//! Read-only data for modules, projects and external libraries as they come
//! out of `module.toml` files, plus the external library registry the build
//! core resolves library references against.

pub mod library;
pub mod module;
pub mod project;

pub use library::{LibraryOrigin, LibraryRecord, LibraryRegistry, LibrarySource, ResolvedLibrary};
pub use module::{DataMount, ModuleDependency, ModuleRecord};
pub use project::{ProjectFlags, ProjectRecord, ProjectType};

use std::path::PathBuf;

/// Manifest loading errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to parse manifest {path}: {error}")]
    Parse {
        path: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid manifest: {0}")]
    Validation(String),

    #[error("Invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error("Project '{name}' is declared more than once in module '{module}'")]
    DuplicateProject { module: String, name: String },
}

pub type ManifestResult<T> = std::result::Result<T, ManifestError>;
