/// Build system error types
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use weft_manifest::ProjectType;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Circular dependency detected: {}", format_cycle(.chain))]
    CircularDependency { chain: Vec<String> },

    #[error("Project '{node}' depends on '{dependency}', which is not part of the graph")]
    DanglingReference { node: String, dependency: String },

    #[error("Project '{name}' is declared by both module '{first}' and module '{second}'")]
    DuplicateProject {
        name: String,
        first: String,
        second: String,
    },

    #[error("Unresolved dependencies:{}", format_missing(.0))]
    UnresolvedDependencies(Vec<MissingDependency>),

    #[error("Project '{project}' depends on '{dependency}' ({kind}): dependency target is not linkable")]
    NotLinkable {
        project: String,
        dependency: String,
        kind: ProjectType,
    },

    #[error("Project '{project}' references unknown library '{library}'")]
    UnresolvedLibrary { project: String, library: String },

    #[error("Tool asset '{name}' not found")]
    AssetNotFound { name: String },

    #[error("No {tool} executable configured")]
    ToolNotConfigured { tool: String },

    #[error("{tool} failed for '{project}' (exit code {exit_code}):\n{output}")]
    ToolFailed {
        tool: String,
        project: String,
        exit_code: i32,
        output: String,
    },

    #[error("Failed to run {tool}: {error}")]
    ToolExecutionError { tool: String, error: String },

    #[error("Generation failed for {} project(s):{}", .0.len(), format_failures(.0))]
    GenerationFailed(Vec<NodeFailure>),

    #[error("Backend '{backend}' failed: {error}")]
    Backend { backend: String, error: String },

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Aborted(Diagnostics),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a cycle error from the nodes on the cycle, in traversal order
    pub fn cycle(chain: Vec<String>) -> Self {
        Self::CircularDependency { chain }
    }

    /// Create a backend error
    pub fn backend(backend: impl Into<String>, error: impl ToString) -> Self {
        Self::Backend {
            backend: backend.into(),
            error: error.to_string(),
        }
    }

    /// Whether later pipeline stages cannot run after this error
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CircularDependency { .. }
                | Self::DanglingReference { .. }
                | Self::DuplicateProject { .. }
        )
    }
}

/// A required dependency nobody provides, with every project asking for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingDependency {
    pub dependency: String,
    pub referenced_by: Vec<String>,
}

/// Every error one project hit during code generation
#[derive(Debug)]
pub struct NodeFailure {
    pub project: String,
    pub errors: Vec<BuildError>,
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}: {}", self.project, messages.join("; "))
    }
}

/// Errors accumulated across pipeline stages
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<BuildError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: BuildError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[BuildError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<BuildError> {
        self.errors
    }

    /// Whether any accumulated error stops the pipeline
    pub fn has_structural(&self) -> bool {
        self.errors.iter().any(BuildError::is_structural)
    }

    /// `Ok(())` when nothing was reported
    pub fn into_result(self) -> Result<(), Diagnostics> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<BuildError> for Diagnostics {
    fn from(error: BuildError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no errors"),
            1 => write!(f, "{}", self.errors[0]),
            n => {
                write!(f, "{} errors:", n)?;
                for error in &self.errors {
                    write!(f, "\n  - {}", error.to_string().replace('\n', "\n    "))?;
                }
                Ok(())
            }
        }
    }
}

fn format_cycle(chain: &[String]) -> String {
    match chain.first() {
        Some(first) => format!("{} -> {}", chain.join(" -> "), first),
        None => "empty cycle".to_string(),
    }
}

fn format_missing(missing: &[MissingDependency]) -> String {
    missing
        .iter()
        .map(|m| {
            format!(
                "\n  '{}' required by: {}",
                m.dependency,
                m.referenced_by.join(", ")
            )
        })
        .collect()
}

fn format_failures(failures: &[NodeFailure]) -> String {
    failures.iter().map(|f| format!("\n  {}", f)).collect()
}
