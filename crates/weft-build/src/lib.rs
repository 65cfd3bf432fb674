//! Weft build graph infrastructure
//!
//! Turns a set of module records into a fully resolved solution graph and
//! decides which files must be synthesized for every project:
//! - Project collection and reference resolution (wildcards, optional refs)
//! - Deterministic dependency ordering with cycle detection
//! - Solution graph with transitive closures, flag propagation and groups
//! - Code generation planning and materialization
//! - Rendering through pluggable backends

pub mod backend;
pub mod build_order;
pub mod builder;
pub mod codegen;
pub mod collection;
pub mod error;
pub mod identity;
pub mod profile;
pub mod repository;
pub mod scan;
pub mod solution;
pub mod tools;

// Re-export main types
pub use backend::{Backend, JsonBackend};
pub use build_order::{build_order, transitive_dependencies, DependencyGraph, OrderedGraphBuilder};
pub use builder::{Analysis, BuildStats, Builder, GenerationReport};
pub use codegen::{Artifact, ArtifactPlan, CodegenContext, CodegenSummary, GeneratedLayout};
pub use collection::{ProjectCollection, ProjectId, ResolvedProject};
pub use error::{BuildError, BuildResult, Diagnostics, MissingDependency, NodeFailure};
pub use profile::{BuildConfig, Linkage, Profile};
pub use repository::{DirectoryRepository, FileRepository, TEST_FRAMEWORK, TEST_FRAMEWORK_SOURCE};
pub use scan::{FileKind, SourceFile};
pub use solution::group::{Group, GroupId, GroupTree};
pub use solution::{BuildStep, GraphNode, NodeId, SolutionGraph, OBJECT_RUNTIME, SYSTEM_RUNTIME};
pub use tools::{ProcessToolRunner, ToolInvocation, ToolKind, ToolOutput, ToolRunner};

// Re-export manifest types for convenience
pub use weft_manifest::{LibraryRegistry, ModuleRecord, ProjectFlags, ProjectRecord, ProjectType};
