//! Generation pipeline
//!
//! Drives a run from module records to rendered build descriptions:
//!
//! 1. bind projects, scan their files, resolve dependencies and libraries
//! 2. drop projects that do not take part in the selected profile
//! 3. build the solution graph
//! 4. plan every node's artifacts
//! 5. write artifacts, run tools and merge generated files into the graph
//! 6. hand the graph to the backend
//!
//! Problems found in the first stages are collected rather than returned
//! straight away, so one run reports everything wrong with a workspace.
//! Only a structural error (such as a dependency cycle) stops the stages
//! early, and nothing is written or rendered while any error is pending.

use crate::backend::{self, Backend};
use crate::codegen::{self, CodegenContext, CodegenSummary, GeneratedLayout};
use crate::collection::ProjectCollection;
use crate::error::{BuildError, BuildResult, Diagnostics};
use crate::profile::BuildConfig;
use crate::repository::FileRepository;
use crate::solution::SolutionGraph;
use crate::tools::ToolRunner;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn};
use weft_manifest::{LibraryRegistry, ModuleRecord};

/// Build statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    /// Projects declared across all modules
    pub total_projects: usize,
    /// Projects dropped by the profile filter
    pub filtered_projects: usize,
    /// Nodes in the solution graph
    pub graph_nodes: usize,
    /// Time spent binding and resolving projects
    pub resolve_time: Duration,
    /// Time spent building the graph
    pub graph_time: Duration,
    /// Time spent planning and producing artifacts
    pub codegen_time: Duration,
    /// Time spent in the backend
    pub render_time: Duration,
    /// Total run time
    pub total_time: Duration,
}

/// Outcome of the resolution and graph stages
#[derive(Debug)]
pub struct Analysis {
    /// Present unless a structural error stopped the stages
    pub graph: Option<SolutionGraph>,
    pub diagnostics: Diagnostics,
    pub stats: BuildStats,
}

impl Analysis {
    /// The graph, if it was built without any error
    pub fn into_graph(self) -> BuildResult<SolutionGraph> {
        match self.graph {
            Some(graph) if self.diagnostics.is_empty() => Ok(graph),
            _ => Err(BuildError::Aborted(self.diagnostics)),
        }
    }
}

/// Result of a successful generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub stats: BuildStats,
    pub codegen: CodegenSummary,
    /// Node names in build order
    pub build_order: Vec<String>,
}

/// Main driver for generation runs
pub struct Builder<'a> {
    /// Name of the top-level build description
    name: String,
    config: BuildConfig,
    registry: &'a LibraryRegistry,
    repository: &'a dyn FileRepository,
    tools: &'a dyn ToolRunner,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> Builder<'a> {
    /// Create a builder; a fixed job count gets its own worker pool
    pub fn new(
        config: BuildConfig,
        registry: &'a LibraryRegistry,
        repository: &'a dyn FileRepository,
        tools: &'a dyn ToolRunner,
    ) -> BuildResult<Self> {
        let pool = match config.jobs {
            Some(jobs) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build()
                    .map_err(|e| BuildError::InvalidConfig(e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            name: "workspace".to_string(),
            config,
            registry,
            repository,
            tools,
            pool,
        })
    }

    /// Set the name of the top-level build description
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run `op` on the configured worker pool
    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn codegen_context(&self) -> CodegenContext<'a> {
        CodegenContext {
            layout: GeneratedLayout::new(self.config.generated_dir()),
            linkage: self.config.linkage,
            repository: self.repository,
            tools: self.tools,
            parallel: self.config.parallel,
        }
    }

    /// Resolve, filter and build the graph, collecting every error
    pub fn analyze(&self, modules: &[ModuleRecord]) -> Analysis {
        let _span = info_span!("analyze", workspace = %self.name).entered();
        let mut stats = BuildStats::default();
        let mut diagnostics = Diagnostics::new();
        let parallel = self.config.parallel;

        let resolve_start = Instant::now();
        let mut collection = match ProjectCollection::new(modules, &self.config) {
            Ok(collection) => collection,
            Err(errors) => {
                return Analysis {
                    graph: None,
                    diagnostics: errors,
                    stats,
                }
            }
        };
        stats.total_projects = collection.len();

        self.install(|| collection.scan_files(parallel));
        if let Err(errors) = collection.resolve_dependencies() {
            diagnostics.extend(errors);
        }
        if let Err(errors) = collection.resolve_libraries(self.registry) {
            diagnostics.extend(errors);
        }
        stats.filtered_projects = collection.filter_projects(&self.config);
        stats.resolve_time = resolve_start.elapsed();

        let graph_start = Instant::now();
        let name = self.name.as_str();
        let graph = match self.install(|| SolutionGraph::build(name, &collection, parallel)) {
            Ok(graph) => {
                stats.graph_nodes = graph.len();
                Some(graph)
            }
            Err(err) => {
                diagnostics.push(err);
                None
            }
        };
        stats.graph_time = graph_start.elapsed();

        if !diagnostics.is_empty() {
            warn!(errors = diagnostics.len(), "analysis reported errors");
        }
        Analysis {
            graph,
            diagnostics,
            stats,
        }
    }

    /// Analyze and plan without writing anything
    ///
    /// Returns the graph when the workspace would generate cleanly.
    pub fn check(&self, modules: &[ModuleRecord]) -> BuildResult<SolutionGraph> {
        let Analysis {
            graph,
            mut diagnostics,
            ..
        } = self.analyze(modules);

        let Some(graph) = graph else {
            return Err(BuildError::Aborted(diagnostics));
        };

        let ctx = self.codegen_context();
        let (_, failures) = self.install(|| codegen::plan_all(&graph, &ctx));
        if !failures.is_empty() {
            diagnostics.push(BuildError::GenerationFailed(failures));
        }

        diagnostics.into_result().map_err(BuildError::Aborted)?;
        Ok(graph)
    }

    /// Run every stage and render through `backend`
    pub fn generate(
        &self,
        modules: &[ModuleRecord],
        backend: &mut dyn Backend,
    ) -> BuildResult<GenerationReport> {
        let start = Instant::now();
        let Analysis {
            graph,
            mut diagnostics,
            mut stats,
        } = self.analyze(modules);

        let Some(mut graph) = graph else {
            return Err(BuildError::Aborted(diagnostics));
        };

        let codegen_start = Instant::now();
        let ctx = self.codegen_context();
        let (plans, failures) = {
            let _span = info_span!("plan").entered();
            self.install(|| codegen::plan_all(&graph, &ctx))
        };
        if !failures.is_empty() {
            diagnostics.push(BuildError::GenerationFailed(failures));
        }
        diagnostics.into_result().map_err(BuildError::Aborted)?;

        let summary = {
            let _span = info_span!("materialize").entered();
            self.install(|| codegen::materialize(&mut graph, &plans, &ctx))
                .map_err(|e| BuildError::Aborted(e.into()))?
        };
        stats.codegen_time = codegen_start.elapsed();

        let render_start = Instant::now();
        {
            let _span = info_span!("render", backend = backend.name()).entered();
            backend::render(backend, &graph)?;
        }
        stats.render_time = render_start.elapsed();
        stats.total_time = start.elapsed();

        info!(
            projects = graph.len(),
            elapsed_ms = stats.total_time.as_millis() as u64,
            "generation finished"
        );

        Ok(GenerationReport {
            stats,
            codegen: summary,
            build_order: graph.build_order().into_iter().map(String::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::JsonBackend;
    use crate::repository::DirectoryRepository;
    use crate::tools::ProcessToolRunner;
    use tempfile::TempDir;
    use weft_manifest::{ProjectRecord, ProjectType};

    #[test]
    fn test_cycle_stops_before_rendering() {
        let temp = TempDir::new().unwrap();
        let modules = vec![ModuleRecord::new("main", temp.path()).with_projects(vec![
            ProjectRecord::new("a", ProjectType::StaticLibrary).with_dependencies(["b"]),
            ProjectRecord::new("b", ProjectType::StaticLibrary).with_dependencies(["a"]),
        ])];
        let registry = LibraryRegistry::new();
        let repository = DirectoryRepository::new(temp.path().join("assets"));
        let tools = ProcessToolRunner::new();
        let out = temp.path().join("out");

        let builder =
            Builder::new(BuildConfig::new(&out), &registry, &repository, &tools).unwrap();
        let mut backend = JsonBackend::new(&out);
        match builder.generate(&modules, &mut backend) {
            Err(BuildError::Aborted(diagnostics)) => assert!(diagnostics.has_structural()),
            other => panic!("Expected Aborted, got {other:?}"),
        }
        assert!(backend.written().is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_fixed_job_count() {
        let registry = LibraryRegistry::new();
        let repository = DirectoryRepository::new("assets");
        let tools = ProcessToolRunner::new();
        let builder = Builder::new(
            BuildConfig::default().with_jobs(2),
            &registry,
            &repository,
            &tools,
        )
        .unwrap();
        assert_eq!(builder.install(rayon::current_num_threads), 2);
    }
}
