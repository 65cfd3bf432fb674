//! Code generation decisions
//!
//! For each node of the solution graph, decide which artifacts must be
//! synthesized from its type, flags and the build linkage:
//!
//! | condition                                   | artifact                          |
//! |---------------------------------------------|-----------------------------------|
//! | test application                            | test framework sources + runner   |
//! | reflection flag                             | reflection unit (now or deferred) |
//! | always                                      | glue header                       |
//! | precompiled flag                            | declaration/definition pair       |
//! | application with generate-main, test app    | process entry point               |
//! | grammar files                               | parser source/header pair         |
//!
//! Planning only reads the graph and runs in parallel. [`materialize`]
//! then writes the text artifacts (in parallel), runs the external tools
//! (sequentially, in build order, since a tool may read what an earlier
//! node produced) and merges the generated files back into the nodes.

pub mod aggregation;
pub mod entry_point;
pub mod execute;
pub mod glue;

pub use aggregation::AggregationUnit;
pub use entry_point::{Delegate, EntryPoint, Subsystem};
pub use execute::{materialize, CodegenSummary};
pub use glue::{ApiLinkage, GlueUnit};

use crate::error::{BuildError, BuildResult, NodeFailure};
use crate::profile::Linkage;
use crate::repository::{FileRepository, TEST_FRAMEWORK, TEST_FRAMEWORK_SOURCE};
use crate::scan::FileKind;
use crate::solution::{GraphNode, NodeId, SolutionGraph};
use crate::tools::ToolRunner;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::debug;
use weft_manifest::ProjectType;

/// First line of every generated text file, followed by the project name
pub(crate) const HEADER_BANNER: &str = "// Generated by weft for";

/// Where generated files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLayout {
    root: PathBuf,
}

impl GeneratedLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Shared directory holding every glue header
    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    /// Per-node directory for everything except glue headers
    pub fn node_dir(&self, node: &GraphNode) -> PathBuf {
        self.root.join(&node.name)
    }

    /// `<node dir>/<slug><suffix>`
    pub fn node_file(&self, node: &GraphNode, suffix: &str) -> PathBuf {
        self.node_dir(node).join(format!("{}{}", node.slug(), suffix))
    }

    pub fn glue_header(&self, node: &GraphNode) -> PathBuf {
        self.include_dir().join(Self::glue_header_name(node))
    }

    /// File name dependents include
    pub fn glue_header_name(node: &GraphNode) -> String {
        format!("{}.glue.h", node.slug())
    }
}

/// When reflection data is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionMode {
    /// Run the generator now; static linkage needs the unit at generation time
    Immediate,
    /// Leave a build step for the backend
    Deferred,
}

/// One thing to synthesize for a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Test framework sources added to a test application
    TestFramework { sources: Vec<PathBuf> },
    Reflection {
        mode: ReflectionMode,
        sources: Vec<PathBuf>,
        output: PathBuf,
    },
    Glue(GlueUnit),
    Aggregation(AggregationUnit),
    EntryPoint(EntryPoint),
    Grammar {
        grammar: PathBuf,
        source: PathBuf,
        header: PathBuf,
    },
}

impl Artifact {
    /// Whether producing the artifact runs an external tool
    pub fn runs_tool(&self) -> bool {
        matches!(
            self,
            Self::Grammar { .. }
                | Self::Reflection {
                    mode: ReflectionMode::Immediate,
                    ..
                }
        )
    }
}

/// Every artifact decided for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPlan {
    pub node: NodeId,
    pub artifacts: Vec<Artifact>,
}

/// Inputs shared by every decision
pub struct CodegenContext<'a> {
    pub layout: GeneratedLayout,
    pub linkage: Linkage,
    pub repository: &'a dyn FileRepository,
    pub tools: &'a dyn ToolRunner,
    pub parallel: bool,
}

/// Decide the artifacts of one node
pub fn plan_node(
    graph: &SolutionGraph,
    id: NodeId,
    ctx: &CodegenContext<'_>,
) -> Result<ArtifactPlan, Vec<BuildError>> {
    let node = graph.node(id);
    let mut artifacts = Vec::new();
    let mut errors = Vec::new();

    if node.kind == ProjectType::TestApplication {
        let framework = ctx.repository.file_set(TEST_FRAMEWORK).or_else(|| {
            ctx.repository
                .resolve(TEST_FRAMEWORK_SOURCE)
                .map(|path| vec![path])
        });
        match framework {
            Some(sources) => artifacts.push(Artifact::TestFramework { sources }),
            None => errors.push(BuildError::AssetNotFound {
                name: TEST_FRAMEWORK.to_string(),
            }),
        }
    }

    if node.flags.reflection {
        let sources = node
            .files
            .iter()
            .filter(|f| !f.generated && matches!(f.kind, FileKind::Header | FileKind::Source))
            .map(|f| f.path.clone())
            .collect();
        let mode = match ctx.linkage {
            Linkage::Static => ReflectionMode::Immediate,
            Linkage::Dynamic => ReflectionMode::Deferred,
        };
        artifacts.push(Artifact::Reflection {
            mode,
            sources,
            output: ctx.layout.node_file(node, ".reflection.cpp"),
        });
    }

    artifacts.push(Artifact::Glue(GlueUnit::plan(graph, id, &ctx.layout)));

    if node.flags.precompiled {
        artifacts.push(Artifact::Aggregation(AggregationUnit::plan(
            graph,
            id,
            &ctx.layout,
        )));
    }

    if let Some(entry) = EntryPoint::plan(graph, id, &ctx.layout) {
        artifacts.push(Artifact::EntryPoint(entry));
    }

    for file in node.files.iter().filter(|f| f.kind == FileKind::Grammar) {
        // mirror the grammar's place under the source dir so equal stems stay apart
        let relative = file
            .path
            .strip_prefix(&node.source_dir)
            .unwrap_or(&file.path);
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "grammar".to_string());
        let mut dir = ctx.layout.node_dir(node);
        if let Some(parent) = relative
            .parent()
            .filter(|p| relative.is_relative() && !p.as_os_str().is_empty())
        {
            dir.push(parent);
        }
        artifacts.push(Artifact::Grammar {
            grammar: file.path.clone(),
            source: dir.join(format!("{}.c", stem)),
            header: dir.join(format!("{}.h", stem)),
        });
    }

    if errors.is_empty() {
        debug!(project = %node.name, artifacts = artifacts.len(), "artifacts planned");
        Ok(ArtifactPlan { node: id, artifacts })
    } else {
        Err(errors)
    }
}

/// Plan every node; nodes that fail come back as failures, the rest as plans
pub fn plan_all(
    graph: &SolutionGraph,
    ctx: &CodegenContext<'_>,
) -> (Vec<ArtifactPlan>, Vec<NodeFailure>) {
    let ids: Vec<NodeId> = graph.ids().collect();
    let results: Vec<(NodeId, Result<ArtifactPlan, Vec<BuildError>>)> = if ctx.parallel {
        ids.par_iter()
            .map(|&id| (id, plan_node(graph, id, ctx)))
            .collect()
    } else {
        ids.iter().map(|&id| (id, plan_node(graph, id, ctx))).collect()
    };

    let mut plans = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (id, result) in results {
        match result {
            Ok(plan) => plans.push(plan),
            Err(errors) => failures.push(NodeFailure {
                project: graph.node(id).name.clone(),
                errors,
            }),
        }
    }
    (plans, failures)
}

/// Plan and materialize every node's artifacts
pub fn generate(
    graph: &mut SolutionGraph,
    ctx: &CodegenContext<'_>,
) -> BuildResult<CodegenSummary> {
    let (plans, mut failures) = plan_all(graph, ctx);
    match materialize(graph, &plans, ctx) {
        Ok(summary) if failures.is_empty() => Ok(summary),
        Ok(_) => Err(BuildError::GenerationFailed(failures)),
        Err(BuildError::GenerationFailed(more)) => {
            failures.extend(more);
            Err(BuildError::GenerationFailed(failures))
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ProjectCollection;
    use crate::profile::BuildConfig;
    use crate::scan::SourceFile;
    use crate::tools::{ToolInvocation, ToolOutput};
    use std::collections::HashMap;
    use weft_manifest::{ModuleRecord, ProjectFlags, ProjectRecord};

    struct NoAssets;

    impl FileRepository for NoAssets {
        fn resolve(&self, _name: &str) -> Option<PathBuf> {
            None
        }

        fn file_set(&self, _name: &str) -> Option<Vec<PathBuf>> {
            None
        }
    }

    struct Assets(HashMap<String, Vec<PathBuf>>);

    impl FileRepository for Assets {
        fn resolve(&self, name: &str) -> Option<PathBuf> {
            match self.0.get(name).map(Vec::as_slice) {
                Some([single]) => Some(single.clone()),
                _ => None,
            }
        }

        fn file_set(&self, name: &str) -> Option<Vec<PathBuf>> {
            self.0.get(name).cloned()
        }
    }

    struct NoTools;

    impl ToolRunner for NoTools {
        fn run(&self, invocation: &ToolInvocation) -> BuildResult<ToolOutput> {
            panic!("unexpected tool run: {:?}", invocation)
        }
    }

    fn graph_of(projects: Vec<ProjectRecord>) -> SolutionGraph {
        let modules = vec![ModuleRecord::new("main", "/ws/main").with_projects(projects)];
        let config = BuildConfig::default();
        let mut collection = ProjectCollection::new(&modules, &config).unwrap();
        collection.resolve_dependencies().unwrap();
        SolutionGraph::build("test", &collection, false).unwrap()
    }

    fn ctx<'a>(linkage: Linkage, repository: &'a dyn FileRepository) -> CodegenContext<'a> {
        CodegenContext {
            layout: GeneratedLayout::new("/out/generated"),
            linkage,
            repository,
            tools: &NoTools,
            parallel: false,
        }
    }

    fn kinds(plan: &ArtifactPlan) -> Vec<&'static str> {
        plan.artifacts
            .iter()
            .map(|a| match a {
                Artifact::TestFramework { .. } => "test-framework",
                Artifact::Reflection { .. } => "reflection",
                Artifact::Glue(_) => "glue",
                Artifact::Aggregation(_) => "aggregation",
                Artifact::EntryPoint(_) => "entry-point",
                Artifact::Grammar { .. } => "grammar",
            })
            .collect()
    }

    #[test]
    fn test_library_gets_glue_only() {
        let graph = graph_of(vec![ProjectRecord::new("core", ProjectType::StaticLibrary)]);
        let plan = plan_node(&graph, NodeId::new(0), &ctx(Linkage::Dynamic, &NoAssets)).unwrap();
        assert_eq!(kinds(&plan), vec!["glue"]);
        match &plan.artifacts[0] {
            Artifact::Glue(unit) => {
                assert_eq!(unit.path, PathBuf::from("/out/generated/include/core.glue.h"))
            }
            other => panic!("Expected glue, got {other:?}"),
        }
    }

    #[test]
    fn test_glue_includes_follow_build_order() {
        let graph = graph_of(vec![
            ProjectRecord::new("app", ProjectType::Application).with_dependencies(["util"]),
            ProjectRecord::new("util", ProjectType::StaticLibrary).with_dependencies(["core"]),
            ProjectRecord::new("core", ProjectType::StaticLibrary),
        ]);
        let app = graph.find("app").unwrap();
        let unit = GlueUnit::plan(&graph, app, &GeneratedLayout::new("/gen"));
        assert_eq!(unit.includes, vec!["core.glue.h", "util.glue.h"]);
    }

    #[test]
    fn test_test_application_without_framework_fails() {
        let graph = graph_of(vec![ProjectRecord::new("tests/core", ProjectType::TestApplication)]);
        let errors = plan_node(&graph, NodeId::new(0), &ctx(Linkage::Dynamic, &NoAssets))
            .unwrap_err();
        assert!(matches!(
            &errors[..],
            [BuildError::AssetNotFound { name }] if name == TEST_FRAMEWORK
        ));
    }

    #[test]
    fn test_test_application_plan() {
        let assets = Assets(HashMap::from([(
            TEST_FRAMEWORK.to_string(),
            vec![PathBuf::from("/assets/test-framework/runner.cpp")],
        )]));
        let graph = graph_of(vec![ProjectRecord::new("tests/core", ProjectType::TestApplication)]);
        let plan = plan_node(&graph, NodeId::new(0), &ctx(Linkage::Dynamic, &assets)).unwrap();
        assert_eq!(kinds(&plan), vec!["test-framework", "glue", "entry-point"]);
        match &plan.artifacts[2] {
            Artifact::EntryPoint(entry) => {
                assert_eq!(entry.delegate, Delegate::TestRunner);
                assert_eq!(
                    entry.path,
                    PathBuf::from("/out/generated/tests/core/tests_core.test_main.cpp")
                );
            }
            other => panic!("Expected entry point, got {other:?}"),
        }
    }

    #[test]
    fn test_single_file_test_framework() {
        let assets = Assets(HashMap::from([(
            TEST_FRAMEWORK_SOURCE.to_string(),
            vec![PathBuf::from("/assets/test-framework.cpp")],
        )]));
        let graph = graph_of(vec![ProjectRecord::new("tests/core", ProjectType::TestApplication)]);
        let plan = plan_node(&graph, NodeId::new(0), &ctx(Linkage::Dynamic, &assets)).unwrap();
        match &plan.artifacts[0] {
            Artifact::TestFramework { sources } => {
                assert_eq!(sources, &vec![PathBuf::from("/assets/test-framework.cpp")]);
            }
            other => panic!("Expected test framework, got {other:?}"),
        }
    }

    #[test]
    fn test_grammars_with_equal_stems_get_distinct_outputs() {
        let mut graph = graph_of(vec![ProjectRecord::new("lang", ProjectType::StaticLibrary)]);
        let lang = graph.find("lang").unwrap();
        graph.node_mut(lang).files = vec![
            SourceFile::new("/ws/main/lang/a/expr.y"),
            SourceFile::new("/ws/main/lang/b/expr.y"),
            SourceFile::new("/ws/main/lang/stmt.y"),
        ];

        let plan = plan_node(&graph, lang, &ctx(Linkage::Dynamic, &NoAssets)).unwrap();
        let outputs: Vec<(PathBuf, PathBuf)> = plan
            .artifacts
            .iter()
            .filter_map(|a| match a {
                Artifact::Grammar { source, header, .. } => Some((source.clone(), header.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            outputs,
            vec![
                (
                    PathBuf::from("/out/generated/lang/a/expr.c"),
                    PathBuf::from("/out/generated/lang/a/expr.h"),
                ),
                (
                    PathBuf::from("/out/generated/lang/b/expr.c"),
                    PathBuf::from("/out/generated/lang/b/expr.h"),
                ),
                (
                    PathBuf::from("/out/generated/lang/stmt.c"),
                    PathBuf::from("/out/generated/lang/stmt.h"),
                ),
            ]
        );
    }

    #[test]
    fn test_reflection_mode_follows_linkage() {
        let flags = ProjectFlags {
            reflection: true,
            ..Default::default()
        };
        let graph = graph_of(vec![
            ProjectRecord::new("core/object", ProjectType::StaticLibrary),
            ProjectRecord::new("game", ProjectType::StaticLibrary)
                .with_dependencies(["core/object"])
                .with_flags(flags),
        ]);
        let game = graph.find("game").unwrap();

        let mode_for = |linkage| {
            let plan = plan_node(&graph, game, &ctx(linkage, &NoAssets)).unwrap();
            plan.artifacts.iter().find_map(|a| match a {
                Artifact::Reflection { mode, .. } => Some(*mode),
                _ => None,
            })
        };
        assert_eq!(mode_for(Linkage::Static), Some(ReflectionMode::Immediate));
        assert_eq!(mode_for(Linkage::Dynamic), Some(ReflectionMode::Deferred));
    }

    #[test]
    fn test_reflection_dropped_without_provider() {
        let flags = ProjectFlags {
            reflection: true,
            ..Default::default()
        };
        let graph = graph_of(vec![
            ProjectRecord::new("game", ProjectType::StaticLibrary).with_flags(flags)
        ]);
        let plan = plan_node(&graph, NodeId::new(0), &ctx(Linkage::Static, &NoAssets)).unwrap();
        assert_eq!(kinds(&plan), vec!["glue"]);
    }

    #[test]
    fn test_application_entry_point_and_aggregation() {
        let app_flags = ProjectFlags {
            generate_main: true,
            precompiled: true,
            static_init: true,
            ..Default::default()
        };
        let pch = ProjectFlags {
            precompiled: true,
            ..Default::default()
        };
        let graph = graph_of(vec![
            ProjectRecord::new("core/system", ProjectType::StaticLibrary).with_flags(pch),
            ProjectRecord::new("render", ProjectType::SharedLibrary)
                .with_dependencies(["core/system"])
                .with_flags(pch),
            ProjectRecord::new("app", ProjectType::Application)
                .with_dependencies(["render", "core/system"])
                .with_flags(app_flags)
                .with_entry_class("GameApp"),
        ]);
        let app = graph.find("app").unwrap();
        let plan = plan_node(&graph, app, &ctx(Linkage::Dynamic, &NoAssets)).unwrap();
        assert_eq!(kinds(&plan), vec!["glue", "aggregation", "entry-point"]);

        for artifact in &plan.artifacts {
            match artifact {
                Artifact::Aggregation(unit) => {
                    // render is shared and links its own copy of its closure
                    assert_eq!(unit.dependency_inits, vec!["weft_init_core_system"]);
                    assert_eq!(
                        unit.register_statics.as_deref(),
                        Some("weft_register_statics_app")
                    );
                }
                Artifact::EntryPoint(entry) => {
                    assert_eq!(entry.delegate, Delegate::Class("GameApp".to_string()));
                    assert_eq!(entry.subsystems, vec![Subsystem::System]);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_application_without_generate_main() {
        let graph = graph_of(vec![ProjectRecord::new("tool", ProjectType::Application)]);
        let plan = plan_node(&graph, NodeId::new(0), &ctx(Linkage::Dynamic, &NoAssets)).unwrap();
        assert_eq!(kinds(&plan), vec!["glue"]);
    }

    #[test]
    fn test_plan_all_collects_failures_per_node() {
        let graph = graph_of(vec![
            ProjectRecord::new("core", ProjectType::StaticLibrary),
            ProjectRecord::new("tests/a", ProjectType::TestApplication),
            ProjectRecord::new("tests/b", ProjectType::TestApplication),
        ]);
        let (plans, failures) = plan_all(&graph, &ctx(Linkage::Dynamic, &NoAssets));
        assert_eq!(plans.len(), 1);
        let mut failed: Vec<_> = failures.iter().map(|f| f.project.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["tests/a", "tests/b"]);
    }
}
