//! Rendering the solution graph into build descriptions
//!
//! A [`Backend`] receives the finished graph once for the top-level
//! description and once per node. The bundled [`JsonBackend`] writes a
//! machine-readable description that other tools can turn into IDE
//! solutions or build files.

use crate::codegen::execute::write_if_changed;
use crate::error::{BuildError, BuildResult};
use crate::scan::SourceFile;
use crate::solution::{BuildStep, NodeId, SolutionGraph};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use weft_manifest::{ProjectFlags, ProjectType, ResolvedLibrary};

/// Turns a solution graph into a concrete build description
pub trait Backend {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// Emit the top-level description
    fn emit_solution(&mut self, graph: &SolutionGraph) -> BuildResult<()>;

    /// Emit the description of one node
    fn emit_project(&mut self, graph: &SolutionGraph, node: NodeId) -> BuildResult<()>;
}

/// Emit the solution, then every node in build order
pub fn render(backend: &mut dyn Backend, graph: &SolutionGraph) -> BuildResult<()> {
    backend.emit_solution(graph)?;
    for id in graph.ids() {
        backend.emit_project(graph, id)?;
    }
    Ok(())
}

/// File name of the top-level JSON description
pub const SOLUTION_FILE: &str = "solution.json";

/// Writes `solution.json` plus one `projects/<slug>.json` per node
#[derive(Debug, Clone)]
pub struct JsonBackend {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonBackend {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            written: Vec::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Files this backend emitted so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn project_path(&self, slug: &str) -> PathBuf {
        self.output_dir
            .join("projects")
            .join(format!("{}.json", slug))
    }

    fn write(&mut self, path: PathBuf, document: &impl Serialize) -> BuildResult<()> {
        let mut text =
            serde_json::to_string_pretty(document).map_err(|e| BuildError::backend("json", e))?;
        text.push('\n');
        write_if_changed(&path, &text)?;
        debug!(path = %path.display(), "emitted description");
        self.written.push(path);
        Ok(())
    }
}

#[derive(Serialize)]
struct SolutionDocument<'a> {
    name: &'a str,
    projects: Vec<ProjectEntry<'a>>,
    groups: Vec<GroupEntry<'a>>,
}

#[derive(Serialize)]
struct ProjectEntry<'a> {
    name: &'a str,
    id: &'a str,
    kind: ProjectType,
    group: &'a str,
    external: bool,
    file: String,
}

#[derive(Serialize)]
struct GroupEntry<'a> {
    id: &'a str,
    path: &'a str,
    parent: Option<&'a str>,
    children: Vec<&'a str>,
    projects: Vec<&'a str>,
}

#[derive(Serialize)]
struct ProjectDocument<'a> {
    name: &'a str,
    id: &'a str,
    kind: ProjectType,
    module: &'a str,
    external: bool,
    flags: &'a ProjectFlags,
    source_dir: &'a Path,
    include_dirs: Vec<&'a Path>,
    files: &'a [SourceFile],
    defines: BTreeMap<&'a str, &'a str>,
    global_defines: &'a BTreeMap<String, String>,
    libraries: Vec<&'a ResolvedLibrary>,
    direct_dependencies: Vec<&'a str>,
    all_dependencies: Vec<&'a str>,
    link_dependencies: Vec<&'a str>,
    build_steps: &'a [BuildStep],
}

impl Backend for JsonBackend {
    fn name(&self) -> &str {
        "json"
    }

    fn emit_solution(&mut self, graph: &SolutionGraph) -> BuildResult<()> {
        let groups = graph.groups();
        let document = SolutionDocument {
            name: graph.name(),
            projects: graph
                .nodes()
                .iter()
                .map(|node| ProjectEntry {
                    name: &node.name,
                    id: &node.id,
                    kind: node.kind,
                    group: &groups.get(node.group).id,
                    external: node.external,
                    file: format!("projects/{}.json", node.slug()),
                })
                .collect(),
            groups: groups
                .iter()
                .map(|(_, group)| GroupEntry {
                    id: &group.id,
                    path: &group.path,
                    parent: group.parent.map(|p| groups.get(p).id.as_str()),
                    children: group
                        .children
                        .values()
                        .map(|&c| groups.get(c).id.as_str())
                        .collect(),
                    projects: group
                        .nodes
                        .iter()
                        .map(|&n| graph.node(n).name.as_str())
                        .collect(),
                })
                .collect(),
        };

        let path = self.output_dir.join(SOLUTION_FILE);
        self.write(path, &document)
    }

    fn emit_project(&mut self, graph: &SolutionGraph, id: NodeId) -> BuildResult<()> {
        let node = graph.node(id);

        // dependencies' global defines first, the node's own defines win
        let mut defines: BTreeMap<&str, &str> = BTreeMap::new();
        for &dep in &node.all_dependencies {
            for (k, v) in &graph.node(dep).global_defines {
                defines.insert(k, v);
            }
        }
        for (k, v) in node.global_defines.iter().chain(&node.defines) {
            defines.insert(k, v);
        }

        let mut include_dirs: Vec<&Path> = node.include_dirs.iter().map(|p| p.as_path()).collect();
        for &dep in &node.all_dependencies {
            let dir = graph.node(dep).source_dir.as_path();
            if !include_dirs.contains(&dir) {
                include_dirs.push(dir);
            }
        }

        let mut libraries: Vec<&ResolvedLibrary> = node.libraries.iter().collect();
        for &dep in &node.all_dependencies {
            for library in &graph.node(dep).libraries {
                if !libraries.iter().any(|l| l.name == library.name) {
                    libraries.push(library);
                }
            }
        }

        let link_dependencies = if node.flags.detached || node.kind == ProjectType::HeaderLibrary {
            Vec::new()
        } else {
            node.all_dependencies
                .iter()
                .map(|&d| graph.node(d))
                .filter(|d| d.kind.is_binary_library())
                .map(|d| d.name.as_str())
                .collect()
        };

        let document = ProjectDocument {
            name: &node.name,
            id: &node.id,
            kind: node.kind,
            module: &node.module,
            external: node.external,
            flags: &node.flags,
            source_dir: &node.source_dir,
            include_dirs,
            files: &node.files,
            defines,
            global_defines: &node.global_defines,
            libraries,
            direct_dependencies: graph.names(&node.direct_dependencies),
            all_dependencies: graph.names(&node.all_dependencies),
            link_dependencies,
            build_steps: &node.build_steps,
        };

        let path = self.project_path(&node.slug());
        self.write(path, &document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ProjectCollection;
    use crate::profile::BuildConfig;
    use std::fs;
    use tempfile::TempDir;
    use weft_manifest::{ModuleRecord, ProjectRecord};

    fn sample_graph() -> SolutionGraph {
        let mut util = ProjectRecord::new("engine/util", ProjectType::StaticLibrary)
            .with_dependencies(["core"]);
        util.defines.insert("UTIL_LOCAL".into(), "1".into());
        let mut core = ProjectRecord::new("core", ProjectType::StaticLibrary);
        core.global_defines.insert("CORE_ENABLED".into(), "1".into());

        let modules = vec![ModuleRecord::new("main", "/ws/main").with_projects(vec![
            ProjectRecord::new("app", ProjectType::Application).with_dependencies(["engine/util"]),
            util,
            core,
        ])];
        let config = BuildConfig::default();
        let mut collection = ProjectCollection::new(&modules, &config).unwrap();
        collection.resolve_dependencies().unwrap();
        SolutionGraph::build("demo", &collection, false).unwrap()
    }

    #[test]
    fn test_json_backend_writes_every_description() {
        let temp = TempDir::new().unwrap();
        let graph = sample_graph();
        let mut backend = JsonBackend::new(temp.path());
        render(&mut backend, &graph).unwrap();

        assert_eq!(backend.written().len(), 4);
        let solution: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join(SOLUTION_FILE)).unwrap())
                .unwrap();
        let names: Vec<&str> = solution["projects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["core", "engine/util", "app"]);
        assert_eq!(solution["projects"][1]["file"], "projects/engine_util.json");
    }

    #[test]
    fn test_project_document_inherits_global_defines() {
        let temp = TempDir::new().unwrap();
        let graph = sample_graph();
        let mut backend = JsonBackend::new(temp.path());
        let app = graph.find("app").unwrap();
        backend.emit_project(&graph, app).unwrap();

        let doc: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(backend.project_path("app")).unwrap(),
        )
        .unwrap();
        assert_eq!(doc["defines"]["CORE_ENABLED"], "1");
        assert!(doc["defines"].get("UTIL_LOCAL").is_none());
        assert_eq!(
            doc["all_dependencies"],
            serde_json::json!(["core", "engine/util"])
        );
        assert_eq!(
            doc["link_dependencies"],
            serde_json::json!(["core", "engine/util"])
        );
        assert_eq!(doc["kind"], "application");
    }
}
