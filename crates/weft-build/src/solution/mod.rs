//! Generation graph
//!
//! The [`SolutionGraph`] is what backends render: one [`GraphNode`] per
//! surviving project, stored in build order, each carrying its direct
//! dependencies, its complete ordered dependency closure, its final
//! generation flags and the group it is filed under.
//!
//! Construction happens in one pass:
//! 1. provisional nodes are created and wired from the resolved collection
//! 2. the whole-graph build order is computed (cycles are rejected here)
//! 3. nodes are stored in that order
//! 4. each node's closure is computed, in parallel when enabled
//! 5. flags that need a runtime provider are dropped where it is absent
//! 6. nodes are filed into groups
//!
//! After construction the graph is only read, except for the generated
//! files and build steps the code generation stage merges back in.

pub mod group;

use crate::build_order::{build_order, transitive_dependencies, DependencyGraph};
use crate::collection::{ProjectCollection, ResolvedProject};
use crate::error::{BuildError, BuildResult};
use crate::identity::project_guid;
use crate::scan::SourceFile;
use group::{GroupId, GroupTree};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};
use weft_manifest::{ProjectFlags, ProjectType, ResolvedLibrary};

/// Project providing the object model reflection data registers with
pub const OBJECT_RUNTIME: &str = "core/object";

/// Project providing the static initialization chain
pub const SYSTEM_RUNTIME: &str = "core/system";

/// Index of a node; nodes are stored in build order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Work a backend must schedule before compiling a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum BuildStep {
    /// Run the reflection generator over `sources`, producing `output`
    Reflection {
        sources: Vec<PathBuf>,
        output: PathBuf,
    },
}

/// One project in the generation graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub name: String,
    /// Stable GUID derived from the name
    pub id: String,
    /// Effective type
    pub kind: ProjectType,
    /// Final generation flags
    pub flags: ProjectFlags,
    /// Project comes from a fetched module
    pub external: bool,
    /// Id of the declaring module
    pub module: String,
    pub source_dir: PathBuf,
    /// Directories the node's sources are compiled with on the include path
    pub include_dirs: Vec<PathBuf>,
    pub files: Vec<SourceFile>,
    pub public_header: Option<PathBuf>,
    pub libraries: Vec<ResolvedLibrary>,
    pub defines: BTreeMap<String, String>,
    pub global_defines: BTreeMap<String, String>,
    pub entry_class: Option<String>,
    pub direct_dependencies: Vec<NodeId>,
    /// Complete closure, dependencies first
    pub all_dependencies: Vec<NodeId>,
    pub group: GroupId,
    pub build_steps: Vec<BuildStep>,
}

impl GraphNode {
    fn from_project(project: &ResolvedProject<'_>, local_root: GroupId) -> Self {
        let record = project.record();
        Self {
            name: record.name.clone(),
            id: project_guid(&record.name),
            kind: project.kind(),
            flags: record.flags,
            external: project.is_external(),
            module: project.module().id.clone(),
            source_dir: project.source_dir().clone(),
            include_dirs: vec![project.source_dir().clone()],
            files: project.files().to_vec(),
            public_header: project.public_header().cloned(),
            libraries: project.libraries().to_vec(),
            defines: record.defines.clone(),
            global_defines: record.global_defines.clone(),
            entry_class: record.entry_class.clone(),
            direct_dependencies: Vec::new(),
            all_dependencies: Vec::new(),
            group: local_root,
            build_steps: Vec::new(),
        }
    }

    /// Name usable in file names (`engine/render` -> `engine_render`)
    pub fn slug(&self) -> String {
        self.name.replace(weft_manifest::project::NAME_SEPARATOR, "_")
    }

    /// Identifier-safe lower-case form of the name
    pub fn symbol(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Identifier-safe upper-case form of the name
    pub fn macro_prefix(&self) -> String {
        self.symbol().to_ascii_uppercase()
    }

    /// Macro that marks the node's exported declarations
    pub fn api_macro(&self) -> String {
        format!("{}_API", self.macro_prefix())
    }

    /// Define set while compiling a shared library so its API exports
    pub fn exports_define(&self) -> Option<String> {
        (self.kind == ProjectType::SharedLibrary).then(|| format!("{}_EXPORTS", self.macro_prefix()))
    }
}

/// Build-ordered graph of every project taking part in generation
#[derive(Debug, Clone, Serialize)]
pub struct SolutionGraph {
    name: String,
    nodes: Vec<GraphNode>,
    #[serde(skip)]
    index: HashMap<String, NodeId>,
    groups: GroupTree,
}

impl SolutionGraph {
    /// Build the graph from a resolved and filtered collection
    pub fn build(
        name: impl Into<String>,
        collection: &ProjectCollection<'_>,
        parallel: bool,
    ) -> BuildResult<Self> {
        let groups = GroupTree::new();
        let local_root = groups.local_root();

        let mut slots: Vec<Option<NodeId>> = Vec::with_capacity(collection.len());
        let mut nodes = Vec::with_capacity(collection.len());
        for project in collection.projects() {
            if project.kind() == ProjectType::Disabled {
                slots.push(None);
                continue;
            }
            slots.push(Some(NodeId(nodes.len())));
            nodes.push(GraphNode::from_project(project, local_root));
        }

        for (project, slot) in collection.projects().iter().zip(&slots) {
            let Some(node) = slot else { continue };
            let mut direct = Vec::with_capacity(project.dependencies().len());
            for dependency in project.dependencies() {
                match slots.get(dependency.index()).copied().flatten() {
                    Some(target) => direct.push(target),
                    None => {
                        return Err(BuildError::DanglingReference {
                            node: project.name().to_string(),
                            dependency: collection.project(*dependency).name().to_string(),
                        })
                    }
                }
            }
            nodes[node.0].direct_dependencies = direct;
        }

        let mut graph = Self {
            name: name.into(),
            nodes,
            index: HashMap::new(),
            groups,
        };
        graph.reindex();

        let mut roots: Vec<NodeId> = graph.ids().collect();
        roots.sort_by(|a, b| graph.nodes[a.0].name.cmp(&graph.nodes[b.0].name));
        let order = build_order(&graph, roots)?;
        graph.permute(&order);

        graph.compute_closures(parallel)?;
        graph.propagate_flags();
        graph.assign_groups();

        info!(nodes = graph.len(), "solution graph built");
        Ok(graph)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in build order
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut GraphNode {
        &mut self.nodes[id.0]
    }

    /// Node ids in build order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&GraphNode> {
        self.find(name).map(|id| self.node(id))
    }

    pub fn groups(&self) -> &GroupTree {
        &self.groups
    }

    /// Node names in build order
    pub fn build_order(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Names of a list of nodes
    pub fn names(&self, ids: &[NodeId]) -> Vec<&str> {
        ids.iter().map(|&id| self.nodes[id.0].name.as_str()).collect()
    }

    /// Whether the project called `name` is in `id`'s transitive closure
    ///
    /// A node is never in its own closure, so a provider does not satisfy
    /// itself.
    pub fn depends_on(&self, id: NodeId, name: &str) -> bool {
        self.find(name)
            .is_some_and(|provider| self.nodes[id.0].all_dependencies.contains(&provider))
    }

    /// Nodes statically linked into `id`'s binary, dependencies first, `id` last
    ///
    /// The walk follows direct dependencies and stops at shared libraries,
    /// which bring their own closure at run time.
    pub fn static_link_closure(&self, id: NodeId) -> Vec<NodeId> {
        let mut reached = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for &dependency in &self.nodes[current.0].direct_dependencies {
                if self.nodes[dependency.0].kind == ProjectType::SharedLibrary {
                    continue;
                }
                if reached.insert(dependency) {
                    stack.push(dependency);
                }
            }
        }

        let mut closure: Vec<NodeId> = self.nodes[id.0]
            .all_dependencies
            .iter()
            .copied()
            .filter(|d| reached.contains(d))
            .collect();
        closure.push(id);
        closure
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), NodeId(i)))
            .collect();
    }

    /// Store nodes in `order` and rewrite every reference
    fn permute(&mut self, order: &[NodeId]) {
        let mut remap = vec![NodeId(0); self.nodes.len()];
        for (position, old) in order.iter().enumerate() {
            remap[old.0] = NodeId(position);
        }

        let mut old: Vec<Option<GraphNode>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        self.nodes = order.iter().filter_map(|id| old[id.0].take()).collect();

        for node in &mut self.nodes {
            for dependency in &mut node.direct_dependencies {
                *dependency = remap[dependency.0];
            }
        }
        self.reindex();
    }

    fn compute_closures(&mut self, parallel: bool) -> BuildResult<()> {
        let graph: &Self = self;
        let closures: Vec<Vec<NodeId>> = if parallel {
            (0..graph.len())
                .into_par_iter()
                .map(|i| transitive_dependencies(graph, NodeId(i)))
                .collect::<BuildResult<_>>()?
        } else {
            (0..graph.len())
                .map(|i| transitive_dependencies(graph, NodeId(i)))
                .collect::<BuildResult<_>>()?
        };

        for (node, closure) in self.nodes.iter_mut().zip(closures) {
            node.all_dependencies = closure;
        }
        Ok(())
    }

    /// Drop reflection and static-init where their runtime provider is absent
    fn propagate_flags(&mut self) {
        let mut changes = Vec::new();
        for id in self.ids() {
            let flags = self.nodes[id.0].flags;
            let reflection = flags.reflection && self.depends_on(id, OBJECT_RUNTIME);
            let static_init = flags.static_init && self.depends_on(id, SYSTEM_RUNTIME);
            if reflection != flags.reflection || static_init != flags.static_init {
                changes.push((id, reflection, static_init));
            }
        }

        for (id, reflection, static_init) in changes {
            let node = &mut self.nodes[id.0];
            debug!(
                project = %node.name,
                reflection, static_init, "generation flags downgraded"
            );
            node.flags.reflection = reflection;
            node.flags.static_init = static_init;
        }
    }

    fn assign_groups(&mut self) {
        for i in 0..self.nodes.len() {
            let node = &self.nodes[i];
            let group = self.groups.insert(&node.name, node.external, NodeId(i));
            self.nodes[i].group = group;
        }
    }
}

impl DependencyGraph for SolutionGraph {
    type Node = NodeId;

    fn dependencies(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].direct_dependencies
    }

    fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }
}
