//! Build order computation by depth-ordered insertion
//!
//! Every node inserted into an [`OrderedGraphBuilder`] is assigned the
//! greatest depth at which it is reachable from the inserted roots. Sorting
//! by depth (deepest first) then by name gives an order in which each node
//! comes after everything it depends on, and which is the same on every run
//! regardless of the order nodes were inserted.
//!
//! The active traversal path is kept while descending, so a node reached
//! again through its own dependencies is reported as a cycle together with
//! the nodes that form it.

use crate::error::{BuildError, BuildResult};
use std::collections::HashMap;
use std::hash::Hash;

/// Read access to a dependency graph
pub trait DependencyGraph {
    type Node: Copy + Eq + Hash;

    /// Direct dependencies of `node`
    fn dependencies(&self, node: Self::Node) -> &[Self::Node];

    /// Name used for ordering ties and diagnostics
    fn name(&self, node: Self::Node) -> &str;
}

/// One step of the active traversal path, linked to the step before it
struct PathLink<'a, N> {
    node: N,
    parent: Option<&'a PathLink<'a, N>>,
}

impl<'a, N: Copy + Eq> PathLink<'a, N> {
    fn contains(&self, node: N) -> bool {
        let mut link = Some(self);
        while let Some(current) = link {
            if current.node == node {
                return true;
            }
            link = current.parent;
        }
        false
    }

    /// Nodes from the first occurrence of `node` down to this step
    fn cycle_from(&self, node: N) -> Vec<N> {
        let mut chain = Vec::new();
        let mut link = Some(self);
        while let Some(current) = link {
            chain.push(current.node);
            if current.node == node {
                break;
            }
            link = current.parent;
        }
        chain.reverse();
        chain
    }
}

/// Accumulates nodes with their maximal depth
pub struct OrderedGraphBuilder<'g, G: DependencyGraph> {
    graph: &'g G,
    depths: HashMap<G::Node, usize>,
}

impl<'g, G: DependencyGraph> OrderedGraphBuilder<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self {
            graph,
            depths: HashMap::new(),
        }
    }

    /// Insert `node` and everything it reaches, starting at `depth`
    ///
    /// A node already recorded at the same or a greater depth is left alone
    /// together with its dependencies.
    pub fn insert(&mut self, node: G::Node, depth: usize) -> BuildResult<()> {
        self.insert_at(node, depth, None)
    }

    fn insert_at(
        &mut self,
        node: G::Node,
        depth: usize,
        path: Option<&PathLink<'_, G::Node>>,
    ) -> BuildResult<()> {
        if let Some(path) = path {
            if path.contains(node) {
                let graph = self.graph;
                let chain = path
                    .cycle_from(node)
                    .into_iter()
                    .map(|n| graph.name(n).to_string())
                    .collect();
                return Err(BuildError::cycle(chain));
            }
        }

        let recorded = self.depths.entry(node).or_insert(0);
        if depth <= *recorded {
            return Ok(());
        }
        *recorded = depth;

        let graph = self.graph;
        let link = PathLink { node, parent: path };
        for &dependency in graph.dependencies(node) {
            self.insert_at(dependency, depth + 1, Some(&link))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Recorded depth of `node`
    pub fn depth(&self, node: G::Node) -> Option<usize> {
        self.depths.get(&node).copied()
    }

    /// Nodes with their depth, deepest first, ties broken by name
    pub fn extract_order(&self) -> Vec<(G::Node, usize)> {
        let graph = self.graph;
        let mut order: Vec<(G::Node, usize)> =
            self.depths.iter().map(|(&n, &d)| (n, d)).collect();
        order.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| graph.name(a.0).cmp(graph.name(b.0)))
        });
        order
    }

    /// Nodes only, in extraction order
    pub fn into_order(self) -> Vec<G::Node> {
        self.extract_order().into_iter().map(|(n, _)| n).collect()
    }
}

/// Everything `node` depends on, directly or not, dependencies first
///
/// `node` itself is not part of the result unless it sits on a cycle, in
/// which case the cycle is reported instead.
pub fn transitive_dependencies<G: DependencyGraph>(
    graph: &G,
    node: G::Node,
) -> BuildResult<Vec<G::Node>> {
    let mut builder = OrderedGraphBuilder::new(graph);
    let root = PathLink { node, parent: None };
    for &dependency in graph.dependencies(node) {
        builder.insert_at(dependency, 1, Some(&root))?;
    }
    Ok(builder.into_order())
}

/// Every node of `nodes` plus what they reach, dependencies first
pub fn build_order<G: DependencyGraph>(
    graph: &G,
    nodes: impl IntoIterator<Item = G::Node>,
) -> BuildResult<Vec<G::Node>> {
    let mut builder = OrderedGraphBuilder::new(graph);
    for node in nodes {
        builder.insert(node, 1)?;
    }
    Ok(builder.into_order())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Adjacency list keyed by position
    struct TestGraph {
        names: Vec<&'static str>,
        edges: Vec<Vec<usize>>,
    }

    impl TestGraph {
        fn new(edges: &[(&'static str, &[usize])]) -> Self {
            Self {
                names: edges.iter().map(|(n, _)| *n).collect(),
                edges: edges.iter().map(|(_, e)| e.to_vec()).collect(),
            }
        }

        fn names(&self, order: &[usize]) -> Vec<&'static str> {
            order.iter().map(|&i| self.names[i]).collect()
        }
    }

    impl DependencyGraph for TestGraph {
        type Node = usize;

        fn dependencies(&self, node: usize) -> &[usize] {
            &self.edges[node]
        }

        fn name(&self, node: usize) -> &str {
            self.names[node]
        }
    }

    #[test]
    fn test_linear_chain() {
        // app -> util -> core
        let graph = TestGraph::new(&[("core", &[]), ("util", &[0]), ("app", &[1])]);
        let order = build_order(&graph, 0..3).unwrap();
        assert_eq!(graph.names(&order), vec!["core", "util", "app"]);
    }

    #[test]
    fn test_depth_is_maximal() {
        // app -> core, app -> util -> core
        let graph = TestGraph::new(&[("core", &[]), ("util", &[0]), ("app", &[0, 1])]);
        let mut builder = OrderedGraphBuilder::new(&graph);
        builder.insert(2, 1).unwrap();
        assert_eq!(builder.depth(2), Some(1));
        assert_eq!(builder.depth(1), Some(2));
        assert_eq!(builder.depth(0), Some(3));
    }

    #[test]
    fn test_ties_broken_by_name() {
        let graph = TestGraph::new(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
        let order = build_order(&graph, [0, 1, 2]).unwrap();
        assert_eq!(graph.names(&order), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let graph = TestGraph::new(&[
            ("a", &[]),
            ("b", &[0]),
            ("c", &[0]),
            ("d", &[1, 2]),
            ("e", &[2]),
        ]);
        let forward = build_order(&graph, 0..5).unwrap();
        let backward = build_order(&graph, (0..5).rev()).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_cycle_reports_chain() {
        // a -> b -> c -> a
        let graph = TestGraph::new(&[("a", &[1]), ("b", &[2]), ("c", &[0])]);
        match build_order(&graph, [0]) {
            Err(BuildError::CircularDependency { chain }) => {
                assert_eq!(chain, vec!["a", "b", "c"]);
            }
            other => panic!("Expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_chain_excludes_entry_path() {
        // x -> a -> b -> a
        let graph = TestGraph::new(&[("x", &[1]), ("a", &[2]), ("b", &[1])]);
        match build_order(&graph, [0]) {
            Err(BuildError::CircularDependency { chain }) => {
                assert_eq!(chain, vec!["a", "b"]);
            }
            other => panic!("Expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let graph = TestGraph::new(&[("a", &[0])]);
        assert!(matches!(
            transitive_dependencies(&graph, 0),
            Err(BuildError::CircularDependency { chain }) if chain == vec!["a"]
        ));
    }

    #[test]
    fn test_transitive_dependencies_excludes_root() {
        let graph = TestGraph::new(&[("core", &[]), ("util", &[0]), ("app", &[1])]);
        let deps = transitive_dependencies(&graph, 2).unwrap();
        assert_eq!(graph.names(&deps), vec!["core", "util"]);
        assert!(transitive_dependencies(&graph, 0).unwrap().is_empty());
    }
}
