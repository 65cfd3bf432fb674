//! Precompiled aggregation units
//!
//! A precompiled node gets a declarations header (its precompiled root) and
//! a definitions unit. The definitions unit owns the node's static
//! initialization entry point, which first runs the entry points of every
//! precompiled project statically linked into the same binary and then
//! registers the node's own statics. Entry points reached more than once
//! through shared dependencies run only the first time.

use super::{GeneratedLayout, HEADER_BANNER};
use crate::solution::{NodeId, SolutionGraph};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Planned declaration/definition pair of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationUnit {
    pub project: String,
    pub header: PathBuf,
    pub source: PathBuf,
    /// Glue header the declarations pull in
    pub glue_include: String,
    /// Entry point this unit defines
    pub init_function: String,
    /// Entry points of statically linked dependencies, in build order
    pub dependency_inits: Vec<String>,
    /// Registration of the node's own statics
    pub register_statics: Option<String>,
}

impl AggregationUnit {
    pub fn plan(graph: &SolutionGraph, id: NodeId, layout: &GeneratedLayout) -> Self {
        let node = graph.node(id);
        let dependency_inits = graph
            .static_link_closure(id)
            .into_iter()
            .filter(|&dep| dep != id)
            .map(|dep| graph.node(dep))
            .filter(|dep| dep.flags.precompiled)
            .map(|dep| init_function(&dep.symbol()))
            .collect();

        Self {
            project: node.name.clone(),
            header: layout.node_file(node, ".pch.h"),
            source: layout.node_file(node, ".pch.cpp"),
            glue_include: GeneratedLayout::glue_header_name(node),
            init_function: init_function(&node.symbol()),
            dependency_inits,
            register_statics: node
                .flags
                .static_init
                .then(|| format!("weft_register_statics_{}", node.symbol())),
        }
    }

    pub fn render_header(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}. Do not edit.", HEADER_BANNER, self.project);
        out.push_str("#pragma once\n\n");
        let _ = writeln!(out, "#include \"{}\"", self.glue_include);
        out
    }

    pub fn render_source(&self) -> String {
        let header_name = self
            .header
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut out = String::new();
        let _ = writeln!(out, "{} {}. Do not edit.", HEADER_BANNER, self.project);
        let _ = writeln!(out, "#include \"{}\"\n", header_name);

        let calls: Vec<&String> = self
            .dependency_inits
            .iter()
            .chain(self.register_statics.iter())
            .collect();
        for call in &calls {
            let _ = writeln!(out, "extern \"C\" void {}();", call);
        }
        if !calls.is_empty() {
            out.push('\n');
        }

        let _ = writeln!(out, "extern \"C\" void {}()\n{{", self.init_function);
        out.push_str("    static bool initialized = false;\n");
        out.push_str("    if (initialized)\n    {\n        return;\n    }\n");
        out.push_str("    initialized = true;\n");
        for call in &calls {
            let _ = writeln!(out, "    {}();", call);
        }
        out.push_str("}\n");
        out
    }
}

fn init_function(symbol: &str) -> String {
    format!("weft_init_{}", symbol)
}
