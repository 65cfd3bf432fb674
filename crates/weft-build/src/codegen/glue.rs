//! Glue headers
//!
//! Every node gets a glue header that defines its API linkage macro and
//! pulls in the glue headers of everything it depends on, followed by its
//! own public header. Including one project's glue header therefore makes
//! its whole dependency closure visible, in build order.

use super::{GeneratedLayout, HEADER_BANNER};
use crate::solution::{NodeId, SolutionGraph};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use weft_manifest::ProjectType;

/// How the node's API macro expands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiLinkage {
    /// Exported while building the library, imported by its users
    Shared { exports_define: String },
    /// Expands to nothing
    Plain,
}

/// Planned glue header of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueUnit {
    pub path: PathBuf,
    pub project: String,
    pub api_macro: String,
    pub linkage: ApiLinkage,
    /// Glue headers of every dependency, in build order
    pub includes: Vec<String>,
    pub public_header: Option<String>,
}

impl GlueUnit {
    pub fn plan(graph: &SolutionGraph, id: NodeId, layout: &GeneratedLayout) -> Self {
        let node = graph.node(id);
        let linkage = match (node.kind, node.exports_define()) {
            (ProjectType::SharedLibrary, Some(exports_define)) => {
                ApiLinkage::Shared { exports_define }
            }
            _ => ApiLinkage::Plain,
        };

        Self {
            path: layout.glue_header(node),
            project: node.name.clone(),
            api_macro: node.api_macro(),
            linkage,
            includes: node
                .all_dependencies
                .iter()
                .map(|&dep| GeneratedLayout::glue_header_name(graph.node(dep)))
                .collect(),
            public_header: node.public_header.as_deref().map(include_path),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}. Do not edit.", HEADER_BANNER, self.project);
        out.push_str("#pragma once\n\n");

        match &self.linkage {
            ApiLinkage::Shared { exports_define } => {
                out.push_str(EXPORT_PRELUDE);
                let _ = writeln!(out, "\n#if defined({})", exports_define);
                let _ = writeln!(out, "#  define {} WEFT_EXPORT", self.api_macro);
                out.push_str("#else\n");
                let _ = writeln!(out, "#  define {} WEFT_IMPORT", self.api_macro);
                out.push_str("#endif\n");
            }
            ApiLinkage::Plain => {
                let _ = writeln!(out, "#define {}", self.api_macro);
            }
        }

        if !self.includes.is_empty() || self.public_header.is_some() {
            out.push('\n');
        }
        for include in &self.includes {
            let _ = writeln!(out, "#include \"{}\"", include);
        }
        if let Some(header) = &self.public_header {
            let _ = writeln!(out, "#include \"{}\"", header);
        }
        out
    }
}

const EXPORT_PRELUDE: &str = "\
#ifndef WEFT_EXPORT
#  if defined(_WIN32)
#    define WEFT_EXPORT __declspec(dllexport)
#    define WEFT_IMPORT __declspec(dllimport)
#  else
#    define WEFT_EXPORT __attribute__((visibility(\"default\")))
#    define WEFT_IMPORT
#  endif
#endif
";

/// Include path with forward slashes on every platform
fn include_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_glue() {
        let unit = GlueUnit {
            path: PathBuf::from("gen/include/app.glue.h"),
            project: "app".to_string(),
            api_macro: "APP_API".to_string(),
            linkage: ApiLinkage::Plain,
            includes: vec!["core.glue.h".to_string(), "util.glue.h".to_string()],
            public_header: None,
        };
        insta::assert_snapshot!(unit.render(), @r#"
        // Generated by weft for app. Do not edit.
        #pragma once

        #define APP_API

        #include "core.glue.h"
        #include "util.glue.h"
        "#);
    }

    #[test]
    fn test_shared_glue_exports() {
        let unit = GlueUnit {
            path: PathBuf::from("gen/include/engine_render.glue.h"),
            project: "engine/render".to_string(),
            api_macro: "ENGINE_RENDER_API".to_string(),
            linkage: ApiLinkage::Shared {
                exports_define: "ENGINE_RENDER_EXPORTS".to_string(),
            },
            includes: vec![],
            public_header: Some("/ws/engine/render/render.h".to_string()),
        };
        let text = unit.render();
        assert!(text.contains("#if defined(ENGINE_RENDER_EXPORTS)"));
        assert!(text.contains("#  define ENGINE_RENDER_API WEFT_EXPORT"));
        assert!(text.contains("#  define ENGINE_RENDER_API WEFT_IMPORT"));
        assert!(text.ends_with("#include \"/ws/engine/render/render.h\"\n"));
    }
}
