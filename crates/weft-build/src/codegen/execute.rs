//! Carrying out artifact plans
use super::{Artifact, ArtifactPlan, CodegenContext, GeneratedLayout, ReflectionMode};
use crate::error::{BuildError, BuildResult, NodeFailure};
use crate::scan::SourceFile;
use crate::solution::{BuildStep, GraphNode, NodeId, SolutionGraph};
use crate::tools::ToolInvocation;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What materialization did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CodegenSummary {
    /// Nodes whose artifacts were merged
    pub nodes: usize,
    /// Text files written
    pub files_written: usize,
    /// Text files already up to date
    pub files_unchanged: usize,
    /// External tool runs
    pub tools_run: usize,
}

/// Write, run and merge every plan
///
/// A node that fails does not stop the others; all failures come back
/// together once every node has been processed.
pub fn materialize(
    graph: &mut SolutionGraph,
    plans: &[ArtifactPlan],
    ctx: &CodegenContext<'_>,
) -> BuildResult<CodegenSummary> {
    let mut summary = CodegenSummary::default();
    let mut errors: BTreeMap<NodeId, Vec<BuildError>> = BTreeMap::new();

    let writes: Vec<(NodeId, BuildResult<(usize, usize)>)> = if ctx.parallel {
        plans
            .par_iter()
            .map(|plan| (plan.node, write_text_files(plan)))
            .collect()
    } else {
        plans
            .iter()
            .map(|plan| (plan.node, write_text_files(plan)))
            .collect()
    };
    for (node, result) in writes {
        match result {
            Ok((written, unchanged)) => {
                summary.files_written += written;
                summary.files_unchanged += unchanged;
            }
            Err(err) => errors.entry(node).or_default().push(err),
        }
    }

    let mut ordered: Vec<&ArtifactPlan> = plans.iter().collect();
    ordered.sort_by_key(|plan| plan.node);
    for plan in &ordered {
        if errors.contains_key(&plan.node) {
            continue;
        }
        let node = graph.node(plan.node);
        for artifact in plan.artifacts.iter().filter(|a| a.runs_tool()) {
            if let Some(invocation) = tool_invocation(node, artifact) {
                match ctx.tools.run(&invocation) {
                    Ok(_) => summary.tools_run += 1,
                    Err(err) => {
                        errors.entry(plan.node).or_default().push(err);
                        break;
                    }
                }
            }
        }
    }

    for plan in &ordered {
        if errors.contains_key(&plan.node) {
            continue;
        }
        merge(graph.node_mut(plan.node), plan, &ctx.layout);
        summary.nodes += 1;
    }

    if !errors.is_empty() {
        return Err(BuildError::GenerationFailed(
            errors
                .into_iter()
                .map(|(id, errors)| NodeFailure {
                    project: graph.node(id).name.clone(),
                    errors,
                })
                .collect(),
        ));
    }

    info!(
        nodes = summary.nodes,
        written = summary.files_written,
        unchanged = summary.files_unchanged,
        tools = summary.tools_run,
        "generated artifacts"
    );
    Ok(summary)
}

/// Text artifacts of a plan as (path, contents)
fn text_files(plan: &ArtifactPlan) -> Vec<(&Path, String)> {
    let mut files = Vec::new();
    for artifact in &plan.artifacts {
        match artifact {
            Artifact::Glue(unit) => files.push((unit.path.as_path(), unit.render())),
            Artifact::Aggregation(unit) => {
                files.push((unit.header.as_path(), unit.render_header()));
                files.push((unit.source.as_path(), unit.render_source()));
            }
            Artifact::EntryPoint(entry) => files.push((entry.path.as_path(), entry.render())),
            Artifact::TestFramework { .. }
            | Artifact::Reflection { .. }
            | Artifact::Grammar { .. } => {}
        }
    }
    files
}

/// Returns (written, unchanged)
fn write_text_files(plan: &ArtifactPlan) -> BuildResult<(usize, usize)> {
    let mut written = 0;
    let mut unchanged = 0;
    for (path, contents) in text_files(plan) {
        if write_if_changed(path, &contents)? {
            written += 1;
        } else {
            unchanged += 1;
        }
    }
    Ok((written, unchanged))
}

/// Write `contents` unless the file already holds exactly that
///
/// Leaving identical files alone keeps their timestamps, so regenerating an
/// unchanged workspace does not trigger rebuilds.
pub fn write_if_changed(path: &Path, contents: &str) -> BuildResult<bool> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == contents {
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| BuildError::io(path, e))?;
    debug!(path = %path.display(), "wrote generated file");
    Ok(true)
}

fn tool_invocation(node: &GraphNode, artifact: &Artifact) -> Option<ToolInvocation> {
    match artifact {
        Artifact::Reflection {
            mode: ReflectionMode::Immediate,
            sources,
            output,
        } => Some(ToolInvocation::reflection(
            node.name.clone(),
            sources.clone(),
            output.clone(),
            node.source_dir.clone(),
        )),
        Artifact::Grammar {
            grammar,
            source,
            header,
        } => Some(ToolInvocation::parser(
            node.name.clone(),
            grammar.clone(),
            source.clone(),
            header.clone(),
            node.source_dir.clone(),
        )),
        _ => None,
    }
}

/// Add generated files, build steps and include paths to the node
fn merge(node: &mut GraphNode, plan: &ArtifactPlan, layout: &GeneratedLayout) {
    for dir in [layout.include_dir(), layout.node_dir(node)] {
        add_include_dir(node, dir);
    }

    for artifact in &plan.artifacts {
        match artifact {
            Artifact::TestFramework { sources } => {
                node.files.extend(sources.iter().map(SourceFile::new));
                if let Some(dir) = sources.first().and_then(|s| s.parent()) {
                    add_include_dir(node, dir.to_path_buf());
                }
            }
            Artifact::Reflection {
                mode,
                sources,
                output,
            } => {
                node.files.push(SourceFile::generated(output));
                if *mode == ReflectionMode::Deferred {
                    node.build_steps.push(BuildStep::Reflection {
                        sources: sources.clone(),
                        output: output.clone(),
                    });
                }
            }
            Artifact::Glue(unit) => {
                node.files.push(SourceFile::generated(&unit.path));
                if let super::ApiLinkage::Shared { exports_define } = &unit.linkage {
                    node.defines
                        .entry(exports_define.clone())
                        .or_insert_with(|| "1".to_string());
                }
            }
            Artifact::Aggregation(unit) => {
                node.files.push(SourceFile::generated(&unit.header));
                node.files.push(SourceFile::generated(&unit.source));
            }
            Artifact::EntryPoint(entry) => node.files.push(SourceFile::generated(&entry.path)),
            Artifact::Grammar { source, header, .. } => {
                node.files.push(SourceFile::generated(source));
                node.files.push(SourceFile::generated(header));
            }
        }
    }
}

fn add_include_dir(node: &mut GraphNode, dir: PathBuf) {
    if !node.include_dirs.contains(&dir) {
        node.include_dirs.push(dir);
    }
}
