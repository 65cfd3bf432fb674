//! Graph command - print the build order without writing anything

use crate::workspace::{BuildOverrides, Workspace};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use weft_build::Builder;

/// Run the graph command
pub fn run(dir: &Path, overrides: &BuildOverrides, json: bool) -> Result<()> {
    let workspace = Workspace::load(dir)?;
    let config = workspace.build_config(overrides)?;
    let registry = workspace.registry();
    let repository = workspace.repository();
    let tools = workspace.tool_runner();
    let builder = Builder::new(config, &registry, &repository, &tools)
        .context("Failed to set up generation")?
        .with_name(workspace.name());

    let graph = builder
        .analyze(&workspace.modules)
        .into_graph()
        .map_err(super::report_failure)?;

    if json {
        let groups = graph.groups();
        let nodes: Vec<serde_json::Value> = graph
            .nodes()
            .iter()
            .map(|node| {
                serde_json::json!({
                    "name": node.name,
                    "kind": node.kind,
                    "external": node.external,
                    "group": groups.get(node.group).path,
                    "dependencies": graph.names(&node.direct_dependencies),
                    "all_dependencies": graph.names(&node.all_dependencies),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "name": graph.name(),
                "projects": nodes,
            }))?
        );
        return Ok(());
    }

    println!("{} ({} projects)", graph.name().bold(), graph.len());
    let width = graph.len().to_string().len();
    for (position, node) in graph.nodes().iter().enumerate() {
        let external = if node.external { " external" } else { "" };
        println!(
            "{:>width$}. {} {}",
            position + 1,
            node.name.bold(),
            format!("[{}{}]", node.kind, external).dimmed(),
            width = width
        );
        if !node.all_dependencies.is_empty() {
            println!(
                "{:width$}  {} {}",
                "",
                "<-".dimmed(),
                graph.names(&node.all_dependencies).join(", "),
                width = width
            );
        }
    }
    Ok(())
}
