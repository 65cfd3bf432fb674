//! Check command - report every problem without writing anything

use crate::workspace::{BuildOverrides, Workspace};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use weft_build::Builder;

/// Resolve, build the graph and plan code generation
///
/// Exits non-zero after printing every error found.
pub fn run(dir: &Path, overrides: &BuildOverrides, quiet: bool) -> Result<()> {
    let workspace = Workspace::load(dir)?;
    let config = workspace.build_config(overrides)?;
    let registry = workspace.registry();
    let repository = workspace.repository();
    let tools = workspace.tool_runner();
    let builder = Builder::new(config, &registry, &repository, &tools)
        .context("Failed to set up generation")?
        .with_name(workspace.name());

    let graph = builder
        .check(&workspace.modules)
        .map_err(super::report_failure)?;

    if !quiet {
        println!(
            "{} {}: {} projects, no problems found",
            "ok".green().bold(),
            graph.name(),
            graph.len()
        );
    }
    Ok(())
}
