//! Generate command - run the full pipeline and write build descriptions

use crate::workspace::{BuildOverrides, Workspace};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use weft_build::{Builder, JsonBackend};

/// Generate command arguments
#[derive(Default)]
pub struct GenerateArgs {
    pub overrides: BuildOverrides,
    /// JSON summary on stdout
    pub json: bool,
    /// No summary at all
    pub quiet: bool,
}

/// Run the generate command
pub fn run(dir: &Path, args: GenerateArgs) -> Result<()> {
    let workspace = Workspace::load(dir)?;
    let config = workspace.build_config(&args.overrides)?;
    let profile = config.profile.clone();
    let linkage = config.linkage;
    let output_dir = config.output_dir().to_path_buf();

    let registry = workspace.registry();
    let repository = workspace.repository();
    let tools = workspace.tool_runner();
    let builder = Builder::new(config, &registry, &repository, &tools)
        .context("Failed to set up generation")?
        .with_name(workspace.name());

    let mut backend = JsonBackend::new(&output_dir);
    let report = builder
        .generate(&workspace.modules, &mut backend)
        .map_err(super::report_failure)?;

    if args.json {
        let stats = &report.stats;
        println!(
            "{}",
            serde_json::json!({
                "success": true,
                "profile": profile.name(),
                "linkage": linkage.name(),
                "output": output_dir,
                "projects": stats.graph_nodes,
                "filtered_projects": stats.filtered_projects,
                "files_written": report.codegen.files_written,
                "files_unchanged": report.codegen.files_unchanged,
                "tools_run": report.codegen.tools_run,
                "descriptions": backend.written().len(),
                "build_order": report.build_order,
                "resolve_time": stats.resolve_time.as_secs_f64(),
                "graph_time": stats.graph_time.as_secs_f64(),
                "codegen_time": stats.codegen_time.as_secs_f64(),
                "render_time": stats.render_time.as_secs_f64(),
                "total_time": stats.total_time.as_secs_f64(),
            })
        );
    } else if !args.quiet {
        println!(
            "{} {} projects in {:.2}s",
            "Generated".green().bold(),
            report.stats.graph_nodes,
            report.stats.total_time.as_secs_f64()
        );
        println!("  Profile:   {} ({} linkage)", profile.name(), linkage.name());
        println!(
            "  Files:     {} written, {} unchanged",
            report.codegen.files_written, report.codegen.files_unchanged
        );
        if report.codegen.tools_run > 0 {
            println!("  Tools:     {} runs", report.codegen.tools_run);
        }
        if report.stats.filtered_projects > 0 {
            println!(
                "  Skipped:   {} projects not part of this profile",
                report.stats.filtered_projects
            );
        }
        println!("  Output:    {}", output_dir.display());
    }

    Ok(())
}
