use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod workspace;

/// Meta-build generator for multi-module native workspaces.
///
/// Weft reads the module manifests of a workspace, resolves every project
/// dependency into one build-ordered graph, synthesizes glue code and entry
/// points, and writes build descriptions other tools can consume.
///
/// EXAMPLES:
///     weft generate                    Generate with the configured profile
///     weft generate --release          Generate a release build description
///     weft graph                       Show the build order
///     weft check                       Report every problem, write nothing
///
/// ENVIRONMENT VARIABLES:
///     WEFT_LOG          Log filter (default: warn)
///     WEFT_JSON         Set to '1' for JSON output by default
///     WEFT_PROFILE      Override the workspace profile
///     WEFT_LINKAGE      Override the workspace linkage
///     WEFT_OUTPUT       Override the output directory
///     WEFT_JOBS         Pin the worker thread count
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "weft")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace directory (defaults to the current directory)
    #[arg(long, short = 'C', global = true)]
    dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write build descriptions
    ///
    /// Resolves every project, builds the solution graph, writes generated
    /// files under <output>/generated and renders the JSON description.
    ///
    /// EXAMPLES:
    ///     weft generate --linkage static     Fully static build
    ///     weft generate --profile ci         Custom profile
    ///     weft generate --json               Summary as JSON
    #[command(visible_alias = "g")]
    Generate {
        /// Build profile (dev, release, or custom)
        #[arg(long, short = 'p')]
        profile: Option<String>,
        /// Shorthand for --profile=release
        #[arg(long, conflicts_with = "profile")]
        release: bool,
        /// Library linkage (static or dynamic)
        #[arg(long, short = 'l')]
        linkage: Option<String>,
        /// Output directory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Worker thread count
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Print the summary as JSON
        #[arg(long, env = "WEFT_JSON")]
        json: bool,
    },

    /// Print the build order with each project's dependencies
    ///
    /// Nothing is written to disk.
    Graph {
        /// Build profile used to filter projects
        #[arg(long, short = 'p')]
        profile: Option<String>,
        /// Print the graph as JSON
        #[arg(long, env = "WEFT_JSON")]
        json: bool,
    },

    /// Resolve and plan without writing anything
    ///
    /// Exits non-zero and prints every problem found.
    #[command(visible_alias = "c")]
    Check {
        /// Build profile used to filter projects
        #[arg(long, short = 'p')]
        profile: Option<String>,
        /// Library linkage (static or dynamic)
        #[arg(long, short = 'l')]
        linkage: Option<String>,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     weft completions bash > ~/.local/share/bash-completion/completions/weft
    ///     weft completions zsh > ~/.zfunc/_weft
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_env("WEFT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();
    cli_config.apply_color();
    init_logging(cli.verbose, cli.quiet);

    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Generate {
            profile,
            release,
            linkage,
            output,
            jobs,
            json,
        } => {
            let args = commands::generate::GenerateArgs {
                overrides: workspace::BuildOverrides {
                    profile,
                    release,
                    linkage,
                    output,
                    jobs,
                },
                json: json || cli_config.default_json,
                quiet: cli.quiet,
            };
            commands::generate::run(&dir, args)?;
        }
        Commands::Graph { profile, json } => {
            let overrides = workspace::BuildOverrides {
                profile,
                ..Default::default()
            };
            commands::graph::run(&dir, &overrides, json || cli_config.default_json)?;
        }
        Commands::Check { profile, linkage } => {
            let overrides = workspace::BuildOverrides {
                profile,
                linkage,
                ..Default::default()
            };
            commands::check::run(&dir, &overrides, cli.quiet)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "weft", &mut io::stdout());
        }
    }

    Ok(())
}
