//! Loading a workspace from disk
//!
//! Combines the merged configuration with the module manifests it points
//! at and the library sources, tool assets and tool executables it names.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use weft_build::{BuildConfig, DirectoryRepository, Linkage, ProcessToolRunner, Profile};
use weft_config::{Config, ConfigLoader};
use weft_manifest::{LibraryRegistry, LibrarySource, ModuleDependency, ModuleRecord};

/// Settings given on the command line, applied over the configuration
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub profile: Option<String>,
    pub release: bool,
    pub linkage: Option<String>,
    pub output: Option<PathBuf>,
    pub jobs: Option<usize>,
}

/// A configured workspace with its modules loaded
pub struct Workspace {
    pub config: Config,
    pub root: PathBuf,
    pub modules: Vec<ModuleRecord>,
}

impl Workspace {
    /// Load configuration starting at `dir`, then every reachable module
    ///
    /// Without configured module roots the workspace root itself is taken
    /// as the only module.
    pub fn load(dir: &Path) -> Result<Self> {
        let config = ConfigLoader::new()
            .load_from_directory(dir)
            .context("Failed to load workspace configuration")?;
        let root = config
            .workspace_root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.to_path_buf());

        let mut roots = config.module_roots();
        if roots.is_empty() {
            roots.push(root.clone());
        }
        let modules = load_modules(roots)?;

        Ok(Self {
            config,
            root,
            modules,
        })
    }

    pub fn name(&self) -> String {
        self.config.workspace_name()
    }

    /// Effective build configuration: flags over environment over files
    pub fn build_config(&self, overrides: &BuildOverrides) -> Result<BuildConfig> {
        let profile = if overrides.release {
            Profile::Release
        } else {
            let name = overrides.profile.as_deref().unwrap_or(self.config.profile());
            Profile::from_str(name).context("Invalid profile")?
        };
        let linkage = Linkage::from_str(
            overrides
                .linkage
                .as_deref()
                .unwrap_or(self.config.linkage()),
        )
        .context("Invalid linkage")?;
        let output = overrides
            .output
            .clone()
            .unwrap_or_else(|| self.config.output_dir());

        let mut build = BuildConfig::new(output)
            .with_profile(profile)
            .with_linkage(linkage)
            .with_parallel(self.config.parallel());
        if let Some(jobs) = overrides.jobs.or(self.config.jobs()) {
            build = build.with_jobs(jobs);
        }
        Ok(build)
    }

    /// Declared libraries first, then prebuilt layouts, then system paths
    pub fn registry(&self) -> LibraryRegistry {
        let mut registry = LibraryRegistry::from_modules(&self.modules);
        if let Some(root) = self.config.prebuilt_libraries() {
            registry = registry.with_source(LibrarySource::Prebuilt { root });
        }
        let search_paths = self.config.library_search_paths();
        if !search_paths.is_empty() {
            registry = registry.with_source(LibrarySource::System { search_paths });
        }
        registry
    }

    /// Tool assets directory (default: `<root>/assets`)
    pub fn repository(&self) -> DirectoryRepository {
        let assets = self
            .config
            .tools()
            .assets
            .unwrap_or_else(|| self.root.join("assets"));
        DirectoryRepository::new(assets)
    }

    pub fn tool_runner(&self) -> ProcessToolRunner {
        let tools = self.config.tools();
        let mut runner = ProcessToolRunner::new();
        if let Some(program) = tools.reflection {
            runner = runner.with_reflection(program);
        }
        if let Some(program) = tools.parser_generator {
            runner = runner.with_parser_generator(program);
        }
        runner
    }
}

/// Load the modules at `roots` plus every local module they depend on
///
/// Each module directory is loaded once, however many modules name it.
fn load_modules(roots: Vec<PathBuf>) -> Result<Vec<ModuleRecord>> {
    let mut seen = HashSet::new();
    let mut pending = roots;
    pending.reverse();
    let mut modules = Vec::new();

    while let Some(root) = pending.pop() {
        let key = fs::canonicalize(&root).unwrap_or_else(|_| root.clone());
        if !seen.insert(key) {
            continue;
        }

        let module = ModuleRecord::from_dir(&root)
            .with_context(|| format!("Failed to load module at {}", root.display()))?;
        debug!(module = %module.id, projects = module.projects.len(), "loaded module");

        for dependency in module.dependencies.iter().rev() {
            match dependency {
                ModuleDependency::Local { path } => pending.push(module.root.join(path)),
                ModuleDependency::Remote { git, branch } => warn!(
                    module = %module.id,
                    git = %git,
                    branch = %branch,
                    "remote module dependency is not fetched; skipping"
                ),
            }
        }
        modules.push(module);
    }

    Ok(modules)
}
