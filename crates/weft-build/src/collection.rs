//! Project collection
//!
//! Turns the read-only module records into a working set of resolved
//! projects: every project gets its effective type, its scanned files, its
//! dependency references resolved to other projects in the set and its
//! library references resolved through the [`LibraryRegistry`].
//!
//! Resolution never stops at the first problem. Every project is visited and
//! all failures come back together as [`Diagnostics`].

use crate::error::{BuildError, Diagnostics, MissingDependency};
use crate::profile::BuildConfig;
use crate::scan::{scan_directory, FileKind, SourceFile};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, warn};
use weft_manifest::project::{NAME_SEPARATOR, WILDCARD};
use weft_manifest::{LibraryRegistry, ModuleRecord, ProjectRecord, ProjectType, ResolvedLibrary};

/// Index of a project inside its collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(usize);

impl ProjectId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A project record bound to its module, with its references resolved
#[derive(Debug, Clone)]
pub struct ResolvedProject<'m> {
    record: &'m ProjectRecord,
    module: &'m ModuleRecord,
    kind: ProjectType,
    source_dir: PathBuf,
    files: Vec<SourceFile>,
    dependencies: Vec<ProjectId>,
    libraries: Vec<ResolvedLibrary>,
}

impl<'m> ResolvedProject<'m> {
    fn new(record: &'m ProjectRecord, module: &'m ModuleRecord, config: &BuildConfig) -> Self {
        let source_dir = match &record.source_dir {
            Some(dir) => module.root.join(dir),
            None => module.root.join(&record.name),
        };

        Self {
            record,
            module,
            kind: config.effective_kind(record.kind),
            source_dir,
            files: Vec::new(),
            dependencies: Vec::new(),
            libraries: Vec::new(),
        }
    }

    pub fn name(&self) -> &'m str {
        &self.record.name
    }

    pub fn record(&self) -> &'m ProjectRecord {
        self.record
    }

    pub fn module(&self) -> &'m ModuleRecord {
        self.module
    }

    /// Effective type (auto libraries already mapped through the linkage)
    pub fn kind(&self) -> ProjectType {
        self.kind
    }

    pub fn source_dir(&self) -> &PathBuf {
        &self.source_dir
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Resolved direct dependencies, required first, in declaration order
    pub fn dependencies(&self) -> &[ProjectId] {
        &self.dependencies
    }

    pub fn libraries(&self) -> &[ResolvedLibrary] {
        &self.libraries
    }

    /// Project comes from a fetched module rather than the workspace
    pub fn is_external(&self) -> bool {
        !self.module.local
    }

    /// `<leaf>.h` at the root of the source directory, if it exists
    pub fn public_header(&self) -> Option<&PathBuf> {
        let expected = self
            .source_dir
            .join(format!("{}.h", self.record.leaf_name()));
        self.files
            .iter()
            .find(|f| f.kind == FileKind::Header && f.path == expected)
            .map(|f| &f.path)
    }

    /// Replace the file list with the contents of the source directory
    pub fn scan(&mut self) {
        self.files = scan_directory(&self.source_dir);
    }

    fn add_dependency(&mut self, id: ProjectId) {
        if !self.dependencies.contains(&id) {
            self.dependencies.push(id);
        }
    }
}

/// Why a single dependency reference could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// No project carries the name
    Missing,
    /// The named project exists but cannot be linked against
    NotLinkable(ProjectType),
}

/// Every project of the workspace, indexed by name
#[derive(Debug)]
pub struct ProjectCollection<'m> {
    projects: Vec<ResolvedProject<'m>>,
    index: HashMap<&'m str, ProjectId>,
}

impl<'m> ProjectCollection<'m> {
    /// Bind every project of every module, in module then declaration order
    pub fn new(modules: &'m [ModuleRecord], config: &BuildConfig) -> Result<Self, Diagnostics> {
        let mut projects = Vec::new();
        let mut index: HashMap<&'m str, ProjectId> = HashMap::new();
        let mut diagnostics = Diagnostics::new();

        for module in modules {
            for record in &module.projects {
                if let Some(existing) = index.get(record.name.as_str()) {
                    let first: &ResolvedProject = &projects[existing.0];
                    diagnostics.push(BuildError::DuplicateProject {
                        name: record.name.clone(),
                        first: first.module.id.clone(),
                        second: module.id.clone(),
                    });
                    continue;
                }
                index.insert(record.name.as_str(), ProjectId(projects.len()));
                projects.push(ResolvedProject::new(record, module, config));
            }
        }

        diagnostics.into_result()?;
        debug!(projects = projects.len(), "project collection created");
        Ok(Self { projects, index })
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn projects(&self) -> &[ResolvedProject<'m>] {
        &self.projects
    }

    pub fn project(&self, id: ProjectId) -> &ResolvedProject<'m> {
        &self.projects[id.0]
    }

    pub fn find(&self, name: &str) -> Option<ProjectId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedProject<'m>> {
        self.find(name).map(|id| self.project(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = ProjectId> {
        (0..self.projects.len()).map(ProjectId)
    }

    /// Scan every project's source directory
    pub fn scan_files(&mut self, parallel: bool) {
        if parallel {
            self.projects.par_iter_mut().for_each(ResolvedProject::scan);
        } else {
            self.projects.iter_mut().for_each(ResolvedProject::scan);
        }
    }

    /// Resolve one reference made by `from`
    ///
    /// A name ending in `*` matches every static or shared library directly
    /// below the prefix (`core/*` matches `core/util` but not
    /// `core/util/detail`); the referencing project itself never matches.
    /// References to disabled projects resolve to nothing.
    pub fn resolve_reference(
        &self,
        from: ProjectId,
        reference: &str,
    ) -> Result<Vec<ProjectId>, ReferenceError> {
        if let Some(prefix) = reference.strip_suffix(WILDCARD) {
            let matches = self
                .ids()
                .filter(|&id| id != from)
                .filter(|&id| {
                    let project = self.project(id);
                    project.kind.is_binary_library()
                        && project
                            .name()
                            .strip_prefix(prefix)
                            .map(|rest| !rest.is_empty() && !rest.contains(NAME_SEPARATOR))
                            .unwrap_or(false)
                })
                .collect::<Vec<_>>();
            if matches.is_empty() {
                debug!(
                    project = self.project(from).name(),
                    reference, "wildcard dependency matched nothing"
                );
            }
            return Ok(matches);
        }

        let id = self.find(reference).ok_or(ReferenceError::Missing)?;
        let kind = self.project(id).kind;
        if kind == ProjectType::Disabled {
            warn!(
                project = self.project(from).name(),
                dependency = reference,
                "skipping dependency on disabled project"
            );
            return Ok(Vec::new());
        }
        if !kind.is_linkable() {
            return Err(ReferenceError::NotLinkable(kind));
        }
        Ok(vec![id])
    }

    /// Resolve a reference and append the result to `from`'s dependency list
    ///
    /// Soft references swallow every failure.
    pub fn resolve_dependency(
        &mut self,
        from: ProjectId,
        reference: &str,
        soft: bool,
    ) -> Result<(), ReferenceError> {
        match self.resolve_reference(from, reference) {
            Ok(ids) => {
                let project = &mut self.projects[from.0];
                for id in ids {
                    project.add_dependency(id);
                }
                Ok(())
            }
            Err(_) if soft => {
                debug!(
                    project = self.project(from).name(),
                    dependency = reference,
                    "optional dependency not available"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve the required then optional references of every project
    ///
    /// Missing required names are reported once each, listing every project
    /// that asked for them.
    pub fn resolve_dependencies(&mut self) -> Result<(), Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let mut missing: BTreeMap<&'m str, Vec<String>> = BTreeMap::new();

        let ids: Vec<ProjectId> = self.ids().collect();
        for &id in &ids {
            let record = self.projects[id.0].record;
            for reference in &record.dependencies {
                match self.resolve_dependency(id, reference, false) {
                    Ok(()) => {}
                    Err(ReferenceError::Missing) => {
                        let referencing = missing.entry(reference.as_str()).or_default();
                        if !referencing.iter().any(|n| n == &record.name) {
                            referencing.push(record.name.clone());
                        }
                    }
                    Err(ReferenceError::NotLinkable(kind)) => {
                        diagnostics.push(BuildError::NotLinkable {
                            project: record.name.clone(),
                            dependency: reference.clone(),
                            kind,
                        })
                    }
                }
            }
        }

        for &id in &ids {
            let record = self.projects[id.0].record;
            for reference in &record.optional_dependencies {
                // soft references never fail
                let _ = self.resolve_dependency(id, reference, true);
            }
        }

        if !missing.is_empty() {
            diagnostics.push(BuildError::UnresolvedDependencies(
                missing
                    .into_iter()
                    .map(|(dependency, referenced_by)| MissingDependency {
                        dependency: dependency.to_string(),
                        referenced_by,
                    })
                    .collect(),
            ));
        }

        diagnostics.into_result()
    }

    /// Look up every library reference in the registry
    pub fn resolve_libraries(&mut self, registry: &LibraryRegistry) -> Result<(), Diagnostics> {
        let mut diagnostics = Diagnostics::new();

        for project in &mut self.projects {
            let record = project.record;
            for name in &record.libraries {
                match registry.find(name) {
                    Some(library) => {
                        if !project.libraries.iter().any(|l| l.name == library.name) {
                            project.libraries.push(library);
                        }
                    }
                    None => diagnostics.push(BuildError::UnresolvedLibrary {
                        project: record.name.clone(),
                        library: name.clone(),
                    }),
                }
            }
        }

        diagnostics.into_result()
    }

    /// Drop projects that do not take part in this build
    ///
    /// Disabled projects always go; development-only projects and test
    /// applications go unless the profile is a development one. Survivors
    /// keep their relative order, and references to dropped projects are
    /// removed from the dependency lists. Returns how many were dropped.
    pub fn filter_projects(&mut self, config: &BuildConfig) -> usize {
        let development = config.profile.is_development();
        let keep = |p: &ResolvedProject| match p.kind {
            ProjectType::Disabled => false,
            ProjectType::TestApplication => development,
            _ => development || !p.record.flags.dev_only,
        };

        let mut remap: Vec<Option<ProjectId>> = Vec::with_capacity(self.projects.len());
        let mut next = 0;
        for project in &self.projects {
            if keep(project) {
                remap.push(Some(ProjectId(next)));
                next += 1;
            } else {
                debug!(project = project.name(), "filtered out of build");
                remap.push(None);
            }
        }

        let before = self.projects.len();
        let projects = std::mem::take(&mut self.projects);
        self.projects = projects
            .into_iter()
            .zip(&remap)
            .filter(|(_, slot)| slot.is_some())
            .map(|(mut project, _)| {
                project.dependencies = project
                    .dependencies
                    .iter()
                    .filter_map(|dep| remap[dep.0])
                    .collect();
                project
            })
            .collect();

        self.index = self
            .projects
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name(), ProjectId(i)))
            .collect();

        before - self.projects.len()
    }
}
