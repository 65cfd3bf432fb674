//! External (third-party) libraries and the registry that finds them

use crate::module::ModuleRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A library declared directly in a module manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LibraryRecord {
    pub name: String,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub link_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub link_libs: Vec<String>,
    #[serde(default)]
    pub defines: BTreeMap<String, String>,
}

impl LibraryRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_dirs: Vec::new(),
            link_dirs: Vec::new(),
            link_libs: Vec::new(),
            defines: BTreeMap::new(),
        }
    }
}

/// Where a resolved library came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryOrigin {
    Declared,
    Prebuilt,
    System,
}

/// Everything a backend needs to consume an external library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLibrary {
    pub name: String,
    pub origin: LibraryOrigin,
    pub include_dirs: Vec<PathBuf>,
    pub link_dirs: Vec<PathBuf>,
    pub link_libs: Vec<String>,
    pub defines: BTreeMap<String, String>,
}

impl ResolvedLibrary {
    fn new(name: &str, origin: LibraryOrigin) -> Self {
        Self {
            name: name.to_string(),
            origin,
            include_dirs: Vec::new(),
            link_dirs: Vec::new(),
            link_libs: Vec::new(),
            defines: BTreeMap::new(),
        }
    }
}

/// One way of obtaining a third-party library
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    /// Libraries declared in module manifests
    Declared(Vec<LibraryRecord>),
    /// `<root>/<name>/{include,lib}` directory layout
    Prebuilt { root: PathBuf },
    /// Library files installed in search paths
    System { search_paths: Vec<PathBuf> },
}

impl LibrarySource {
    /// Try to resolve `name` through this source
    pub fn resolve(&self, name: &str) -> Option<ResolvedLibrary> {
        match self {
            Self::Declared(records) => records.iter().find(|r| r.name == name).map(|r| {
                ResolvedLibrary {
                    name: r.name.clone(),
                    origin: LibraryOrigin::Declared,
                    include_dirs: r.include_dirs.clone(),
                    link_dirs: r.link_dirs.clone(),
                    link_libs: r.link_libs.clone(),
                    defines: r.defines.clone(),
                }
            }),
            Self::Prebuilt { root } => resolve_prebuilt(root, name),
            Self::System { search_paths } => search_paths
                .iter()
                .find_map(|dir| resolve_system(dir, name)),
        }
    }
}

fn resolve_prebuilt(root: &Path, name: &str) -> Option<ResolvedLibrary> {
    let dir = root.join(name);
    if !dir.is_dir() {
        return None;
    }

    let mut library = ResolvedLibrary::new(name, LibraryOrigin::Prebuilt);
    let include = dir.join("include");
    if include.is_dir() {
        library.include_dirs.push(include);
    }
    let lib = dir.join("lib");
    if lib.is_dir() {
        library.link_dirs.push(lib);
    }
    library.link_libs.push(name.to_string());
    Some(library)
}

fn resolve_system(dir: &Path, name: &str) -> Option<ResolvedLibrary> {
    let candidates = [
        format!("lib{}.a", name),
        format!("lib{}.so", name),
        format!("lib{}.dylib", name),
        format!("{}.lib", name),
    ];

    candidates
        .iter()
        .any(|file| dir.join(file).is_file())
        .then(|| {
            let mut library = ResolvedLibrary::new(name, LibraryOrigin::System);
            library.link_dirs.push(dir.to_path_buf());
            library.link_libs.push(name.to_string());
            library
        })
}

/// Ordered list of library sources; the first source that knows a name wins
#[derive(Debug, Clone, Default)]
pub struct LibraryRegistry {
    sources: Vec<LibrarySource>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with every library declared by the given modules
    pub fn from_modules(modules: &[ModuleRecord]) -> Self {
        let declared = modules
            .iter()
            .flat_map(|m| m.libraries.iter().cloned())
            .collect();
        Self {
            sources: vec![LibrarySource::Declared(declared)],
        }
    }

    /// Append a lower-priority source
    pub fn with_source(mut self, source: LibrarySource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[LibrarySource] {
        &self.sources
    }

    pub fn find(&self, name: &str) -> Option<ResolvedLibrary> {
        self.sources.iter().find_map(|s| s.resolve(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_declared_library() {
        let mut zlib = LibraryRecord::new("zlib");
        zlib.link_libs.push("z".to_string());
        let registry = LibraryRegistry::new().with_source(LibrarySource::Declared(vec![zlib]));

        let found = registry.find("zlib").unwrap();
        assert_eq!(found.origin, LibraryOrigin::Declared);
        assert_eq!(found.link_libs, vec!["z".to_string()]);
        assert!(registry.find("png").is_none());
    }

    #[test]
    fn test_prebuilt_layout() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("fmt/include")).unwrap();
        fs::create_dir_all(dir.path().join("fmt/lib")).unwrap();

        let source = LibrarySource::Prebuilt {
            root: dir.path().to_path_buf(),
        };
        let found = source.resolve("fmt").unwrap();
        assert_eq!(found.origin, LibraryOrigin::Prebuilt);
        assert_eq!(found.include_dirs, vec![dir.path().join("fmt/include")]);
        assert_eq!(found.link_dirs, vec![dir.path().join("fmt/lib")]);
        assert!(source.resolve("spdlog").is_none());
    }

    #[test]
    fn test_system_search_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libssl.so"), b"").unwrap();

        let source = LibrarySource::System {
            search_paths: vec![PathBuf::from("/nonexistent"), dir.path().to_path_buf()],
        };
        let found = source.resolve("ssl").unwrap();
        assert_eq!(found.origin, LibraryOrigin::System);
        assert_eq!(found.link_dirs, vec![dir.path().to_path_buf()]);
        assert!(source.resolve("crypto").is_none());
    }

    #[test]
    fn test_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libz.a"), b"").unwrap();

        let module = ModuleRecord::new("m", "/m").with_libraries(vec![LibraryRecord::new("z")]);
        let registry = LibraryRegistry::from_modules(&[module]).with_source(LibrarySource::System {
            search_paths: vec![dir.path().to_path_buf()],
        });

        assert_eq!(registry.sources().len(), 2);
        assert_eq!(registry.find("z").unwrap().origin, LibraryOrigin::Declared);
    }
}
