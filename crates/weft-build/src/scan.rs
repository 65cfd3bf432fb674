//! Source directory scanning

use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Role a file plays in a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Compiled translation unit
    Source,
    /// Included declarations
    Header,
    /// Parser grammar, turned into a source/header pair before rendering
    Grammar,
    /// Anything else (data, docs, scripts)
    Other,
}

impl FileKind {
    /// Classify a file by extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("c" | "cc" | "cpp" | "cxx" | "m" | "mm") => Self::Source,
            Some("h" | "hh" | "hpp" | "hxx" | "inl") => Self::Header,
            Some("y" | "yy") => Self::Grammar,
            _ => Self::Other,
        }
    }
}

/// A file belonging to a project
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: FileKind,
    /// Produced by the generator rather than written by hand
    pub generated: bool,
}

impl SourceFile {
    /// A hand-written file, classified by extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            kind: FileKind::from_path(&path),
            path,
            generated: false,
        }
    }

    /// A file produced by the generator
    pub fn generated(path: impl Into<PathBuf>) -> Self {
        Self {
            generated: true,
            ..Self::new(path)
        }
    }
}

/// Collect every file under `dir`, sorted by path
///
/// A missing directory yields an empty list. Hidden files and directories
/// are skipped.
pub fn scan_directory(dir: &Path) -> Vec<SourceFile> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<SourceFile> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| SourceFile::new(e.into_path()))
        .collect();

    files.sort();
    files
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
