//! Tool asset lookup
//!
//! Some generated artifacts pull in files shipped with the tool rather than
//! with the workspace, such as the sources of the test framework linked into
//! every test application.

use crate::scan::scan_directory;
use std::path::PathBuf;

/// Name of the file set holding the test framework sources
pub const TEST_FRAMEWORK: &str = "test-framework";

/// Single amalgamated test framework source, used when no set is shipped
pub const TEST_FRAMEWORK_SOURCE: &str = "test-framework.cpp";

/// Resolves named tool assets to files on disk
pub trait FileRepository: Sync {
    /// Path of a single named asset file
    fn resolve(&self, name: &str) -> Option<PathBuf>;

    /// Every file of a named asset set, sorted
    fn file_set(&self, name: &str) -> Option<Vec<PathBuf>>;
}

/// Assets laid out as entries of one directory
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    root: PathBuf,
}

impl DirectoryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl FileRepository for DirectoryRepository {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let path = self.root.join(name);
        path.is_file().then_some(path)
    }

    fn file_set(&self, name: &str) -> Option<Vec<PathBuf>> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return None;
        }
        Some(scan_directory(&dir).into_iter().map(|f| f.path).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_set_lists_directory() {
        let temp = TempDir::new().unwrap();
        let set = temp.path().join(TEST_FRAMEWORK);
        fs::create_dir_all(&set).unwrap();
        fs::write(set.join("runner.cpp"), "").unwrap();
        fs::write(set.join("assert.h"), "").unwrap();

        let repo = DirectoryRepository::new(temp.path());
        let files = repo.file_set(TEST_FRAMEWORK).unwrap();
        assert_eq!(files, vec![set.join("assert.h"), set.join("runner.cpp")]);
        assert!(repo.resolve(TEST_FRAMEWORK).is_none());
    }

    #[test]
    fn test_resolve_single_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(TEST_FRAMEWORK_SOURCE), "").unwrap();

        let repo = DirectoryRepository::new(temp.path());
        assert_eq!(
            repo.resolve(TEST_FRAMEWORK_SOURCE),
            Some(temp.path().join(TEST_FRAMEWORK_SOURCE))
        );
    }

    #[test]
    fn test_missing_assets() {
        let temp = TempDir::new().unwrap();
        let repo = DirectoryRepository::new(temp.path());
        assert!(repo.file_set(TEST_FRAMEWORK).is_none());
        assert!(repo.resolve("nothing.h").is_none());
    }
}
