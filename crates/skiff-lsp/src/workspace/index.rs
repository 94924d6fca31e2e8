//! The published snapshot of workspace analysis.
//!
//! Built in one pass over the workspace roots and swapped in atomically;
//! queries read whichever snapshot was current when they started.

use super::analysis::{Package, SourceUnit};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable index over every analyzed package in the workspace.
#[derive(Debug, Default)]
pub struct GlobalIndex {
    by_file: HashMap<PathBuf, (Arc<Package>, Arc<SourceUnit>)>,
    by_import_path: HashMap<String, Arc<Package>>,
    /// All known import paths, sorted, for import completion.
    import_paths: Vec<String>,
}

impl GlobalIndex {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn new(packages: Vec<(Option<String>, Arc<Package>)>) -> Self {
        let mut index = Self::default();
        for (import_path, package) in packages {
            for unit in &package.units {
                index
                    .by_file
                    .insert(unit.path.clone(), (package.clone(), unit.clone()));
            }
            if let Some(import_path) = import_path {
                index.by_import_path.insert(import_path, package);
            }
        }
        index.import_paths = index.by_import_path.keys().cloned().collect();
        index.import_paths.sort();
        index
    }

    /// The package and unit for an analyzed file path.
    pub fn lookup(&self, path: &Path) -> Option<(Arc<Package>, Arc<SourceUnit>)> {
        self.by_file.get(path).cloned()
    }

    pub fn package_by_import(&self, import_path: &str) -> Option<Arc<Package>> {
        self.by_import_path.get(import_path).cloned()
    }

    pub fn import_paths(&self) -> &[String] {
        &self.import_paths
    }

    pub fn file_count(&self) -> usize {
        self.by_file.len()
    }

    pub fn package_count(&self) -> usize {
        self.by_import_path.len()
    }
}
