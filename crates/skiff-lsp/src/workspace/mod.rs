//! Workspace management for cross-file analysis.
//!
//! Holds the workspace roots, server settings and the current
//! [`GlobalIndex`] snapshot. Snapshots are replaced wholesale on reload;
//! readers keep whichever snapshot they loaded.

mod analysis;
mod index;
mod loader;

pub use analysis::{Package, SourceUnit};
pub use index::GlobalIndex;
pub use loader::{find_skiff_files, import_path_for_dir, load_workspace};

use crate::config::ServerConfig;
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct WorkspaceManager {
    roots: ArcSwap<Vec<PathBuf>>,
    config: ArcSwap<ServerConfig>,
    index: ArcSwap<GlobalIndex>,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self {
            roots: ArcSwap::from_pointee(Vec::new()),
            config: ArcSwap::from_pointee(ServerConfig::default()),
            index: ArcSwap::new(GlobalIndex::empty()),
        }
    }

    /// Set the workspace roots, canonicalized so later path membership
    /// checks agree with canonicalized document paths.
    pub fn set_roots(&self, roots: Vec<PathBuf>) {
        let roots: Vec<PathBuf> = roots.iter().map(|r| canonical(r)).collect();
        self.roots.store(Arc::new(roots));
    }

    pub fn roots(&self) -> Arc<Vec<PathBuf>> {
        self.roots.load_full()
    }

    pub fn set_config(&self, config: ServerConfig) {
        self.config.store(Arc::new(config));
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.load_full()
    }

    /// Whether a canonical path lies under any workspace root.
    pub fn contains(&self, path: &Path) -> bool {
        self.roots.load().iter().any(|root| path.starts_with(root))
    }

    /// The current index snapshot.
    pub fn index(&self) -> Arc<GlobalIndex> {
        self.index.load_full()
    }

    /// Rescan the workspace and publish a fresh snapshot.
    pub fn reload(&self) {
        let roots = self.roots.load_full();
        let config = self.config.load();
        let index = load_workspace(&roots, &config.vendor_dir);
        info!(
            "Workspace indexed: {} packages, {} files",
            index.package_count(),
            index.file_count()
        );
        self.index.store(Arc::new(index));
    }

    /// The directory an import path refers to, checking each root
    /// directly and then its vendor directory.
    pub fn resolve_import_dir(&self, import_path: &str) -> Option<PathBuf> {
        let config = self.config.load();
        for root in self.roots.load().iter() {
            let direct = root.join(import_path);
            if direct.is_dir() {
                return Some(direct);
            }
            let vendored = root.join(&config.vendor_dir).join(import_path);
            if vendored.is_dir() {
                return Some(vendored);
            }
        }
        None
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedWorkspaceManager = Arc<WorkspaceManager>;

/// Canonicalize where possible; paths that do not exist yet are kept
/// as given.
pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_checks_roots() {
        let ws = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new();
        manager.set_roots(vec![ws.path().to_path_buf()]);

        let root = canonical(ws.path());
        assert!(manager.contains(&root.join("pkg/main.sk")));
        assert!(!manager.contains(Path::new("/elsewhere/main.sk")));
    }

    #[test]
    fn reload_publishes_snapshot() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir(ws.path().join("pkg")).unwrap();
        std::fs::write(ws.path().join("pkg/a.sk"), "package pkg\n").unwrap();

        let manager = WorkspaceManager::new();
        manager.set_roots(vec![ws.path().to_path_buf()]);
        assert_eq!(manager.index().file_count(), 0);

        manager.reload();
        let index = manager.index();
        assert_eq!(index.file_count(), 1);
        assert!(index.package_by_import("pkg").is_some());
    }

    #[test]
    fn resolve_import_dir_prefers_direct_over_vendor() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(ws.path().join("fmt")).unwrap();
        std::fs::create_dir_all(ws.path().join("vendor/github.com/example/dep")).unwrap();

        let manager = WorkspaceManager::new();
        manager.set_roots(vec![ws.path().to_path_buf()]);

        let root = canonical(ws.path());
        assert_eq!(manager.resolve_import_dir("fmt"), Some(root.join("fmt")));
        assert_eq!(
            manager.resolve_import_dir("github.com/example/dep"),
            Some(root.join("vendor/github.com/example/dep"))
        );
        assert_eq!(manager.resolve_import_dir("nope"), None);
    }
}
