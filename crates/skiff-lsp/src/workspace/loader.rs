//! Workspace scanning: find package directories under the roots and
//! analyze them into a [`GlobalIndex`].

use super::analysis::Package;
use super::index::GlobalIndex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Find all `.sk` files recursively under a directory.
pub fn find_skiff_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                // Skip hidden directories and common non-source directories
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if !name.starts_with('.') && name != "target" && name != "node_modules" {
                        files.extend(find_skiff_files(&path));
                    }
                }
            } else if path.extension().is_some_and(|ext| ext == "sk") {
                files.push(path);
            }
        }
    }

    files
}

/// Analyze every package directory under the given roots.
///
/// Packages that fail to load are logged and skipped; one bad directory
/// must not take down the whole snapshot.
pub fn load_workspace(roots: &[PathBuf], vendor_dir: &str) -> GlobalIndex {
    let mut packages = Vec::new();
    let mut seen = BTreeSet::new();

    for root in roots {
        for file in find_skiff_files(root) {
            let Some(dir) = file.parent() else { continue };
            if !seen.insert(dir.to_path_buf()) {
                continue;
            }
            match Package::load(dir) {
                Ok(package) => {
                    packages.push((import_path_for_dir(root, dir, vendor_dir), package));
                }
                Err(err) => warn!("Skipping package at {}: {err}", dir.display()),
            }
        }
    }

    GlobalIndex::new(packages)
}

/// The import path a package directory is addressed by.
///
/// Relative to the workspace root, with the vendor directory stripped so
/// vendored packages keep their canonical paths. The root itself has no
/// import path.
pub fn import_path_for_dir(root: &Path, dir: &Path, vendor_dir: &str) -> Option<String> {
    let relative = dir.strip_prefix(root).ok()?;
    let relative = relative.strip_prefix(vendor_dir).unwrap_or(relative);

    let mut segments = Vec::new();
    for component in relative.components() {
        segments.push(component.as_os_str().to_str()?);
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn import_paths_relative_to_root() {
        let root = Path::new("/ws");
        assert_eq!(
            import_path_for_dir(root, Path::new("/ws/net/http"), "vendor").as_deref(),
            Some("net/http")
        );
        assert_eq!(import_path_for_dir(root, Path::new("/ws"), "vendor"), None);
        assert_eq!(import_path_for_dir(root, Path::new("/elsewhere/p"), "vendor"), None);
    }

    #[test]
    fn vendor_prefix_is_stripped() {
        let root = Path::new("/ws");
        assert_eq!(
            import_path_for_dir(root, Path::new("/ws/vendor/github.com/example/dep"), "vendor")
                .as_deref(),
            Some("github.com/example/dep")
        );
        // A custom vendor directory only strips itself.
        assert_eq!(
            import_path_for_dir(root, Path::new("/ws/vendor/x"), "third_party").as_deref(),
            Some("vendor/x")
        );
    }

    #[test]
    fn load_workspace_indexes_packages() {
        let ws = tempfile::tempdir().unwrap();
        write(&ws.path().join("fmt/fmt.sk"), "package fmt\n\nfunc Println() {}\n");
        write(&ws.path().join("flag/flag.sk"), "package flag\n");
        write(
            &ws.path().join("vendor/github.com/example/dep/dep.sk"),
            "package dep\n",
        );
        write(&ws.path().join("fmt/README.md"), "not source");

        let index = load_workspace(&[ws.path().to_path_buf()], "vendor");

        assert_eq!(index.import_paths(), ["flag", "fmt", "github.com/example/dep"]);
        let fmt = index.package_by_import("fmt").unwrap();
        assert!(fmt.find_symbol("Println").is_some());

        let file = ws.path().join("flag/flag.sk");
        let (package, unit) = index.lookup(&file).unwrap();
        assert_eq!(package.name.as_deref(), Some("flag"));
        assert_eq!(unit.path, file);
    }

    #[test]
    fn hidden_and_target_directories_skipped() {
        let ws = tempfile::tempdir().unwrap();
        write(&ws.path().join("pkg/a.sk"), "package pkg\n");
        write(&ws.path().join(".git/b.sk"), "package hidden\n");
        write(&ws.path().join("target/c.sk"), "package build\n");

        let index = load_workspace(&[ws.path().to_path_buf()], "vendor");
        assert_eq!(index.import_paths(), ["pkg"]);
    }
}
