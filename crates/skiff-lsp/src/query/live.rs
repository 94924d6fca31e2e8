//! On-demand analysis of a file that is ahead of the published index,
//! typically because of unsaved edits.
//!
//! Concurrent queries for the same path coalesce onto one in-flight
//! analysis instead of each doing the work.

use super::error::{AnalysisError, QueryError};
use crate::workspace::{Package, SharedWorkspaceManager, SourceUnit, WorkspaceManager};
use dashmap::DashMap;
use skiff_syntax::SourceText;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Analysis of one file against the live state of its package, with the
/// dependency packages its imports resolve to.
#[derive(Debug)]
pub struct LiveUnit {
    pub package: Arc<Package>,
    pub unit: Arc<SourceUnit>,
    deps: HashMap<String, Arc<Package>>,
}

impl LiveUnit {
    pub fn dep(&self, import_path: &str) -> Option<&Arc<Package>> {
        self.deps.get(import_path)
    }
}

type AnalysisCell = Arc<OnceCell<Result<Arc<LiveUnit>, AnalysisError>>>;

pub struct LiveAnalyzer {
    workspace: SharedWorkspaceManager,
    in_flight: DashMap<PathBuf, AnalysisCell>,
    runs: AtomicUsize,
}

impl LiveAnalyzer {
    pub fn new(workspace: SharedWorkspaceManager) -> Self {
        Self {
            workspace,
            in_flight: DashMap::new(),
            runs: AtomicUsize::new(0),
        }
    }

    /// Analyze `path` with `text` as its content.
    ///
    /// Callers arriving while an analysis for the same path is running
    /// share its result. A failed analysis is shared too; a cancelled
    /// one is not, the next caller starts over.
    pub async fn analyze(
        &self,
        path: &Path,
        text: SourceText,
        cancel: &CancellationToken,
    ) -> Result<Arc<LiveUnit>, QueryError> {
        let cell = {
            let entry = self.in_flight.entry(path.to_path_buf()).or_default();
            entry.value().clone()
        };

        let result = cell
            .get_or_try_init(|| self.run_analysis(path, text, cancel))
            .await
            .cloned();

        // Only the cell this call attached to is retired; a newer cell
        // registered by a later caller stays.
        self.in_flight.remove_if(path, |_, current| Arc::ptr_eq(current, &cell));

        match result? {
            Ok(unit) => Ok(unit),
            Err(source) => Err(QueryError::Resolution {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// How many analyses actually ran. Coalesced callers do not add to
    /// this count.
    pub fn analysis_runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }

    async fn run_analysis(
        &self,
        path: &Path,
        text: SourceText,
        cancel: &CancellationToken,
    ) -> Result<Result<Arc<LiveUnit>, AnalysisError>, QueryError> {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        self.runs.fetch_add(1, Ordering::Relaxed);

        let workspace = self.workspace.clone();
        let path = path.to_path_buf();
        let worker_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            build_live_unit(&workspace, &path, &text, &worker_cancel)
        });

        let joined = tokio::select! {
            _ = cancel.cancelled() => return Err(QueryError::Cancelled),
            joined = handle => joined,
        };

        let built = match joined {
            Ok(built) => built,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => return Err(QueryError::Cancelled),
        };

        match built {
            Ok(unit) => Ok(Ok(unit)),
            Err(QueryError::Resolution { source, .. }) => Ok(Err(source)),
            Err(other) => Err(other),
        }
    }
}

impl std::fmt::Debug for LiveAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveAnalyzer")
            .field("in_flight", &self.in_flight.len())
            .field("runs", &self.runs)
            .finish()
    }
}

fn build_live_unit(
    workspace: &WorkspaceManager,
    path: &Path,
    text: &SourceText,
    cancel: &CancellationToken,
) -> Result<Arc<LiveUnit>, QueryError> {
    let resolution = |source: AnalysisError| QueryError::Resolution {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().ok_or_else(|| {
        resolution(AnalysisError::Unreadable {
            path: path.to_path_buf(),
            message: "path has no parent directory".into(),
        })
    })?;

    let package = Package::load_with_overlay(dir, Some((path, text))).map_err(&resolution)?;
    let unit = package.unit(path).cloned().ok_or_else(|| {
        resolution(AnalysisError::Unreadable {
            path: path.to_path_buf(),
            message: "file missing from its package".into(),
        })
    })?;

    if unit.package_name().is_none() {
        return Err(resolution(AnalysisError::MissingPackage {
            path: path.to_path_buf(),
        }));
    }

    // Resolve imports against the published index first, loading from
    // disk only the packages the index does not know yet. Imports that
    // resolve to nothing are left out; referencing them just yields no
    // results.
    let index = workspace.index();
    let mut deps = HashMap::new();
    for import in unit.symbols.imports() {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        let import_path = &*import.path;
        if deps.contains_key(import_path) {
            continue;
        }
        if let Some(dep) = index.package_by_import(import_path) {
            deps.insert(import_path.to_string(), dep);
            continue;
        }
        let Some(dep_dir) = workspace.resolve_import_dir(import_path) else {
            debug!("Import {import_path:?} does not resolve to a package");
            continue;
        };
        match Package::load(&dep_dir) {
            Ok(dep) => {
                deps.insert(import_path.to_string(), dep);
            }
            Err(err) => debug!("Import {import_path:?} failed to load: {err}"),
        }
    }

    Ok(Arc::new(LiveUnit {
        package,
        unit,
        deps,
    }))
}
