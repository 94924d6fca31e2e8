//! Position queries: resolve a (file, position) pair to an analyzed
//! view, then answer completion, hover and definition against it.
//!
//! Resolution is dual-path. The published [`GlobalIndex`] snapshot is
//! authoritative unless the caller asks for live-overlay semantics, in
//! which case the file is re-analyzed with its current overlay content.

pub mod candidates;
pub mod error;
pub mod live;

pub use candidates::{Candidate, CandidateKind, render_candidates};
pub use error::{AnalysisError, QueryError};
pub use live::{LiveAnalyzer, LiveUnit};

use crate::document::SharedDocumentStore;
use crate::workspace::{GlobalIndex, Package, SharedWorkspaceManager, SourceUnit, canonical};
use skiff_syntax::{NodeAt, Position, SourceText, Symbol, TextRange, locals_at, node_at};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The analyzed state a query runs against.
#[derive(Debug)]
pub enum PackageView {
    /// Served from the published index snapshot.
    Cached {
        package: Arc<Package>,
        unit: Arc<SourceUnit>,
        index: Arc<GlobalIndex>,
    },
    /// Served from a per-request live analysis.
    Live {
        live: Arc<LiveUnit>,
        index: Arc<GlobalIndex>,
    },
}

impl PackageView {
    pub fn package(&self) -> &Arc<Package> {
        match self {
            PackageView::Cached { package, .. } => package,
            PackageView::Live { live, .. } => &live.package,
        }
    }

    pub fn unit(&self) -> &Arc<SourceUnit> {
        match self {
            PackageView::Cached { unit, .. } => unit,
            PackageView::Live { live, .. } => &live.unit,
        }
    }

    pub fn index(&self) -> &GlobalIndex {
        match self {
            PackageView::Cached { index, .. } | PackageView::Live { index, .. } => index,
        }
    }

    /// The dependency package an import path resolves to in this view.
    pub fn dep(&self, import_path: &str) -> Option<Arc<Package>> {
        match self {
            PackageView::Cached { index, .. } => index.package_by_import(import_path),
            PackageView::Live { live, .. } => live.dep(import_path).cloned(),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, PackageView::Live { .. })
    }
}

/// A (file, position) pair resolved to a view and a byte offset valid
/// for that view's exact text.
#[derive(Debug)]
pub struct ResolvedPosition {
    pub view: PackageView,
    pub offset: u32,
}

/// Hover content for the symbol under a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverInfo {
    pub name: Arc<str>,
    pub kind: CandidateKind,
    /// Rendered signature or type string; empty when unknown.
    pub detail: String,
    pub start: Position,
    pub end: Position,
}

/// Where a symbol is declared.
#[derive(Debug)]
pub struct DefinitionTarget {
    pub unit: Arc<SourceUnit>,
    pub range: TextRange,
}

pub struct QueryEngine {
    workspace: SharedWorkspaceManager,
    documents: SharedDocumentStore,
    live: LiveAnalyzer,
}

impl QueryEngine {
    pub fn new(workspace: SharedWorkspaceManager, documents: SharedDocumentStore) -> Self {
        let live = LiveAnalyzer::new(workspace.clone());
        Self {
            workspace,
            documents,
            live,
        }
    }

    /// How many live analyses have actually run.
    pub fn analysis_runs(&self) -> usize {
        self.live.analysis_runs()
    }

    /// Resolve a position to an analyzed view.
    ///
    /// With `use_live_overlay` false the published index wins whenever
    /// it has the file, even if a newer overlay exists. With it true the
    /// index is skipped and the file is analyzed with overlay content
    /// (disk when no overlay is open).
    pub async fn resolve_position(
        &self,
        path: &Path,
        position: Position,
        use_live_overlay: bool,
        cancel: &CancellationToken,
    ) -> Result<ResolvedPosition, QueryError> {
        let path = canonical(path);
        if !self.workspace.contains(&path) {
            return Err(QueryError::UnsupportedLocation { path });
        }
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let index = self.workspace.index();
        if !use_live_overlay {
            if let Some((package, unit)) = index.lookup(&path) {
                let offset = unit.text.offset(position)?;
                return Ok(ResolvedPosition {
                    view: PackageView::Cached {
                        package,
                        unit,
                        index,
                    },
                    offset,
                });
            }
        }

        let text = match self.documents.text(&path) {
            Some(text) => text,
            None => read_disk(&path)?,
        };
        let live = self.live.analyze(&path, text, cancel).await?;
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let offset = live.unit.text.offset(position)?;
        Ok(ResolvedPosition {
            view: PackageView::Live { live, index },
            offset,
        })
    }

    pub async fn completion_at(
        &self,
        path: &Path,
        position: Position,
        use_live_overlay: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>, QueryError> {
        let resolved = self
            .resolve_position(path, position, use_live_overlay, cancel)
            .await?;
        Ok(candidates::collect(&resolved.view, resolved.offset)?)
    }

    pub async fn hover_at(
        &self,
        path: &Path,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Option<HoverInfo>, QueryError> {
        let resolved = self.resolve_position(path, position, false, cancel).await?;
        let Some((origin, target)) = target_at(&resolved.view, resolved.offset) else {
            return Ok(None);
        };

        let (start, end) = resolved.view.unit().text.range_positions(origin)?;
        let info = match target {
            Target::Symbol { symbol, .. } => HoverInfo {
                name: symbol.name.clone(),
                kind: symbol.kind.into(),
                detail: symbol.detail.unwrap_or_default(),
                start,
                end,
            },
            Target::Local {
                name,
                detail,
                constant,
                ..
            } => HoverInfo {
                name,
                kind: if constant {
                    CandidateKind::Constant
                } else {
                    CandidateKind::Variable
                },
                detail,
                start,
                end,
            },
            Target::Module { name, import_path, .. } => HoverInfo {
                name,
                kind: CandidateKind::Module,
                detail: import_path,
                start,
                end,
            },
        };
        Ok(Some(info))
    }

    pub async fn definition_at(
        &self,
        path: &Path,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Option<DefinitionTarget>, QueryError> {
        let resolved = self.resolve_position(path, position, false, cancel).await?;
        let Some((_, target)) = target_at(&resolved.view, resolved.offset) else {
            return Ok(None);
        };

        let target = match target {
            Target::Symbol { unit, symbol } => Some(DefinitionTarget {
                unit,
                range: symbol.name_range,
            }),
            Target::Local { range, .. } => Some(DefinitionTarget {
                unit: resolved.view.unit().clone(),
                range,
            }),
            Target::Module { unit, .. } => unit.map(|unit| DefinitionTarget {
                unit,
                range: TextRange::empty(0),
            }),
        };
        Ok(target)
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("live", &self.live)
            .finish()
    }
}

fn read_disk(path: &Path) -> Result<SourceText, QueryError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(SourceText::new(content)),
        Err(err) => Err(QueryError::Resolution {
            path: path.to_path_buf(),
            source: AnalysisError::Unreadable {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
        }),
    }
}

/// What hover/definition resolved to.
enum Target {
    /// A declared symbol, possibly in another file or package.
    Symbol {
        unit: Arc<SourceUnit>,
        symbol: Symbol,
    },
    /// A local binding in the current unit.
    Local {
        name: Arc<str>,
        detail: String,
        constant: bool,
        range: TextRange,
    },
    /// An imported package.
    Module {
        name: Arc<str>,
        import_path: String,
        unit: Option<Arc<SourceUnit>>,
    },
}

/// The symbol under an offset, with the range of the token it was
/// reached through.
fn target_at(view: &PackageView, offset: u32) -> Option<(TextRange, Target)> {
    let unit = view.unit();
    match node_at(unit.root(), offset)? {
        NodeAt::Ref(r) => match &r.qualifier {
            Some(qualifier) if qualifier.range.contains(offset) => {
                Some((qualifier.range, qualifier_target(view, qualifier, offset)?))
            }
            Some(qualifier) => {
                let target = member_target(view, &qualifier.name, &r.name.name, offset)?;
                Some((r.name.range, target))
            }
            None => Some((r.name.range, value_target(view, &r.name.name, offset)?)),
        },
        NodeAt::TypeRef(named) => {
            let origin = named.name.range;
            match &named.qualifier {
                Some(qualifier) => {
                    let target = member_target(view, &qualifier.name, &named.name.name, offset)?;
                    Some((origin, target))
                }
                None => {
                    let (decl_unit, symbol) = view.package().find_symbol(&named.name.name)?;
                    Some((
                        origin,
                        Target::Symbol {
                            unit: decl_unit.clone(),
                            symbol: symbol.clone(),
                        },
                    ))
                }
            }
        }
        NodeAt::DeclName(ident) => {
            let origin = ident.range;
            if let Some(symbol) = unit.symbols.symbol_at_name(offset) {
                return Some((
                    origin,
                    Target::Symbol {
                        unit: unit.clone(),
                        symbol: symbol.clone(),
                    },
                ));
            }
            // A local declaration's own name.
            let locals = locals_at(unit.root(), ident.range.end());
            let local = locals.iter().find(|l| l.name.range == ident.range)?;
            Some((origin, local_target(local)))
        }
        NodeAt::Import(import) => {
            let origin = import.path.range;
            let dep = view.dep(&import.path.value);
            Some((
                origin,
                Target::Module {
                    name: Arc::from(import.local_name()),
                    import_path: import.path.value.to_string(),
                    unit: dep.and_then(|d| d.units.first().cloned()),
                },
            ))
        }
    }
}

/// Resolve the qualifier itself: an imported package, else a value.
fn qualifier_target(
    view: &PackageView,
    qualifier: &skiff_syntax::ast::Ident,
    offset: u32,
) -> Option<Target> {
    let unit = view.unit();
    if let Some(import) = unit.symbols.find_import(&qualifier.name) {
        let dep = view.dep(&import.path);
        return Some(Target::Module {
            name: import.local_name.clone(),
            import_path: import.path.to_string(),
            unit: dep.and_then(|d| d.units.first().cloned()),
        });
    }
    value_target(view, &qualifier.name, offset)
}

/// Resolve a plain name: locals shadow package symbols.
fn value_target(view: &PackageView, name: &str, offset: u32) -> Option<Target> {
    let unit = view.unit();
    if let Some(local) = locals_at(unit.root(), offset)
        .iter()
        .find(|l| &*l.name.name == name)
    {
        return Some(local_target(local));
    }
    let (decl_unit, symbol) = view.package().find_symbol(name)?;
    Some(Target::Symbol {
        unit: decl_unit.clone(),
        symbol: symbol.clone(),
    })
}

/// Resolve `qualifier.name`: an imported package's export, or a member
/// of the qualifier's named struct type.
fn member_target(view: &PackageView, qualifier: &str, name: &str, offset: u32) -> Option<Target> {
    let unit = view.unit();

    if let Some(import) = unit.symbols.find_import(qualifier) {
        let dep = view.dep(&import.path)?;
        let (dep_unit, symbol) = dep.find_symbol(name)?;
        if !symbol.exported {
            return None;
        }
        return Some(Target::Symbol {
            unit: dep_unit.clone(),
            symbol: symbol.clone(),
        });
    }

    let base = struct_base_of(view, qualifier, offset)?;
    let (member_unit, symbol) = view
        .package()
        .members_of(&base)
        .find(|(_, s)| &*s.name == name)?;
    Some(Target::Symbol {
        unit: member_unit.clone(),
        symbol: symbol.clone(),
    })
}

/// The named struct type behind a value qualifier, local or
/// package-level.
fn struct_base_of(view: &PackageView, qualifier: &str, offset: u32) -> Option<Arc<str>> {
    let unit = view.unit();
    locals_at(unit.root(), offset)
        .iter()
        .find(|l| &*l.name.name == qualifier)
        .and_then(|l| l.ty.and_then(|t| t.named_base()))
        .filter(|n| n.qualifier.is_none())
        .map(|n| n.name.name.clone())
        .or_else(|| {
            view.package()
                .find_symbol(qualifier)
                .and_then(|(_, s)| s.base_type.clone())
        })
}

fn local_target(local: &skiff_syntax::LocalVar<'_>) -> Target {
    let detail = local
        .ty
        .map(|t| t.to_string())
        .or_else(|| local.lit.map(|l| l.type_name().to_string()))
        .unwrap_or_default();
    Target::Local {
        name: local.name.name.clone(),
        detail,
        constant: local.constant,
        range: local.name.range,
    }
}
