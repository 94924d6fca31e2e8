//! Completion candidates for a resolved position.
//!
//! Candidates are produced fresh per query from the resolved view;
//! nothing here is cached.

use super::PackageView;
use skiff_syntax::{
    CompletionContext, OutOfRange, Position, SymbolKind, completion_context_at, locals_at,
};
use std::collections::HashSet;
use std::sync::Arc;

/// How a candidate is presented to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Function,
    Method,
    Field,
    Variable,
    Constant,
    Class,
    Module,
    Keyword,
}

impl CandidateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateKind::Function => "function",
            CandidateKind::Method => "method",
            CandidateKind::Field => "field",
            CandidateKind::Variable => "variable",
            CandidateKind::Constant => "constant",
            CandidateKind::Class => "class",
            CandidateKind::Module => "module",
            CandidateKind::Keyword => "keyword",
        }
    }

    /// Tie-break rank for candidates sharing a label.
    fn rank(self) -> u8 {
        match self {
            CandidateKind::Function => 0,
            CandidateKind::Method => 1,
            CandidateKind::Field => 2,
            CandidateKind::Variable => 3,
            CandidateKind::Constant => 4,
            CandidateKind::Class => 5,
            CandidateKind::Module => 6,
            CandidateKind::Keyword => 7,
        }
    }
}

impl From<SymbolKind> for CandidateKind {
    fn from(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Function => CandidateKind::Function,
            SymbolKind::Method => CandidateKind::Method,
            SymbolKind::Field => CandidateKind::Field,
            SymbolKind::Variable => CandidateKind::Variable,
            SymbolKind::Constant => CandidateKind::Constant,
            SymbolKind::Type => CandidateKind::Class,
        }
    }
}

/// One completion suggestion. Every candidate of one response carries
/// the same replacement range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: Arc<str>,
    pub kind: CandidateKind,
    /// Rendered signature or type string; empty when unknown.
    pub detail: String,
    pub start: Position,
    pub end: Position,
}

const BUILTIN_FUNCS: &[(&str, &str)] = &[
    ("len", "func(v any) int"),
    ("panic", "func(v any)"),
    ("print", "func(a ...any)"),
    ("println", "func(a ...any)"),
];

const BUILTIN_TYPES: &[&str] = &["any", "bool", "float", "int", "string"];

const KEYWORDS: &[&str] = &[
    "package", "import", "func", "var", "const", "type", "struct", "return", "if", "else", "for",
];

/// Collect candidates at an offset of the view's resolution text.
pub fn collect(view: &PackageView, offset: u32) -> Result<Vec<Candidate>, OutOfRange> {
    let unit = view.unit();
    let source = unit.text.as_str();

    let (entries, replace) = match completion_context_at(unit.root(), source, offset) {
        CompletionContext::ImportPath { prefix, replace } => {
            (import_path_entries(view, prefix), replace)
        }
        CompletionContext::Member {
            qualifier,
            prefix,
            replace,
        } => (member_entries(view, qualifier, prefix, offset), replace),
        CompletionContext::Scope { prefix, replace } => {
            (scope_entries(view, prefix, offset), replace)
        }
    };

    // The protocol range is validated once against the exact text the
    // tree was built from; all candidates share it.
    let (start, end) = unit.text.range_positions(replace)?;

    let mut candidates: Vec<Candidate> = entries
        .into_iter()
        .map(|(label, kind, detail)| Candidate {
            label,
            kind,
            detail,
            start,
            end,
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.label
            .cmp(&b.label)
            .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
    });
    Ok(candidates)
}

/// The test-oracle rendering: the first candidate's range (1-based),
/// then `label kind detail` entries.
pub fn render_candidates(candidates: &[Candidate]) -> String {
    let mut out = String::new();
    if let Some(first) = candidates.first() {
        out.push_str(&format!(
            "{}:{}-{}:{} ",
            first.start.line + 1,
            first.start.column + 1,
            first.end.line + 1,
            first.end.column + 1,
        ));
    }
    let entries: Vec<String> = candidates
        .iter()
        .map(|c| format!("{} {} {}", c.label, c.kind.as_str(), c.detail))
        .collect();
    out.push_str(&entries.join(", "));
    out
}

type Entry = (Arc<str>, CandidateKind, String);

fn import_path_entries(view: &PackageView, prefix: &str) -> Vec<Entry> {
    view.index()
        .import_paths()
        .iter()
        .filter(|p| p.starts_with(prefix))
        .map(|p| (Arc::from(p.as_str()), CandidateKind::Module, String::new()))
        .collect()
}

fn member_entries(view: &PackageView, qualifier: &str, prefix: &str, offset: u32) -> Vec<Entry> {
    let unit = view.unit();

    // An imported package's exported surface.
    if let Some(import) = unit.symbols.find_import(qualifier) {
        let Some(dep) = view.dep(&import.path) else {
            return Vec::new();
        };
        return dep
            .top_level()
            .filter(|(_, s)| s.exported && s.name.starts_with(prefix))
            .map(|(_, s)| symbol_entry(s))
            .collect();
    }

    // A value of a named struct type: its fields and methods.
    let base = locals_at(unit.root(), offset)
        .iter()
        .find(|l| &*l.name.name == qualifier)
        .and_then(|l| l.ty.and_then(|t| t.named_base()))
        .filter(|n| n.qualifier.is_none())
        .map(|n| n.name.name.clone())
        .or_else(|| {
            view.package()
                .find_symbol(qualifier)
                .and_then(|(_, s)| s.base_type.clone())
        });
    let Some(base) = base else { return Vec::new() };

    view.package()
        .members_of(&base)
        .filter(|(_, s)| s.name.starts_with(prefix))
        .map(|(_, s)| symbol_entry(s))
        .collect()
}

fn scope_entries(view: &PackageView, prefix: &str, offset: u32) -> Vec<Entry> {
    let unit = view.unit();
    let mut entries = Vec::new();
    let mut seen: HashSet<Arc<str>> = HashSet::new();
    let mut add = |entries: &mut Vec<Entry>, entry: Entry| {
        if entry.0.starts_with(prefix) && seen.insert(entry.0.clone()) {
            entries.push(entry);
        }
    };

    // Precedence on duplicate names: locals shadow package symbols,
    // which shadow imports, builtins and keywords.
    for local in locals_at(unit.root(), offset) {
        let kind = if local.constant {
            CandidateKind::Constant
        } else {
            CandidateKind::Variable
        };
        let detail = local
            .ty
            .map(|t| t.to_string())
            .or_else(|| local.lit.map(|l| l.type_name().to_string()))
            .unwrap_or_default();
        add(&mut entries, (local.name.name.clone(), kind, detail));
    }

    for (_, symbol) in view.package().top_level() {
        add(&mut entries, symbol_entry(symbol));
    }

    for import in unit.symbols.imports() {
        add(
            &mut entries,
            (import.local_name.clone(), CandidateKind::Module, String::new()),
        );
    }

    for &(name, detail) in BUILTIN_FUNCS {
        add(
            &mut entries,
            (Arc::from(name), CandidateKind::Function, detail.to_string()),
        );
    }
    for &name in BUILTIN_TYPES {
        add(&mut entries, (Arc::from(name), CandidateKind::Class, String::new()));
    }
    for &name in KEYWORDS {
        add(&mut entries, (Arc::from(name), CandidateKind::Keyword, String::new()));
    }

    entries
}

fn symbol_entry(symbol: &skiff_syntax::Symbol) -> Entry {
    (
        symbol.name.clone(),
        symbol.kind.into(),
        symbol.detail.clone().unwrap_or_default(),
    )
}
