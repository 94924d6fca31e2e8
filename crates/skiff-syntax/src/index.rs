//! Per-file symbol table for Skiff files.
//!
//! Built once per parse; the server aggregates these across the files of a
//! package for scope and member lookups.

use crate::TextRange;
use crate::ast::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Coarse category of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Method,
    Variable,
    Constant,
    Type,
    Field,
}

/// A declared symbol with its location and a rendered detail string.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Arc<str>,
    pub kind: SymbolKind,
    /// Range of the whole declaration.
    pub range: TextRange,
    /// Range of just the name.
    pub name_range: TextRange,
    /// Rendered signature or type string, when one is known.
    pub detail: Option<String>,
    pub exported: bool,
    /// Receiver type for methods, struct type for fields.
    pub parent: Option<Arc<str>>,
    /// Named base of a variable's or constant's type, for member lookups
    /// through package-level values.
    pub base_type: Option<Arc<str>>,
}

/// One import of the file, with the name it is referred to by.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub local_name: Arc<str>,
    pub path: Arc<str>,
    /// Range of the path string literal, quotes included.
    pub path_range: TextRange,
    pub range: TextRange,
}

/// Symbol table built from one parsed source file.
#[derive(Debug, Default)]
pub struct FileSymbols {
    symbols: Vec<Symbol>,
    top_level: HashMap<Arc<str>, usize>,
    imports: Vec<ImportRecord>,
}

impl FileSymbols {
    pub fn build(source: &SourceFile) -> Self {
        let mut index = Self::default();
        for import in &source.imports {
            index.imports.push(ImportRecord {
                local_name: Arc::from(import.local_name()),
                path: import.path.value.clone(),
                path_range: import.path.range,
                range: import.range,
            });
        }
        for decl in &source.decls {
            index.add_decl(decl);
        }
        index
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn imports(&self) -> &[ImportRecord] {
        &self.imports
    }

    pub fn find_import(&self, local_name: &str) -> Option<&ImportRecord> {
        self.imports.iter().find(|i| &*i.local_name == local_name)
    }

    /// Find a top-level symbol by name. Methods and fields are not
    /// top-level; see [`FileSymbols::members_of`].
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.top_level.get(name).map(|&idx| &self.symbols[idx])
    }

    /// All top-level symbols, in declaration order.
    pub fn top_level(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.parent.is_none())
    }

    /// Fields and methods of the named type declared in this file.
    pub fn members_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Symbol> {
        self.symbols
            .iter()
            .filter(move |s| s.parent.as_deref() == Some(type_name))
    }

    /// The symbol whose name token covers the given offset, if any.
    pub fn symbol_at_name(&self, offset: u32) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name_range.contains(offset))
    }

    fn push(&mut self, symbol: Symbol) {
        let idx = self.symbols.len();
        if symbol.parent.is_none() && !symbol.name.is_empty() {
            self.top_level.entry(symbol.name.clone()).or_insert(idx);
        }
        self.symbols.push(symbol);
    }

    fn add_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Func(func) => self.add_func(func),
            Decl::Var(var) => self.add_value(
                &var.name,
                var.ty.as_ref(),
                var.init.as_ref(),
                var.range,
                SymbolKind::Variable,
            ),
            Decl::Const(c) => self.add_value(
                &c.name,
                c.ty.as_ref(),
                c.init.as_ref(),
                c.range,
                SymbolKind::Constant,
            ),
            Decl::Type(decl) => self.add_type(decl),
        }
    }

    fn add_func(&mut self, func: &FuncDecl) {
        let parent = func
            .receiver
            .as_ref()
            .and_then(|r| r.type_name())
            .map(Arc::from);
        let kind = if parent.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        self.push(Symbol {
            name: func.name.name.clone(),
            kind,
            range: func.range,
            name_range: func.name.range,
            detail: Some(func.sig.to_string()),
            exported: func.name.is_exported(),
            parent,
            base_type: None,
        });
    }

    fn add_value(
        &mut self,
        name: &Ident,
        ty: Option<&TypeExpr>,
        init: Option<&Expr>,
        range: TextRange,
        kind: SymbolKind,
    ) {
        let detail = value_detail(ty, init);
        let base_type = ty
            .and_then(TypeExpr::named_base)
            .filter(|n| n.qualifier.is_none())
            .map(|n| n.name.name.clone());
        self.push(Symbol {
            name: name.name.clone(),
            kind,
            range,
            name_range: name.range,
            detail,
            exported: name.is_exported(),
            parent: None,
            base_type,
        });
    }

    fn add_type(&mut self, decl: &TypeDecl) {
        self.push(Symbol {
            name: decl.name.name.clone(),
            kind: SymbolKind::Type,
            range: decl.range,
            name_range: decl.name.range,
            detail: Some(decl.ty.to_string()),
            exported: decl.name.is_exported(),
            parent: None,
            base_type: None,
        });

        if let TypeExpr::Struct(st) = &decl.ty {
            for field in &st.fields {
                self.push(Symbol {
                    name: field.name.name.clone(),
                    kind: SymbolKind::Field,
                    range: field.range,
                    name_range: field.name.range,
                    detail: Some(field.ty.to_string()),
                    exported: field.name.is_exported(),
                    parent: Some(decl.name.name.clone()),
                    base_type: None,
                });
            }
        }
    }
}

/// Type string for a `var`/`const`: the declared type, else the type the
/// initializer literal infers.
pub(crate) fn value_detail(ty: Option<&TypeExpr>, init: Option<&Expr>) -> Option<String> {
    if let Some(ty) = ty {
        return Some(ty.to_string());
    }
    match init {
        Some(Expr::Lit(lit)) => Some(lit.kind.type_name().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn build(source: &str) -> FileSymbols {
        FileSymbols::build(&parse(source).root)
    }

    #[test]
    fn index_functions_and_values() {
        let index = build(
            "package store

func Get(id int) string { return name }

var name string
const MaxItems = 100
",
        );

        let get = index.find("Get").unwrap();
        assert_eq!(get.kind, SymbolKind::Function);
        assert_eq!(get.detail.as_deref(), Some("func(id int) string"));
        assert!(get.exported);

        let name = index.find("name").unwrap();
        assert_eq!(name.kind, SymbolKind::Variable);
        assert_eq!(name.detail.as_deref(), Some("string"));
        assert!(!name.exported);

        let max = index.find("MaxItems").unwrap();
        assert_eq!(max.kind, SymbolKind::Constant);
        assert_eq!(max.detail.as_deref(), Some("int"));
    }

    #[test]
    fn index_struct_members() {
        let index = build(
            "package store

type Record struct {
    ID   int
    Name string
}

func (r Record) Label() string { return r.Name }
",
        );

        let record = index.find("Record").unwrap();
        assert_eq!(record.kind, SymbolKind::Type);

        let members: Vec<_> = index.members_of("Record").collect();
        assert_eq!(members.len(), 3);
        assert_eq!(&*members[0].name, "ID");
        assert_eq!(members[0].kind, SymbolKind::Field);
        assert_eq!(members[0].detail.as_deref(), Some("int"));
        assert_eq!(&*members[2].name, "Label");
        assert_eq!(members[2].kind, SymbolKind::Method);

        // Methods and fields are not in the top-level namespace.
        assert!(index.find("Label").is_none());
        assert!(index.find("ID").is_none());
    }

    #[test]
    fn index_imports() {
        let index = build("package p\n\nimport \"fmt\"\nimport h \"net/http\"\n");

        assert_eq!(index.imports().len(), 2);
        assert_eq!(&*index.find_import("fmt").unwrap().path, "fmt");
        assert_eq!(&*index.find_import("h").unwrap().path, "net/http");
        assert!(index.find_import("http").is_none());
    }

    #[test]
    fn index_base_type_of_values() {
        let index = build("package p\n\nvar rec Record\nvar recs []*Record\nvar n = 1\n");

        assert_eq!(index.find("rec").unwrap().base_type.as_deref(), Some("Record"));
        assert_eq!(
            index.find("recs").unwrap().base_type.as_deref(),
            Some("Record")
        );
        assert_eq!(index.find("n").unwrap().base_type, None);
        assert_eq!(index.find("n").unwrap().detail.as_deref(), Some("int"));
    }

    #[test]
    fn symbol_at_name_offset() {
        let source = "package p; func Run() {}";
        let index = build(source);
        let name_start = source.find("Run").unwrap() as u32;

        let symbol = index.symbol_at_name(name_start).unwrap();
        assert_eq!(&*symbol.name, "Run");
        assert!(index.symbol_at_name(0).is_none());
    }
}
