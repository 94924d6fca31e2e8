//! Position-addressed queries over a parsed file.
//!
//! Everything here takes the exact source text the tree was parsed from;
//! offsets from any other text version are meaningless.

use crate::TextRange;
use crate::ast::*;

/// What is being completed at an offset, with the partial text already
/// typed and the range it should be replaced over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext<'a> {
    /// Inside an import path string.
    ImportPath { prefix: &'a str, replace: TextRange },
    /// After `qualifier.`.
    Member {
        qualifier: &'a str,
        prefix: &'a str,
        replace: TextRange,
    },
    /// Anywhere else.
    Scope { prefix: &'a str, replace: TextRange },
}

/// Classify the completion context at `offset`.
pub fn completion_context_at<'a>(
    root: &SourceFile,
    source: &'a str,
    offset: u32,
) -> CompletionContext<'a> {
    for import in &root.imports {
        if let Some((prefix, replace)) = import_path_prefix(import, source, offset) {
            return CompletionContext::ImportPath { prefix, replace };
        }
    }

    let (start, prefix) = ident_prefix(source, offset);
    if start > 0 && source.as_bytes()[start as usize - 1] == b'.' {
        let (_, qualifier) = ident_prefix(source, start - 1);
        if !qualifier.is_empty() {
            return CompletionContext::Member {
                qualifier,
                prefix,
                replace: TextRange::new(start, offset),
            };
        }
    }

    CompletionContext::Scope {
        prefix,
        replace: TextRange::new(start, offset),
    }
}

/// If `offset` sits inside the import's path string, the content typed
/// between the opening quote and the offset.
fn import_path_prefix<'a>(
    import: &ImportDecl,
    source: &'a str,
    offset: u32,
) -> Option<(&'a str, TextRange)> {
    let range = import.path.range;
    let content_start = import.path.content_start();
    let mut content_end = range.end();
    if range.len() >= 2 && source.as_bytes().get(range.end() as usize - 1) == Some(&b'"') {
        content_end -= 1;
    }
    if offset < content_start || offset > content_end {
        return None;
    }
    let prefix = &source[content_start as usize..offset as usize];
    Some((prefix, TextRange::new(content_start, offset)))
}

/// The identifier characters immediately before `offset` and where they
/// start. Empty at a word boundary.
pub fn ident_prefix(source: &str, offset: u32) -> (u32, &str) {
    let bytes = source.as_bytes();
    let mut start = offset.min(source.len() as u32);
    while start > 0 {
        let c = bytes[start as usize - 1];
        if c.is_ascii_alphanumeric() || c == b'_' {
            start -= 1;
        } else {
            break;
        }
    }
    (start, &source[start as usize..offset as usize])
}

/// A local binding visible somewhere inside a function body.
#[derive(Debug, Clone)]
pub struct LocalVar<'a> {
    pub name: &'a Ident,
    pub ty: Option<&'a TypeExpr>,
    /// Literal kind of the initializer, for type inference when no type
    /// was written.
    pub lit: Option<LitKind>,
    pub constant: bool,
}

/// Locals in scope at `offset`: the enclosing function's receiver and
/// parameters, plus `var`/`const` statements declared before the offset
/// in the enclosing block chain.
pub fn locals_at(root: &SourceFile, offset: u32) -> Vec<LocalVar<'_>> {
    let mut out = Vec::new();
    for decl in &root.decls {
        let Decl::Func(func) = decl else { continue };
        let Some(body) = &func.body else { continue };
        if !body.range.contains_inclusive(offset) {
            continue;
        }
        if let Some(receiver) = &func.receiver {
            out.push(LocalVar {
                name: &receiver.name,
                ty: Some(&receiver.ty),
                lit: None,
                constant: false,
            });
        }
        for param in &func.sig.params {
            if !param.name.name.is_empty() {
                out.push(LocalVar {
                    name: &param.name,
                    ty: Some(&param.ty),
                    lit: None,
                    constant: false,
                });
            }
        }
        collect_block_locals(body, offset, &mut out);
        break;
    }
    out
}

fn collect_block_locals<'a>(block: &'a Block, offset: u32, out: &mut Vec<LocalVar<'a>>) {
    for stmt in &block.stmts {
        match stmt {
            Stmt::Var(var) if var.range.end() <= offset => out.push(LocalVar {
                name: &var.name,
                ty: var.ty.as_ref(),
                lit: init_lit(var.init.as_ref()),
                constant: false,
            }),
            Stmt::Const(c) if c.range.end() <= offset => out.push(LocalVar {
                name: &c.name,
                ty: c.ty.as_ref(),
                lit: init_lit(c.init.as_ref()),
                constant: true,
            }),
            Stmt::Block(nested) if nested.range.contains_inclusive(offset) => {
                collect_block_locals(nested, offset, out);
            }
            _ => {}
        }
    }
}

fn init_lit(init: Option<&Expr>) -> Option<LitKind> {
    match init {
        Some(Expr::Lit(lit)) => Some(lit.kind),
        _ => None,
    }
}

/// The syntax under an offset, for hover and go-to-definition.
#[derive(Debug, Clone)]
pub enum NodeAt<'a> {
    /// A name reference inside a body.
    Ref(&'a RefExpr),
    /// A named type in a type position.
    TypeRef(&'a NamedType),
    /// A declaration's own name (including locals, fields, params).
    DeclName(&'a Ident),
    /// An import declaration (path string or alias).
    Import(&'a ImportDecl),
}

/// Find the most specific node at a byte offset.
pub fn node_at(root: &SourceFile, offset: u32) -> Option<NodeAt<'_>> {
    for import in &root.imports {
        if let Some(alias) = &import.alias {
            if alias.range.contains(offset) {
                return Some(NodeAt::Import(import));
            }
        }
        if import.path.range.contains(offset) {
            return Some(NodeAt::Import(import));
        }
    }

    for decl in &root.decls {
        if !decl.range().contains_inclusive(offset) {
            continue;
        }
        return node_at_decl(decl, offset);
    }

    None
}

/// A name reference covering the offset, when the node there is one.
pub fn reference_at(root: &SourceFile, offset: u32) -> Option<&RefExpr> {
    match node_at(root, offset) {
        Some(NodeAt::Ref(r)) => Some(r),
        _ => None,
    }
}

fn node_at_decl(decl: &Decl, offset: u32) -> Option<NodeAt<'_>> {
    if decl.name().range.contains(offset) {
        return Some(NodeAt::DeclName(decl.name()));
    }
    match decl {
        Decl::Func(func) => node_at_func(func, offset),
        Decl::Var(var) => node_at_value(var.ty.as_ref(), var.init.as_ref(), offset),
        Decl::Const(c) => node_at_value(c.ty.as_ref(), c.init.as_ref(), offset),
        Decl::Type(decl) => node_at_type_expr(&decl.ty, offset),
    }
}

fn node_at_func(func: &FuncDecl, offset: u32) -> Option<NodeAt<'_>> {
    if let Some(receiver) = &func.receiver {
        if receiver.name.range.contains(offset) {
            return Some(NodeAt::DeclName(&receiver.name));
        }
        if let Some(node) = node_at_type_expr(&receiver.ty, offset) {
            return Some(node);
        }
    }
    if let Some(node) = node_at_params(&func.sig.params, offset) {
        return Some(node);
    }
    if let Some(node) = node_at_results(&func.sig.results, offset) {
        return Some(node);
    }
    func.body.as_ref().and_then(|body| node_at_block(body, offset))
}

fn node_at_params<'a>(params: &'a [Param], offset: u32) -> Option<NodeAt<'a>> {
    for param in params {
        if !param.range.contains(offset) {
            continue;
        }
        if param.name.range.contains(offset) && !param.name.name.is_empty() {
            return Some(NodeAt::DeclName(&param.name));
        }
        return node_at_type_expr(&param.ty, offset);
    }
    None
}

fn node_at_results(results: &FuncResults, offset: u32) -> Option<NodeAt<'_>> {
    match results {
        FuncResults::None => None,
        FuncResults::Single(ty) => node_at_type_expr(ty, offset),
        FuncResults::Named(params) => node_at_params(params, offset),
    }
}

fn node_at_value<'a>(
    ty: Option<&'a TypeExpr>,
    init: Option<&'a Expr>,
    offset: u32,
) -> Option<NodeAt<'a>> {
    if let Some(ty) = ty {
        if let Some(node) = node_at_type_expr(ty, offset) {
            return Some(node);
        }
    }
    match init {
        Some(Expr::Ref(r)) if r.range.contains(offset) => Some(NodeAt::Ref(r)),
        _ => None,
    }
}

fn node_at_type_expr(ty: &TypeExpr, offset: u32) -> Option<NodeAt<'_>> {
    if !ty.range().contains(offset) {
        return None;
    }
    match ty {
        TypeExpr::Named(named) => Some(NodeAt::TypeRef(named)),
        TypeExpr::Pointer(t) => node_at_type_expr(&t.inner, offset),
        TypeExpr::Slice(t) => node_at_type_expr(&t.element, offset),
        TypeExpr::Variadic(t) => node_at_type_expr(&t.inner, offset),
        TypeExpr::Struct(st) => {
            for field in &st.fields {
                if !field.range.contains(offset) {
                    continue;
                }
                if field.name.range.contains(offset) {
                    return Some(NodeAt::DeclName(&field.name));
                }
                return node_at_type_expr(&field.ty, offset);
            }
            None
        }
        TypeExpr::Func(f) => {
            node_at_params(&f.params, offset).or_else(|| node_at_results(&f.results, offset))
        }
    }
}

fn node_at_block(block: &Block, offset: u32) -> Option<NodeAt<'_>> {
    if !block.range.contains_inclusive(offset) {
        return None;
    }
    for stmt in &block.stmts {
        match stmt {
            Stmt::Var(var) => {
                if var.name.range.contains(offset) {
                    return Some(NodeAt::DeclName(&var.name));
                }
                if let Some(node) = node_at_value(var.ty.as_ref(), var.init.as_ref(), offset) {
                    return Some(node);
                }
            }
            Stmt::Const(c) => {
                if c.name.range.contains(offset) {
                    return Some(NodeAt::DeclName(&c.name));
                }
                if let Some(node) = node_at_value(c.ty.as_ref(), c.init.as_ref(), offset) {
                    return Some(node);
                }
            }
            Stmt::Block(nested) => {
                if let Some(node) = node_at_block(nested, offset) {
                    return Some(node);
                }
            }
            Stmt::Ref(r) => {
                if r.range.contains(offset) {
                    return Some(NodeAt::Ref(r));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn context(source: &str, offset: u32) -> CompletionContext<'_> {
        let result = parse(source);
        completion_context_at(&result.root, source, offset)
    }

    #[test]
    fn scope_context_with_prefix() {
        let source = "package p; func B() { A() }";
        let offset = source.find("A(").unwrap() as u32 + 1;

        let ctx = context(source, offset);
        assert_eq!(
            ctx,
            CompletionContext::Scope {
                prefix: "A",
                replace: TextRange::new(offset - 1, offset),
            }
        );
    }

    #[test]
    fn scope_context_at_word_boundary() {
        let source = "package p; func B() {  }";
        let offset = source.len() as u32 - 2;

        let ctx = context(source, offset);
        assert_eq!(
            ctx,
            CompletionContext::Scope {
                prefix: "",
                replace: TextRange::empty(offset),
            }
        );
    }

    #[test]
    fn member_context_after_dot() {
        let source = "package p; import \"fmt\"; func f() { fmt.Println() }";
        let end = source.find("Println").unwrap() as u32 + 7;

        let ctx = context(source, end);
        assert_eq!(
            ctx,
            CompletionContext::Member {
                qualifier: "fmt",
                prefix: "Println",
                replace: TextRange::new(end - 7, end),
            }
        );

        // Right after the dot, the prefix is empty.
        let dot = source.find(".P").unwrap() as u32 + 1;
        let ctx = context(source, dot);
        assert_eq!(
            ctx,
            CompletionContext::Member {
                qualifier: "fmt",
                prefix: "",
                replace: TextRange::empty(dot),
            }
        );
    }

    #[test]
    fn import_path_context() {
        // Unterminated, as typed.
        let source = "package p; import \"f";
        let ctx = context(source, 20);
        assert_eq!(
            ctx,
            CompletionContext::ImportPath {
                prefix: "f",
                replace: TextRange::new(19, 20),
            }
        );

        // Closed string; the cursor before the closing quote is inside.
        let source = "package p; import \"net/http\"";
        let end = source.len() as u32 - 1;
        let ctx = context(source, end);
        assert_eq!(
            ctx,
            CompletionContext::ImportPath {
                prefix: "net/http",
                replace: TextRange::new(19, end),
            }
        );

        // Past the closing quote is not path context.
        let ctx = context(source, source.len() as u32);
        assert!(matches!(ctx, CompletionContext::Scope { .. }));
    }

    #[test]
    fn locals_include_params_and_prior_vars() {
        let source = "package p

func f(id int) {
    var a = 1
    a
    var b = 2
}
";
        let result = parse(source);
        let offset = source.find("\n    a").unwrap() as u32 + 5;

        let locals = locals_at(&result.root, offset);
        let names: Vec<_> = locals.iter().map(|l| &*l.name.name).collect();
        // `b` is declared after the offset.
        assert_eq!(names, vec!["id", "a"]);
        assert!(locals[0].ty.is_some());
        assert_eq!(locals[1].lit, Some(LitKind::Int));
    }

    #[test]
    fn locals_respect_block_nesting() {
        let source = "package p

func f() {
    var outer = 1
    {
        var inner = 2
    }
}
";
        let result = parse(source);

        let inside = source.find("var inner").unwrap() as u32 + 14;
        let names: Vec<_> = locals_at(&result.root, inside)
            .iter()
            .map(|l| l.name.name.to_string())
            .collect();
        assert_eq!(names, vec!["outer", "inner"]);

        let after_block = source.rfind('}').unwrap() as u32;
        let names: Vec<_> = locals_at(&result.root, after_block)
            .iter()
            .map(|l| l.name.name.to_string())
            .collect();
        assert_eq!(names, vec!["outer"]);
    }

    #[test]
    fn node_at_reference_and_type() {
        let source = "package p; func f(r Record) { Run() }";
        let result = parse(source);

        let run = source.find("Run").unwrap() as u32 + 1;
        assert!(matches!(
            node_at(&result.root, run),
            Some(NodeAt::Ref(r)) if &*r.name.name == "Run"
        ));

        let record = source.find("Record").unwrap() as u32;
        assert!(matches!(
            node_at(&result.root, record),
            Some(NodeAt::TypeRef(n)) if &*n.name.name == "Record"
        ));
    }

    #[test]
    fn node_at_decl_name_and_import() {
        let source = "package p; import \"fmt\"; func Run() {}";
        let result = parse(source);

        let name = source.find("Run").unwrap() as u32;
        assert!(matches!(
            node_at(&result.root, name),
            Some(NodeAt::DeclName(ident)) if &*ident.name == "Run"
        ));

        let path = source.find("\"fmt\"").unwrap() as u32 + 2;
        assert!(matches!(
            node_at(&result.root, path),
            Some(NodeAt::Import(import)) if &*import.path.value == "fmt"
        ));
    }

    #[test]
    fn node_at_qualified_reference() {
        let source = "package p; import \"fmt\"; func f() { fmt.Println() }";
        let result = parse(source);

        let offset = source.find("Println").unwrap() as u32 + 2;
        let Some(NodeAt::Ref(r)) = node_at(&result.root, offset) else {
            panic!("expected reference");
        };
        assert_eq!(r.qualifier.as_ref().map(|q| &*q.name), Some("fmt"));
        assert_eq!(&*r.name.name, "Println");
    }
}
