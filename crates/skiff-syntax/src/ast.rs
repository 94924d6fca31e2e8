use crate::TextRange;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// SmallVec for small collections (params, results).
pub type SmallVec4<T> = SmallVec<[T; 4]>;
/// SmallVec for medium collections (struct fields).
pub type SmallVec8<T> = SmallVec<[T; 8]>;

/// An identifier with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: Arc<str>,
    pub range: TextRange,
}

impl Ident {
    pub fn new(name: impl AsRef<str>, range: TextRange) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            range,
        }
    }

    /// Exported names start with an uppercase ASCII letter.
    pub fn is_exported(&self) -> bool {
        self.name.starts_with(|c: char| c.is_ascii_uppercase())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Root of the AST - represents a single .sk file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceFile {
    pub package: Option<PackageClause>,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
    pub range: TextRange,
}

/// Package clause: `package store`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageClause {
    pub name: Ident,
    pub range: TextRange,
}

/// Import declaration: `import "net/http"` or `import h "net/http"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub alias: Option<Ident>,
    pub path: ImportPath,
    pub range: TextRange,
}

impl ImportDecl {
    /// The name the package is referred to by in this file.
    pub fn local_name(&self) -> &str {
        match &self.alias {
            Some(alias) => &alias.name,
            None => self.path.last_segment(),
        }
    }
}

/// An import path string literal. `range` covers the quotes; `value` is
/// the raw content between them (closing quote may be missing while the
/// user is still typing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    pub value: Arc<str>,
    pub range: TextRange,
}

impl ImportPath {
    pub fn last_segment(&self) -> &str {
        self.value.rsplit('/').next().unwrap_or(&self.value)
    }

    /// Byte offset of the first content character (past the opening quote).
    pub fn content_start(&self) -> u32 {
        self.range.start() + 1
    }
}

/// Top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    Var(VarDecl),
    Const(ConstDecl),
    Type(TypeDecl),
}

impl Decl {
    pub fn range(&self) -> TextRange {
        match self {
            Decl::Func(d) => d.range,
            Decl::Var(d) => d.range,
            Decl::Const(d) => d.range,
            Decl::Type(d) => d.range,
        }
    }

    pub fn name(&self) -> &Ident {
        match self {
            Decl::Func(d) => &d.name,
            Decl::Var(d) => &d.name,
            Decl::Const(d) => &d.name,
            Decl::Type(d) => &d.name,
        }
    }
}

/// Function declaration: `func Get(id int) string { ... }`
/// or a method: `func (r Record) Name() string { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub receiver: Option<Receiver>,
    pub name: Ident,
    pub sig: FuncSig,
    pub body: Option<Block>,
    pub range: TextRange,
}

/// Method receiver: `(r Record)`
#[derive(Debug, Clone, PartialEq)]
pub struct Receiver {
    pub name: Ident,
    pub ty: TypeExpr,
    pub range: TextRange,
}

impl Receiver {
    /// The receiver's base type name, through any pointer.
    pub fn type_name(&self) -> Option<&str> {
        self.ty.named_base().map(|n| &*n.name.name)
    }
}

/// Function signature: `(a ...any) (n int, err error)`
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub params: SmallVec4<Param>,
    pub results: FuncResults,
    pub range: TextRange,
}

/// A parameter or named result: `id int` or `a ...any`
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
    pub range: TextRange,
}

/// Function results.
#[derive(Debug, Clone, PartialEq)]
pub enum FuncResults {
    /// No return value
    None,
    /// Single anonymous result: `string`
    Single(TypeExpr),
    /// Named results: `(n int, err error)`
    Named(SmallVec4<Param>),
}

/// Variable declaration: `var x int` or `var x = 1`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub range: TextRange,
}

/// Constant declaration: `const Max = 100`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub range: TextRange,
}

/// Type declaration: `type Record struct { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub range: TextRange,
}

/// A type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// A named type: `int`, `Record`, `http.Client`
    Named(NamedType),
    /// Pointer type: `*T`
    Pointer(Box<PointerType>),
    /// Slice type: `[]T`
    Slice(Box<SliceType>),
    /// Variadic parameter type: `...T`
    Variadic(Box<VariadicType>),
    /// Struct type: `struct { ... }`
    Struct(Box<StructType>),
    /// Function type: `func(int) string`
    Func(Box<FuncType>),
}

impl TypeExpr {
    pub fn range(&self) -> TextRange {
        match self {
            TypeExpr::Named(t) => t.range,
            TypeExpr::Pointer(t) => t.range,
            TypeExpr::Slice(t) => t.range,
            TypeExpr::Variadic(t) => t.range,
            TypeExpr::Struct(t) => t.range,
            TypeExpr::Func(t) => t.range,
        }
    }

    /// The named type at the base of this expression, looking through
    /// pointers, slices and variadics.
    pub fn named_base(&self) -> Option<&NamedType> {
        match self {
            TypeExpr::Named(t) => Some(t),
            TypeExpr::Pointer(t) => t.inner.named_base(),
            TypeExpr::Slice(t) => t.element.named_base(),
            TypeExpr::Variadic(t) => t.inner.named_base(),
            TypeExpr::Struct(_) | TypeExpr::Func(_) => None,
        }
    }
}

/// A named type reference, optionally package-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    pub qualifier: Option<Ident>,
    pub name: Ident,
    pub range: TextRange,
}

/// Pointer type: `*T`
#[derive(Debug, Clone, PartialEq)]
pub struct PointerType {
    pub inner: TypeExpr,
    pub range: TextRange,
}

/// Slice type: `[]T`
#[derive(Debug, Clone, PartialEq)]
pub struct SliceType {
    pub element: TypeExpr,
    pub range: TextRange,
}

/// Variadic parameter type: `...T`
#[derive(Debug, Clone, PartialEq)]
pub struct VariadicType {
    pub inner: TypeExpr,
    pub range: TextRange,
}

/// Struct type: `struct { ID int; Name string }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub fields: SmallVec8<FieldDecl>,
    pub range: TextRange,
}

/// A struct field: `Name string`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub range: TextRange,
}

/// Function type: `func(int) string`
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub params: SmallVec4<Param>,
    pub results: FuncResults,
    pub range: TextRange,
}

/// An expression. Bodies are parsed loosely; only the shapes the
/// queries need survive as structure, the rest is opaque.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Literal),
    Ref(RefExpr),
    Opaque(TextRange),
}

impl Expr {
    pub fn range(&self) -> TextRange {
        match self {
            Expr::Lit(l) => l.range,
            Expr::Ref(r) => r.range,
            Expr::Opaque(range) => *range,
        }
    }
}

/// A literal with enough kind information to infer a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub kind: LitKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    String,
    Bool,
}

impl LitKind {
    /// The builtin type this literal infers for an untyped declaration.
    pub fn type_name(self) -> &'static str {
        match self {
            LitKind::Int => "int",
            LitKind::Float => "float",
            LitKind::String => "string",
            LitKind::Bool => "bool",
        }
    }
}

/// A reference to a name, optionally package- or value-qualified:
/// `x` or `fmt.Println`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefExpr {
    pub qualifier: Option<Ident>,
    pub name: Ident,
    pub range: TextRange,
}

/// A braced block. Statements appear in source order; references inside
/// nested control flow are recorded flat, nested braces become nested
/// blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub range: TextRange,
}

/// A loosely-parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(VarDecl),
    Const(ConstDecl),
    Block(Block),
    Ref(RefExpr),
}

impl Stmt {
    pub fn range(&self) -> TextRange {
        match self {
            Stmt::Var(d) => d.range,
            Stmt::Const(d) => d.range,
            Stmt::Block(b) => b.range,
            Stmt::Ref(r) => r.range,
        }
    }
}

impl fmt::Display for FuncSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func")?;
        write_params(f, &self.params)?;
        match &self.results {
            FuncResults::None => Ok(()),
            FuncResults::Single(ty) => write!(f, " {ty}"),
            FuncResults::Named(results) => {
                f.write_str(" ")?;
                write_params(f, results)
            }
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.name.is_empty() {
            write!(f, "{}", self.ty)
        } else {
            write!(f, "{} {}", self.name, self.ty)
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(t) => match &t.qualifier {
                Some(q) => write!(f, "{q}.{}", t.name),
                None => write!(f, "{}", t.name),
            },
            TypeExpr::Pointer(t) => write!(f, "*{}", t.inner),
            TypeExpr::Slice(t) => write!(f, "[]{}", t.element),
            TypeExpr::Variadic(t) => write!(f, "...{}", t.inner),
            TypeExpr::Struct(t) => {
                if t.fields.is_empty() {
                    return f.write_str("struct {}");
                }
                f.write_str("struct { ")?;
                for (i, field) in t.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{} {}", field.name, field.ty)?;
                }
                f.write_str(" }")
            }
            TypeExpr::Func(t) => {
                f.write_str("func")?;
                write_params(f, &t.params)?;
                match &t.results {
                    FuncResults::None => Ok(()),
                    FuncResults::Single(ty) => write!(f, " {ty}"),
                    FuncResults::Named(results) => {
                        f.write_str(" ")?;
                        write_params(f, results)
                    }
                }
            }
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    f.write_str("(")?;
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{param}")?;
    }
    f.write_str(")")
}
