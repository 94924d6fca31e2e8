use crate::ast::*;
use crate::lexer::{Token, lex};
use crate::parse::{ErrorKind, ParseError, ParseResult};
use crate::{TextRange, TokenKind};
use std::sync::Arc;

pub fn parse(source: &str) -> ParseResult {
    let tokens = lex(source);
    let mut parser = Parser::new(source, tokens);
    let root = parser.parse_source_file();
    ParseResult {
        root,
        errors: parser.errors,
        tokens: parser.tokens,
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    current_cache: Token,
    last_end: u32,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        let eof = Token {
            kind: TokenKind::Eof,
            range: TextRange::empty(source.len() as u32),
        };
        let current_cache = Self::find_non_trivia(&tokens, 0).unwrap_or(eof);
        Self {
            source,
            tokens,
            pos: 0,
            current_cache,
            last_end: 0,
            errors: Vec::new(),
        }
    }

    fn find_non_trivia(tokens: &[Token], start: usize) -> Option<Token> {
        tokens[start..].iter().find(|t| !t.kind.is_trivia()).copied()
    }

    fn eof_token(&self) -> Token {
        Token {
            kind: TokenKind::Eof,
            range: TextRange::empty(self.source.len() as u32),
        }
    }

    fn current(&self) -> Token {
        self.current_cache
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_cache.kind == kind
    }

    fn at_eof(&self) -> bool {
        self.current_cache.kind == TokenKind::Eof
    }

    /// Peek `n` non-trivia tokens past the current one.
    fn peek(&self, mut n: usize) -> Token {
        let mut idx = self.pos;
        let mut seen_current = false;
        while idx < self.tokens.len() {
            let tok = self.tokens[idx];
            if tok.kind.is_trivia() {
                idx += 1;
                continue;
            }
            if !seen_current {
                seen_current = true;
                idx += 1;
                continue;
            }
            if n == 1 {
                return tok;
            }
            n -= 1;
            idx += 1;
        }
        self.eof_token()
    }

    fn bump(&mut self) -> Token {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.pos += 1;
        }
        if self.pos < self.tokens.len() {
            let tok = self.tokens[self.pos];
            self.pos += 1;
            self.last_end = tok.range.end();
            self.current_cache =
                Self::find_non_trivia(&self.tokens, self.pos).unwrap_or(self.eof_token());
            tok
        } else {
            self.eof_token()
        }
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) { Some(self.bump()) } else { None }
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            let cur = self.current();
            let found = self.token_description(cur);
            self.errors.push(ParseError::new(
                format!("expected {}, found {}", Self::kind_description(kind), found),
                cur.range,
                ErrorKind::ExpectedToken(kind),
            ));
            None
        }
    }

    fn expect_closing(
        &mut self,
        close: TokenKind,
        construct: &str,
        opened_at: TextRange,
    ) -> Option<Token> {
        if self.at(close) {
            Some(self.bump())
        } else {
            let cur = self.current();
            self.errors
                .push(ParseError::unclosed(construct, opened_at, cur.range));
            None
        }
    }

    fn text(&self, range: TextRange) -> &'a str {
        range.slice(self.source)
    }

    fn token_description(&self, token: Token) -> String {
        match token.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Error => {
                // Error tokens may not be on char boundaries, so use get safely
                let start = token.range.start() as usize;
                let end = token.range.end() as usize;
                if let Some(text) = self.source.get(start..end) {
                    format!("unexpected character `{}`", text)
                } else {
                    "unexpected character".to_string()
                }
            }
            TokenKind::Ident => {
                format!("identifier `{}`", self.text(token.range))
            }
            TokenKind::Int | TokenKind::Float => {
                format!("number `{}`", self.text(token.range))
            }
            TokenKind::String => {
                format!("string {}", self.text(token.range))
            }
            _ if token.kind.is_keyword() => {
                format!("keyword `{}`", self.text(token.range))
            }
            _ => format!("`{}`", self.text(token.range)),
        }
    }

    fn kind_description(kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Ident => "identifier",
            TokenKind::Int => "integer",
            TokenKind::String => "string",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Eq => "`=`",
            TokenKind::Star => "`*`",
            TokenKind::Ellipsis => "`...`",
            _ => "token",
        }
    }

    fn error_expected(&mut self, expected: &str) {
        let cur = self.current();
        let found = self.token_description(cur);
        self.errors.push(ParseError::new(
            format!("expected {}, found {}", expected, found),
            cur.range,
            ErrorKind::Other,
        ));
    }

    fn skip_to_next_decl(&mut self) {
        while !self.at_eof() && !self.current().kind.can_start_decl() {
            self.bump();
        }
    }

    fn parse_source_file(&mut self) -> SourceFile {
        let start = self.current().range.start();

        let mut package = None;
        let mut imports = Vec::new();
        let mut decls = Vec::new();

        if self.at(TokenKind::PackageKw) {
            package = Some(self.parse_package_clause());
        } else {
            self.errors
                .push(ParseError::missing_package_clause(TextRange::empty(start)));
        }

        while !self.at_eof() {
            match self.current().kind {
                TokenKind::ImportKw => {
                    if let Some(import) = self.parse_import() {
                        imports.push(import);
                    }
                }
                TokenKind::FuncKw => decls.push(Decl::Func(self.parse_func_decl())),
                TokenKind::VarKw => {
                    let mut refs = Vec::new();
                    let (name, ty, init, range) = self.parse_value_decl(&mut refs);
                    decls.push(Decl::Var(VarDecl {
                        name,
                        ty,
                        init,
                        range,
                    }));
                }
                TokenKind::ConstKw => {
                    let mut refs = Vec::new();
                    let (name, ty, init, range) = self.parse_value_decl(&mut refs);
                    decls.push(Decl::Const(ConstDecl {
                        name,
                        ty,
                        init,
                        range,
                    }));
                }
                TokenKind::TypeKw => decls.push(Decl::Type(self.parse_type_decl())),
                TokenKind::PackageKw => {
                    let clause = self.parse_package_clause();
                    if package.is_none() {
                        package = Some(clause);
                    } else {
                        self.errors.push(ParseError::new(
                            "duplicate package clause",
                            clause.range,
                            ErrorKind::Other,
                        ));
                    }
                }
                TokenKind::Semicolon => {
                    self.bump();
                }
                _ => {
                    self.error_expected("declaration");
                    self.skip_to_next_decl();
                }
            }
        }

        let end = self.last_end.max(start);
        SourceFile {
            package,
            imports,
            decls,
            range: TextRange::new(start, end),
        }
    }

    /// `package name`
    fn parse_package_clause(&mut self) -> PackageClause {
        let start = self.bump().range.start();
        let name = self.parse_ident_or_missing();
        self.eat(TokenKind::Semicolon);
        PackageClause {
            range: TextRange::new(start, self.last_end),
            name,
        }
    }

    /// `import "path"` or `import alias "path"`
    fn parse_import(&mut self) -> Option<ImportDecl> {
        let start = self.bump().range.start();

        let alias = if self.at(TokenKind::Ident) && self.peek(1).kind == TokenKind::String {
            self.parse_ident()
        } else {
            None
        };

        if !self.at(TokenKind::String) {
            self.error_expected("import path string");
            return None;
        }
        let tok = self.bump();
        let path = ImportPath {
            value: Arc::from(string_value(self.text(tok.range))),
            range: tok.range,
        };
        self.eat(TokenKind::Semicolon);

        Some(ImportDecl {
            alias,
            path,
            range: TextRange::new(start, self.last_end),
        })
    }

    /// `func Name(params) results { ... }`, optionally with a receiver.
    fn parse_func_decl(&mut self) -> FuncDecl {
        let start = self.bump().range.start();

        let receiver = if self.at(TokenKind::LParen) {
            self.parse_receiver()
        } else {
            None
        };

        let name = self.parse_ident_or_missing();

        let sig_start = self.current().range.start();
        let (params, results) = self.parse_signature();
        let sig = FuncSig {
            params,
            results,
            range: TextRange::new(sig_start, self.last_end),
        };

        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_block())
        } else {
            None
        };
        self.eat(TokenKind::Semicolon);

        FuncDecl {
            receiver,
            name,
            sig,
            body,
            range: TextRange::new(start, self.last_end),
        }
    }

    /// `(name Type)` before a method name.
    fn parse_receiver(&mut self) -> Option<Receiver> {
        let open = self.bump().range;
        let name = self.parse_ident_or_missing();
        let ty = self.parse_type_expr()?;
        self.expect_closing(TokenKind::RParen, "receiver", open);
        Some(Receiver {
            range: TextRange::new(open.start(), self.last_end),
            name,
            ty,
        })
    }

    fn parse_signature(&mut self) -> (SmallVec4<Param>, FuncResults) {
        let params = match self.expect(TokenKind::LParen) {
            Some(open) => self.parse_params(open.range),
            None => SmallVec4::new(),
        };
        let results = self.parse_results();
        (params, results)
    }

    fn parse_params(&mut self, open: TextRange) -> SmallVec4<Param> {
        let mut params = SmallVec4::new();
        loop {
            match self.current().kind {
                TokenKind::RParen => {
                    self.bump();
                    return params;
                }
                TokenKind::Eof => {
                    self.errors.push(ParseError::unclosed(
                        "parameter list",
                        open,
                        self.current().range,
                    ));
                    return params;
                }
                TokenKind::Comma | TokenKind::Semicolon => {
                    self.bump();
                }
                _ => {
                    if let Some(param) = self.parse_param() {
                        params.push(param);
                    } else if !self.at(TokenKind::RParen) && !self.at_eof() {
                        self.bump();
                    }
                }
            }
        }
    }

    /// `name Type`, `name ...Type`, or a bare type for unnamed params.
    fn parse_param(&mut self) -> Option<Param> {
        let start = self.current().range.start();
        if self.at(TokenKind::Ident) && self.peek(1).kind.can_start_type() {
            let name = self.parse_ident_or_missing();
            let ty = self.parse_type_expr()?;
            let range = TextRange::new(name.range.start(), ty.range().end());
            return Some(Param { name, ty, range });
        }
        let ty = self.parse_type_expr()?;
        let range = TextRange::new(start, ty.range().end());
        Some(Param {
            name: Ident::new("", TextRange::empty(start)),
            ty,
            range,
        })
    }

    fn parse_results(&mut self) -> FuncResults {
        if self.at(TokenKind::LParen) {
            let open = self.bump().range;
            return FuncResults::Named(self.parse_params(open));
        }
        if self.current().kind.can_start_type() {
            if let Some(ty) = self.parse_type_expr() {
                return FuncResults::Single(ty);
            }
        }
        FuncResults::None
    }

    /// Shared by `var` and `const`, at top level and inside blocks.
    /// References in the initializer are pushed into `refs`.
    fn parse_value_decl(
        &mut self,
        refs: &mut Vec<RefExpr>,
    ) -> (Ident, Option<TypeExpr>, Option<Expr>, TextRange) {
        let start = self.bump().range.start();
        let name = self.parse_ident_or_missing();

        let mut ty = None;
        if !self.at(TokenKind::Eq) && self.current().kind.can_start_type() {
            ty = self.parse_type_expr();
        }

        let mut init = None;
        if self.eat(TokenKind::Eq).is_some() {
            init = Some(self.parse_expr(refs));
        }
        self.eat(TokenKind::Semicolon);

        (name, ty, init, TextRange::new(start, self.last_end))
    }

    /// `type Name Type`
    fn parse_type_decl(&mut self) -> TypeDecl {
        let start = self.bump().range.start();
        let name = self.parse_ident_or_missing();
        let ty = match self.parse_type_expr() {
            Some(ty) => ty,
            None => {
                let at = self.current().range.start();
                TypeExpr::Named(NamedType {
                    qualifier: None,
                    name: Ident::new("", TextRange::empty(at)),
                    range: TextRange::empty(at),
                })
            }
        };
        self.eat(TokenKind::Semicolon);
        TypeDecl {
            name,
            ty,
            range: TextRange::new(start, self.last_end),
        }
    }

    fn parse_type_expr(&mut self) -> Option<TypeExpr> {
        let tok = self.current();
        match tok.kind {
            TokenKind::Star => {
                self.bump();
                let inner = self.parse_type_expr()?;
                Some(TypeExpr::Pointer(Box::new(PointerType {
                    range: TextRange::new(tok.range.start(), inner.range().end()),
                    inner,
                })))
            }
            TokenKind::LBracket => {
                self.bump();
                self.expect(TokenKind::RBracket)?;
                let element = self.parse_type_expr()?;
                Some(TypeExpr::Slice(Box::new(SliceType {
                    range: TextRange::new(tok.range.start(), element.range().end()),
                    element,
                })))
            }
            TokenKind::Ellipsis => {
                self.bump();
                let inner = self.parse_type_expr()?;
                Some(TypeExpr::Variadic(Box::new(VariadicType {
                    range: TextRange::new(tok.range.start(), inner.range().end()),
                    inner,
                })))
            }
            TokenKind::StructKw => self.parse_struct_type(),
            TokenKind::FuncKw => {
                let start = self.bump().range.start();
                let (params, results) = self.parse_signature();
                Some(TypeExpr::Func(Box::new(FuncType {
                    params,
                    results,
                    range: TextRange::new(start, self.last_end),
                })))
            }
            TokenKind::Ident => {
                let name = self.parse_ident()?;
                if self.at(TokenKind::Dot) && self.peek(1).kind == TokenKind::Ident {
                    self.bump();
                    let member = self.parse_ident()?;
                    let range = TextRange::new(name.range.start(), member.range.end());
                    return Some(TypeExpr::Named(NamedType {
                        qualifier: Some(name),
                        name: member,
                        range,
                    }));
                }
                let range = name.range;
                Some(TypeExpr::Named(NamedType {
                    qualifier: None,
                    name,
                    range,
                }))
            }
            _ => {
                self.errors.push(ParseError::expected_type(tok.range));
                None
            }
        }
    }

    /// `struct { Name Type; ... }`
    fn parse_struct_type(&mut self) -> Option<TypeExpr> {
        let start = self.bump().range.start();
        let open = self.expect(TokenKind::LBrace)?.range;

        let mut fields = SmallVec8::new();
        loop {
            match self.current().kind {
                TokenKind::RBrace => {
                    let end = self.bump().range.end();
                    return Some(TypeExpr::Struct(Box::new(StructType {
                        fields,
                        range: TextRange::new(start, end),
                    })));
                }
                TokenKind::Eof => {
                    self.errors
                        .push(ParseError::unclosed("struct", open, self.current().range));
                    return Some(TypeExpr::Struct(Box::new(StructType {
                        fields,
                        range: TextRange::new(start, self.last_end),
                    })));
                }
                TokenKind::Semicolon | TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::Ident => {
                    let name = self.parse_ident_or_missing();
                    let Some(ty) = self.parse_type_expr() else {
                        continue;
                    };
                    let range = TextRange::new(name.range.start(), ty.range().end());
                    fields.push(FieldDecl { name, ty, range });
                }
                _ => {
                    self.error_expected("field name");
                    self.bump();
                }
            }
        }
    }

    /// A braced block. Bodies are parsed loosely: declarations, nesting
    /// and name references are kept, everything else is skipped without
    /// complaint.
    fn parse_block(&mut self) -> Block {
        let open = self.bump().range;
        let mut stmts = Vec::new();

        loop {
            match self.current().kind {
                TokenKind::RBrace => {
                    let end = self.bump().range.end();
                    return Block {
                        stmts,
                        range: TextRange::new(open.start(), end),
                    };
                }
                TokenKind::Eof => {
                    self.errors
                        .push(ParseError::unclosed("block", open, self.current().range));
                    return Block {
                        stmts,
                        range: TextRange::new(open.start(), self.last_end.max(open.end())),
                    };
                }
                TokenKind::VarKw => {
                    let mut refs = Vec::new();
                    let (name, ty, init, range) = self.parse_value_decl(&mut refs);
                    stmts.push(Stmt::Var(VarDecl {
                        name,
                        ty,
                        init,
                        range,
                    }));
                    stmts.extend(refs.into_iter().map(Stmt::Ref));
                }
                TokenKind::ConstKw => {
                    let mut refs = Vec::new();
                    let (name, ty, init, range) = self.parse_value_decl(&mut refs);
                    stmts.push(Stmt::Const(ConstDecl {
                        name,
                        ty,
                        init,
                        range,
                    }));
                    stmts.extend(refs.into_iter().map(Stmt::Ref));
                }
                TokenKind::LBrace => {
                    stmts.push(Stmt::Block(self.parse_block()));
                }
                TokenKind::Ident => {
                    let mut refs = Vec::new();
                    self.parse_expr(&mut refs);
                    stmts.extend(refs.into_iter().map(Stmt::Ref));
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// A loose expression: operands joined by binary operators. Every
    /// identifier operand is recorded into `refs`; the returned value
    /// only keeps the shapes type inference needs.
    fn parse_expr(&mut self, refs: &mut Vec<RefExpr>) -> Expr {
        let start = self.current().range.start();
        let Some(first) = self.parse_operand(refs) else {
            self.error_expected("expression");
            return Expr::Opaque(TextRange::empty(start));
        };

        let mut compound = false;
        while self.at_binary_op() {
            self.bump();
            compound = true;
            if self.parse_operand(refs).is_none() {
                self.error_expected("expression");
                break;
            }
        }

        if compound {
            Expr::Opaque(TextRange::new(start, self.last_end))
        } else {
            first
        }
    }

    fn at_binary_op(&self) -> bool {
        matches!(
            self.current_cache.kind,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Le
                | TokenKind::Ge
                | TokenKind::AmpAmp
                | TokenKind::PipePipe
                | TokenKind::Amp
                | TokenKind::Pipe
        )
    }

    fn at_operand_start(&self) -> bool {
        matches!(
            self.current_cache.kind,
            TokenKind::Ident
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::LParen
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Star
                | TokenKind::Amp
        )
    }

    fn parse_operand(&mut self, refs: &mut Vec<RefExpr>) -> Option<Expr> {
        let tok = self.current();
        match tok.kind {
            TokenKind::Int => {
                self.bump();
                Some(Expr::Lit(Literal {
                    kind: LitKind::Int,
                    range: tok.range,
                }))
            }
            TokenKind::Float => {
                self.bump();
                Some(Expr::Lit(Literal {
                    kind: LitKind::Float,
                    range: tok.range,
                }))
            }
            TokenKind::String => {
                self.bump();
                Some(Expr::Lit(Literal {
                    kind: LitKind::String,
                    range: tok.range,
                }))
            }
            TokenKind::Ident => {
                match self.text(tok.range) {
                    "true" | "false" => {
                        self.bump();
                        return Some(Expr::Lit(Literal {
                            kind: LitKind::Bool,
                            range: tok.range,
                        }));
                    }
                    "nil" => {
                        self.bump();
                        return Some(Expr::Opaque(tok.range));
                    }
                    _ => {}
                }

                let first = self.parse_ident()?;
                let mut reference = RefExpr {
                    qualifier: None,
                    name: first,
                    range: tok.range,
                };
                if self.at(TokenKind::Dot) && self.peek(1).kind == TokenKind::Ident {
                    self.bump();
                    let member_tok = self.current();
                    let member = self.parse_ident()?;
                    reference = RefExpr {
                        qualifier: Some(reference.name),
                        name: member,
                        range: TextRange::new(tok.range.start(), member_tok.range.end()),
                    };
                }
                refs.push(reference.clone());

                if self.at(TokenKind::LParen) {
                    let open = self.bump().range;
                    self.parse_call_args(refs, open);
                    return Some(Expr::Opaque(TextRange::new(
                        tok.range.start(),
                        self.last_end,
                    )));
                }
                Some(Expr::Ref(reference))
            }
            TokenKind::LParen => {
                let open = self.bump().range;
                let inner = self.parse_expr(refs);
                self.expect_closing(TokenKind::RParen, "parenthesized expression", open);
                Some(inner)
            }
            TokenKind::Minus | TokenKind::Bang | TokenKind::Star | TokenKind::Amp => {
                self.bump();
                let inner = self.parse_operand(refs)?;
                Some(match inner {
                    Expr::Lit(lit) if matches!(lit.kind, LitKind::Int | LitKind::Float) => {
                        Expr::Lit(Literal {
                            kind: lit.kind,
                            range: TextRange::new(tok.range.start(), lit.range.end()),
                        })
                    }
                    other => {
                        Expr::Opaque(TextRange::new(tok.range.start(), other.range().end()))
                    }
                })
            }
            _ => None,
        }
    }

    fn parse_call_args(&mut self, refs: &mut Vec<RefExpr>, open: TextRange) {
        loop {
            match self.current().kind {
                TokenKind::RParen => {
                    self.bump();
                    return;
                }
                TokenKind::Eof => {
                    self.errors
                        .push(ParseError::unclosed("call", open, self.current().range));
                    return;
                }
                TokenKind::Comma => {
                    self.bump();
                }
                _ if self.at_operand_start() => {
                    self.parse_expr(refs);
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_ident(&mut self) -> Option<Ident> {
        if self.at(TokenKind::Ident) {
            let tok = self.bump();
            Some(Ident::new(self.text(tok.range), tok.range))
        } else {
            None
        }
    }

    fn parse_ident_or_missing(&mut self) -> Ident {
        match self.parse_ident() {
            Some(ident) => ident,
            None => {
                let range = self.current().range;
                self.errors.push(ParseError::expected_ident(range));
                Ident::new("", TextRange::empty(range.start()))
            }
        }
    }
}

/// Strip the surrounding quotes from a string token's text. The closing
/// quote may be missing while the user is still typing.
fn string_value(text: &str) -> &str {
    let s = text.strip_prefix('"').unwrap_or(text);
    s.strip_suffix('"').unwrap_or(s)
}
