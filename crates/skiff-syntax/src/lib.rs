pub mod ast;
mod index;
mod kind;
mod lexer;
pub mod lookup;
mod parse;
mod parser;
mod text;

pub use index::{FileSymbols, ImportRecord, Symbol, SymbolKind};
pub use kind::TokenKind;
pub use lexer::{Lexer, Token, lex, lex_non_trivia};
pub use lookup::{
    CompletionContext, LocalVar, NodeAt, completion_context_at, ident_prefix, locals_at, node_at,
    reference_at,
};
pub use parse::{ErrorKind, ParseError, ParseResult};
pub use parser::parse;
pub use text::{OutOfRange, Position, SourceText, TextRange};

// Re-export commonly used AST types at crate root
pub use ast::SourceFile;
