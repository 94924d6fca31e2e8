/// Token kinds for Skiff.
///
/// Produced by the lexer; the parser consumes the non-trivia subset and
/// uses the classifier methods for recovery decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TokenKind {
    // Keywords
    PackageKw,
    ImportKw,
    FuncKw,
    VarKw,
    ConstKw,
    TypeKw,
    StructKw,
    ReturnKw,
    IfKw,
    ElseKw,
    ForKw,

    // Punctuation
    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Dot,      // .
    Semicolon, // ;
    Colon,    // :
    Eq,       // =
    EqEq,     // ==
    NotEq,    // !=
    Lt,       // <
    Gt,       // >
    Le,       // <=
    Ge,       // >=
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /
    Percent,  // %
    Amp,      // &
    AmpAmp,   // &&
    Pipe,     // |
    PipePipe, // ||
    Bang,     // !
    Ellipsis, // ...

    // Literals and identifiers
    Ident,
    Int,
    Float,
    String,

    // Trivia (ignored by parser)
    Whitespace,
    LineComment,
    BlockComment,

    // Special
    Error,
    Eof,
}

impl TokenKind {
    /// Returns true if this is trivia (whitespace or comments).
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// Returns true if this is a keyword.
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::PackageKw
                | TokenKind::ImportKw
                | TokenKind::FuncKw
                | TokenKind::VarKw
                | TokenKind::ConstKw
                | TokenKind::TypeKw
                | TokenKind::StructKw
                | TokenKind::ReturnKw
                | TokenKind::IfKw
                | TokenKind::ElseKw
                | TokenKind::ForKw
        )
    }

    /// Returns true if this token can start a top-level declaration.
    pub fn can_start_decl(self) -> bool {
        matches!(
            self,
            TokenKind::PackageKw
                | TokenKind::ImportKw
                | TokenKind::FuncKw
                | TokenKind::VarKw
                | TokenKind::ConstKw
                | TokenKind::TypeKw
        )
    }

    /// Returns true if this token can start a type expression.
    pub fn can_start_type(self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Star
                | TokenKind::LBracket
                | TokenKind::Ellipsis
                | TokenKind::StructKw
                | TokenKind::FuncKw
        )
    }
}
