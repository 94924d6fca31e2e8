use crate::{TextRange, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.range.slice(source)
    }
}

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<u8> {
        self.source.get(self.pos as usize).copied()
    }

    fn peek(&self, offset: u32) -> Option<u8> {
        self.source.get((self.pos + offset) as usize).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.current()?;
        self.pos += 1;
        Some(c)
    }

    fn token(&self, kind: TokenKind, start: u32) -> Token {
        Token {
            kind,
            range: TextRange::new(start, self.pos),
        }
    }

    fn whitespace(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.current() {
            if is_whitespace(c) {
                self.bump();
            } else {
                break;
            }
        }
        self.token(TokenKind::Whitespace, start)
    }

    fn line_comment(&mut self) -> Token {
        let start = self.pos;
        self.bump(); // first /
        self.bump(); // second /

        while let Some(c) = self.current() {
            if c == b'\n' {
                break;
            }
            self.bump();
        }

        self.token(TokenKind::LineComment, start)
    }

    fn block_comment(&mut self) -> Token {
        let start = self.pos;
        self.bump(); // /
        self.bump(); // *

        // Track nesting depth for nested block comments
        let mut depth: u32 = 1;

        while depth > 0 {
            match self.current() {
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.bump(); // *
                    self.bump(); // /
                    depth -= 1;
                }
                Some(b'/') if self.peek(1) == Some(b'*') => {
                    self.bump(); // /
                    self.bump(); // *
                    depth += 1;
                }
                Some(_) => {
                    self.bump();
                }
                None => break, // unterminated, but don't fail
            }
        }

        self.token(TokenKind::BlockComment, start)
    }

    fn ident_or_keyword(&mut self) -> Token {
        let start = self.pos;

        while let Some(c) = self.current() {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }

        let text = &self.source[start as usize..self.pos as usize];
        let kind = keyword_or_ident(text);
        self.token(kind, start)
    }

    fn number(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }

        if self.current() == Some(b'.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump(); // .
            while let Some(c) = self.current() {
                if c.is_ascii_digit() {
                    self.bump();
                } else {
                    break;
                }
            }
            return self.token(TokenKind::Float, start);
        }

        self.token(TokenKind::Int, start)
    }

    fn string(&mut self) -> Token {
        let start = self.pos;
        self.bump(); // opening "

        while let Some(c) = self.current() {
            match c {
                b'"' => {
                    self.bump();
                    break;
                }
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                // Unterminated string stops at the line end.
                b'\n' => break,
                _ => {
                    self.bump();
                }
            }
        }

        self.token(TokenKind::String, start)
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.pos;
        self.bump();
        self.token(kind, start)
    }

    fn one_or_two(&mut self, second: u8, two: TokenKind, one: TokenKind) -> Token {
        let start = self.pos;
        self.bump();
        if self.current() == Some(second) {
            self.bump();
            self.token(two, start)
        } else {
            self.token(one, start)
        }
    }

    fn dot_or_ellipsis(&mut self) -> Token {
        let start = self.pos;
        self.bump(); // .
        if self.current() == Some(b'.') && self.peek(1) == Some(b'.') {
            self.bump();
            self.bump();
            self.token(TokenKind::Ellipsis, start)
        } else {
            self.token(TokenKind::Dot, start)
        }
    }

    fn slash_or_comment(&mut self) -> Token {
        match self.peek(1) {
            Some(b'/') => self.line_comment(),
            Some(b'*') => self.block_comment(),
            _ => self.single(TokenKind::Slash),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        let c = self.current()?;

        let token = match c {
            _ if is_whitespace(c) => self.whitespace(),

            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semicolon),
            b':' => self.single(TokenKind::Colon),
            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'*' => self.single(TokenKind::Star),
            b'%' => self.single(TokenKind::Percent),

            b'=' => self.one_or_two(b'=', TokenKind::EqEq, TokenKind::Eq),
            b'!' => self.one_or_two(b'=', TokenKind::NotEq, TokenKind::Bang),
            b'<' => self.one_or_two(b'=', TokenKind::Le, TokenKind::Lt),
            b'>' => self.one_or_two(b'=', TokenKind::Ge, TokenKind::Gt),
            b'&' => self.one_or_two(b'&', TokenKind::AmpAmp, TokenKind::Amp),
            b'|' => self.one_or_two(b'|', TokenKind::PipePipe, TokenKind::Pipe),

            b'.' => self.dot_or_ellipsis(),
            b'/' => self.slash_or_comment(),
            b'"' => self.string(),

            b'_' | b'a'..=b'z' | b'A'..=b'Z' => self.ident_or_keyword(),
            b'0'..=b'9' => self.number(),

            // Unknown character - emit error token
            _ => {
                let start = self.pos;
                self.bump();
                self.token(TokenKind::Error, start)
            }
        };

        Some(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn keyword_or_ident(text: &[u8]) -> TokenKind {
    match text {
        b"package" => TokenKind::PackageKw,
        b"import" => TokenKind::ImportKw,
        b"func" => TokenKind::FuncKw,
        b"var" => TokenKind::VarKw,
        b"const" => TokenKind::ConstKw,
        b"type" => TokenKind::TypeKw,
        b"struct" => TokenKind::StructKw,
        b"return" => TokenKind::ReturnKw,
        b"if" => TokenKind::IfKw,
        b"else" => TokenKind::ElseKw,
        b"for" => TokenKind::ForKw,
        _ => TokenKind::Ident,
    }
}

/// Lex the entire source into a vector of tokens.
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Lex the source, returning only non-trivia tokens.
/// Useful for parsing where whitespace/comments are not needed.
pub fn lex_non_trivia(source: &str) -> Vec<Token> {
    Lexer::new(source).filter(|t| !t.kind.is_trivia()).collect()
}
