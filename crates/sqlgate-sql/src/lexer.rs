//! Lexer for candidate SQL text.
//!
//! The lexer accepts a deliberately small lexical grammar. Comments are never
//! skipped: any comment marker outside a literal fails the whole candidate.
//! Whitespace is ASCII only, and non-ASCII characters are only legal inside
//! string literals and quoted identifiers.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use serde::Serialize;
use sqlgate_core::Position;

use crate::error::{LexError, LexErrorKind};

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        /// Reserved words recognized by the lexer. Matching is case-insensitive.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            /// Look up a keyword by its (case-insensitive) spelling.
            pub fn lookup(word: &str) -> Option<Keyword> {
                match word.to_ascii_uppercase().as_str() {
                    $($text => Some(Keyword::$variant),)*
                    _ => None,
                }
            }

            /// Canonical (upper-case) spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }
        }
    };
}

keywords! {
    All => "ALL",
    Alter => "ALTER",
    And => "AND",
    As => "AS",
    Asc => "ASC",
    Between => "BETWEEN",
    By => "BY",
    Case => "CASE",
    Create => "CREATE",
    Cross => "CROSS",
    Delete => "DELETE",
    Desc => "DESC",
    Distinct => "DISTINCT",
    Drop => "DROP",
    Else => "ELSE",
    End => "END",
    Except => "EXCEPT",
    Exists => "EXISTS",
    False => "FALSE",
    Fetch => "FETCH",
    For => "FOR",
    From => "FROM",
    Full => "FULL",
    Grant => "GRANT",
    Group => "GROUP",
    Having => "HAVING",
    ILike => "ILIKE",
    In => "IN",
    Inner => "INNER",
    Insert => "INSERT",
    Intersect => "INTERSECT",
    Into => "INTO",
    Is => "IS",
    Join => "JOIN",
    Lateral => "LATERAL",
    Left => "LEFT",
    Like => "LIKE",
    Limit => "LIMIT",
    Merge => "MERGE",
    Natural => "NATURAL",
    Not => "NOT",
    Null => "NULL",
    Offset => "OFFSET",
    On => "ON",
    Or => "OR",
    Order => "ORDER",
    Outer => "OUTER",
    Over => "OVER",
    Returning => "RETURNING",
    Revoke => "REVOKE",
    Right => "RIGHT",
    Select => "SELECT",
    Then => "THEN",
    Truncate => "TRUNCATE",
    True => "TRUE",
    Union => "UNION",
    Update => "UPDATE",
    Using => "USING",
    When => "WHEN",
    Where => "WHERE",
    Window => "WINDOW",
    With => "WITH",
}

impl Keyword {
    /// Keywords that start a statement which writes data or changes schema/privileges.
    pub fn is_write_statement(&self) -> bool {
        matches!(
            self,
            Keyword::Insert
                | Keyword::Update
                | Keyword::Delete
                | Keyword::Merge
                | Keyword::Drop
                | Keyword::Create
                | Keyword::Alter
                | Keyword::Truncate
                | Keyword::Grant
                | Keyword::Revoke
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Keyword(Keyword),
    /// Unquoted identifier, folded to lower case.
    Ident(String),
    /// Double-quoted identifier, case preserved.
    QuotedIdent(String),
    /// Numeric literal as written.
    Number(String),
    /// String literal, unescaped.
    String(String),
    Comma,
    Period,
    OpenParen,
    CloseParen,
    Semicolon,
    Asterisk,
    Plus,
    Minus,
    Slash,
    Percent,
    Concat,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "keyword {}", k),
            TokenKind::Ident(s) => write!(f, "identifier {}", s),
            TokenKind::QuotedIdent(s) => write!(f, "identifier \"{}\"", s),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::String(_) => f.write_str("string literal"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Period => f.write_str("'.'"),
            TokenKind::OpenParen => f.write_str("'('"),
            TokenKind::CloseParen => f.write_str("')'"),
            TokenKind::Semicolon => f.write_str("';'"),
            TokenKind::Asterisk => f.write_str("'*'"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::Percent => f.write_str("'%'"),
            TokenKind::Concat => f.write_str("'||'"),
            TokenKind::Equal => f.write_str("'='"),
            TokenKind::NotEqual => f.write_str("'<>'"),
            TokenKind::LessThan => f.write_str("'<'"),
            TokenKind::LessThanOrEqual => f.write_str("'<='"),
            TokenKind::GreaterThan => f.write_str("'>'"),
            TokenKind::GreaterThanOrEqual => f.write_str("'>='"),
        }
    }
}

/// A lexed token with its source text and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

/// Tokenize candidate text.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

/// Single-pass lexer over a string slice.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    column: u32,
    open_parens: Vec<Position>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            open_parens: Vec::new(),
        }
    }

    /// Consume the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                break;
            };

            let start = self.offset();
            let position = self.position();
            let kind = match c {
                '-' if self.peek_second() == Some('-') => {
                    return Err(self.operator_comment(
                        position,
                        "'--' starts a line comment",
                        "separate two minus signs with a space or parentheses",
                    ));
                }
                '/' if self.peek_second() == Some('*') => {
                    return Err(self.comment(position, "block comment '/*'"));
                }
                '*' if self.peek_second() == Some('/') => {
                    return Err(self.operator_comment(
                        position,
                        "'*/' is read as a block comment terminator",
                        "separate '*' and '/' with a space",
                    ));
                }
                '#' => return Err(self.comment(position, "comment marker '#'")),
                '\'' => self.scan_string(position)?,
                '"' => self.scan_quoted_ident(position)?,
                c if c.is_ascii_digit() => self.scan_number(position)?,
                '.' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                    self.scan_number(position)?
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),
                _ => self.scan_symbol(position)?,
            };

            tokens.push(Token {
                kind,
                lexeme: self.source[start..self.offset()].to_string(),
                position,
            });
        }

        if let Some(open) = self.open_parens.last() {
            return Err(LexError::new(
                LexErrorKind::UnterminatedLiteral,
                "'(' is never closed",
                *open,
            ));
        }

        tracing::trace!(tokens = tokens.len(), "tokenized candidate");
        Ok(tokens)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.source.len())
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn comment(&self, position: Position, what: &str) -> LexError {
        LexError::new(
            LexErrorKind::IllegalComment,
            format!("{} is not allowed", what),
            position,
        )
    }

    /// An operator pair that lexes as a comment delimiter.
    fn operator_comment(&self, position: Position, cause: &str, hint: &str) -> LexError {
        LexError::new(
            LexErrorKind::IllegalComment,
            format!("{} and is not allowed, even between operators; {}", cause, hint),
            position,
        )
    }

    fn unknown(&self, position: Position, detail: impl Into<String>) -> LexError {
        LexError::new(LexErrorKind::UnknownSymbol, detail, position)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r' | '\x0c')) {
            self.bump();
        }
    }

    /// `'...'` with `''` as the only escape.
    fn scan_string(&mut self, start: Position) -> Result<TokenKind, LexError> {
        self.bump();
        let mut value = String::new();
        loop {
            let position = self.position();
            match self.bump() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedLiteral,
                        "string literal is never closed",
                        start,
                    ));
                }
                Some('\'') => {
                    if self.bump_if('\'') {
                        value.push('\'');
                    } else {
                        break;
                    }
                }
                Some('\0') => return Err(self.unknown(position, "NUL byte in string literal")),
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::String(value))
    }

    /// `"..."` with `""` as the only escape.
    fn scan_quoted_ident(&mut self, start: Position) -> Result<TokenKind, LexError> {
        self.bump();
        let mut value = String::new();
        loop {
            let position = self.position();
            match self.bump() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedLiteral,
                        "quoted identifier is never closed",
                        start,
                    ));
                }
                Some('"') => {
                    if self.bump_if('"') {
                        value.push('"');
                    } else {
                        break;
                    }
                }
                Some('\0') => return Err(self.unknown(position, "NUL byte in identifier")),
                Some(c) => value.push(c),
            }
        }
        if value.is_empty() {
            return Err(self.unknown(start, "empty quoted identifier"));
        }
        Ok(TokenKind::QuotedIdent(value))
    }

    /// Integers, decimals (`1.5`, `.5`, `1.`) and exponents (`1e10`, `2.5E-3`).
    fn scan_number(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let begin = self.offset();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let second = self.peek_second();
            let exponent_follows = match second {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    ahead.next();
                    ahead.next().is_some_and(|(_, c)| c.is_ascii_digit())
                }
                _ => false,
            };
            if exponent_follows {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        if self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            return Err(self.unknown(start, "malformed numeric literal"));
        }
        let end = self.offset();
        Ok(TokenKind::Number(self.source[begin..end].to_string()))
    }

    fn scan_word(&mut self) -> TokenKind {
        let begin = self.offset();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        let end = self.offset();
        let word = &self.source[begin..end];
        match Keyword::lookup(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(word.to_ascii_lowercase()),
        }
    }

    fn scan_symbol(&mut self, position: Position) -> Result<TokenKind, LexError> {
        let Some(c) = self.bump() else {
            return Err(self.unknown(position, "unexpected end of input"));
        };
        let kind = match c {
            ',' => TokenKind::Comma,
            '.' => TokenKind::Period,
            ';' => TokenKind::Semicolon,
            '*' => TokenKind::Asterisk,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Equal,
            '(' => {
                self.open_parens.push(position);
                TokenKind::OpenParen
            }
            ')' => {
                if self.open_parens.pop().is_none() {
                    return Err(self.unknown(position, "')' without matching '('"));
                }
                TokenKind::CloseParen
            }
            '|' if self.bump_if('|') => TokenKind::Concat,
            '!' if self.bump_if('=') => TokenKind::NotEqual,
            '<' => {
                if self.bump_if('=') {
                    TokenKind::LessThanOrEqual
                } else if self.bump_if('>') {
                    TokenKind::NotEqual
                } else {
                    TokenKind::LessThan
                }
            }
            '>' => {
                if self.bump_if('=') {
                    TokenKind::GreaterThanOrEqual
                } else {
                    TokenKind::GreaterThan
                }
            }
            other => {
                return Err(self.unknown(position, format!("unexpected character {:?}", other)));
            }
        };
        Ok(kind)
    }
}
