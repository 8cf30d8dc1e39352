//! Error types for lexing and parsing.

use serde::Serialize;
use sqlgate_core::Position;
use std::fmt;
use thiserror::Error;

/// Categories of lexer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LexErrorKind {
    /// A string, quoted identifier or parenthesis was never closed.
    UnterminatedLiteral,
    /// A comment marker (`--`, `/*`, `*/`, `#`) appeared outside a literal.
    IllegalComment,
    /// A character that is not part of the accepted lexical grammar.
    UnknownSymbol,
}

impl LexErrorKind {
    /// Stable rejection code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnterminatedLiteral => "UnterminatedLiteral",
            Self::IllegalComment => "IllegalComment",
            Self::UnknownSymbol => "UnknownSymbol",
        }
    }
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Lexer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {position}: {detail}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub detail: String,
    pub position: Position,
}

impl LexError {
    pub fn new(kind: LexErrorKind, detail: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            detail: detail.into(),
            position,
        }
    }
}

/// Categories of parser failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    /// Any token sequence outside the restricted SELECT grammar.
    UnsupportedConstruct,
    /// A statement separator followed by more input.
    MultipleStatements,
    /// A subquery in any position.
    NestedQuery,
}

impl ParseErrorKind {
    /// Stable rejection code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedConstruct => "UnsupportedConstruct",
            Self::MultipleStatements => "MultipleStatements",
            Self::NestedQuery => "NestedQuery",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parser failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {position}: {detail}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub detail: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, detail: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            detail: detail.into(),
            position,
        }
    }

    pub fn unsupported(detail: impl Into<String>, position: Position) -> Self {
        Self::new(ParseErrorKind::UnsupportedConstruct, detail, position)
    }
}

/// Either stage of turning text into a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SqlError {
    /// Stable rejection code of the underlying failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lex(e) => e.kind.code(),
            Self::Parse(e) => e.kind.code(),
        }
    }

    /// Human-readable detail without the code prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Lex(e) => &e.detail,
            Self::Parse(e) => &e.detail,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Lex(e) => e.position,
            Self::Parse(e) => e.position,
        }
    }
}
