//! # sqlgate-sql
//!
//! Lexer, restricted parser and canonical serializer for SQLGate.
//!
//! This crate turns untrusted candidate text into a typed syntax tree, or rejects it:
//! - Tokenize with a lexer that refuses comments and anything outside plain ASCII
//!   outside literals
//! - Parse exactly one read-only `SELECT` with explicit joins
//! - Print a statement back as canonical SQL
//!
//! ## Accepted grammar
//!
//! ```text
//! SELECT [DISTINCT] items [FROM table {JOIN table ON expr}] [WHERE expr]
//!        [GROUP BY exprs] [HAVING expr] [ORDER BY items] [LIMIT n|ALL] [OFFSET n] [;]
//! ```
//!
//! Subqueries, set operations, CTEs and every statement other than `SELECT` are
//! rejected at parse time.
//!
//! ## Canonical form
//!
//! **Candidate:**
//! ```sql
//! select Id , name from seller   where id != 3
//! ```
//!
//! **Canonical:**
//! ```sql
//! SELECT id, name FROM seller WHERE id <> 3
//! ```

pub mod ast;
pub mod canonical;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod visit;

pub use ast::Statement;
pub use error::{LexError, LexErrorKind, ParseError, ParseErrorKind, SqlError};
pub use lexer::{Keyword, Token, TokenKind, tokenize};
pub use parser::{MAX_EXPRESSION_DEPTH, parse};

/// Tokenize and parse candidate text in one step.
pub fn parse_sql(text: &str) -> Result<Statement, SqlError> {
    let tokens = tokenize(text)?;
    let statement = parse(tokens)?;
    tracing::trace!(tables = statement.table_refs().len(), "parsed candidate");
    Ok(statement)
}
