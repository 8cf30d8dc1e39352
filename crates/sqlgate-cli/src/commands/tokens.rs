//! `sqlgate tokens` command implementation.

use anyhow::Result;
use std::process::ExitCode;

use sqlgate_sql::tokenize;

use super::read_sql;

/// Print one token per line as `line:column  kind  lexeme`.
pub fn run(sql: &str) -> Result<ExitCode> {
    let text = read_sql(sql)?;
    match tokenize(&text) {
        Ok(tokens) => {
            for token in &tokens {
                println!(
                    "{:<8} {:<14} {}",
                    token.position.to_string(),
                    token.kind.to_string(),
                    token.lexeme
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} at {}: {}", e.kind.code(), e.position, e.detail);
            Ok(ExitCode::FAILURE)
        }
    }
}
