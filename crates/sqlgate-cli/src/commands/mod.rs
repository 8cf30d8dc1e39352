//! CLI command implementations.

pub mod check;
pub mod tokens;
pub mod validate;

use anyhow::{Context, Result};
use std::io::Read;

/// Candidate text from an argument, or from stdin when the argument is `-`.
pub fn read_sql(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("Failed to read SQL from stdin")?;
    Ok(sql)
}
