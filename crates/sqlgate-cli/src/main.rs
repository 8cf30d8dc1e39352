use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sqlgate", version, about = "Validate generated SQL against a schema catalog")]
struct Cli {
    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "SQLGATE_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a catalog file, check it and print a summary
    Check {
        /// Path to catalog.yaml or catalog.json
        catalog: PathBuf,
    },

    /// Validate one candidate and print the verdict as JSON (exit code 2 on rejection)
    Validate {
        /// Catalog file. Overrides any catalog named in --config
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Gate configuration (bounding and audit settings)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Identifier of the model that generated the candidate
        #[arg(long)]
        model: Option<String>,

        /// Correlation id recorded in the audit trail. Random when omitted
        #[arg(long = "correlation-id")]
        correlation_id: Option<String>,

        /// Requested statement timeout, capped by the configuration
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,

        /// Candidate SQL, or `-` to read it from stdin
        sql: String,
    },

    /// Print the token stream of a candidate
    Tokens {
        /// Candidate SQL, or `-` to read it from stdin
        sql: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only command output.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Check { catalog } => commands::check::run(&catalog),
        Command::Validate {
            catalog,
            config,
            model,
            correlation_id,
            timeout_ms,
            sql,
        } => {
            commands::validate::run(commands::validate::ValidateArgs {
                catalog,
                config,
                model,
                correlation_id,
                timeout_ms,
                sql,
            })
            .await
        }
        Command::Tokens { sql } => commands::tokens::run(&sql),
    }
}
