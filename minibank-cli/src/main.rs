//! Minibank CLI - GraphQL ledger server and operator tools

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use minibank_cli::logging::{init_logging, LogFormat};

mod commands;
mod output;

use commands::{doctor, migrate, serve, status};

/// Minibank - a small multi-user ledger behind a GraphQL API
#[derive(Parser)]
#[command(name = "minibank", version, about, long_about = None)]
struct Cli {
    /// Data directory holding settings.json and the database
    #[arg(long, global = true, env = "MINIBANK_DIR")]
    dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the GraphQL server
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 4000)]
        port: u16,
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Apply pending schema migrations
    Migrate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show ledger status and summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger health checks
    Doctor {
        /// Show details for failing checks
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_logging(default_level, cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = commands::data_dir(cli.dir)?;

    match cli.command {
        Commands::Serve { port, host } => serve::run(&data_dir, &host, port).await,
        Commands::Migrate { json } => migrate::run(&data_dir, json),
        Commands::Status { json } => status::run(&data_dir, json).await,
        Commands::Doctor { verbose, json } => doctor::run(&data_dir, verbose, json).await,
    }
}
