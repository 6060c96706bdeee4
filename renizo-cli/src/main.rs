//! Renizo CLI - town selection and sessions from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{prelude::*, EnvFilter};

mod commands;
mod output;

use commands::{auth, logs, reset, status, town};

/// Env var holding the diagnostic log filter (e.g. `debug`, `renizo_core=trace`)
const LOG_ENV: &str = "RENIZO_LOG";

/// Renizo - pick your town, sign in, find local services
#[derive(Parser)]
#[command(name = "renizo", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show storage backend, selected town and session state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Choose the town services are shown for
    Town {
        #[command(subcommand)]
        command: town::TownCommands,
    },

    /// Sign in, sign up, sign out
    Auth {
        #[command(subcommand)]
        command: auth::AuthCommands,
    },

    /// Forget the selected town and any stored session
    Reset {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::Town { command } => town::run(command),
        Commands::Auth { command } => auth::run(command),
        Commands::Reset { force, json } => reset::run(force, json),
        Commands::Logs { command } => logs::run(command),
    }
}
