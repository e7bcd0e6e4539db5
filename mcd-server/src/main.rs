//! mcd - Content-Security-Policy report beacon.
//!
//! # Commands
//!
//! - `mcd serve` - Run the beacon server
//! - `mcd nonce --user <id>` - Print a nonce and signed report URI
//! - `mcd policy` - Print the policy header
//! - `mcd reports` - List stored reports

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod app;
mod commands;
mod error;

use error::CliResult;

/// CSP violation report beacon
#[derive(Parser)]
#[command(name = "mcd")]
#[command(version)]
#[command(about = "Collects Content-Security-Policy violation reports")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true, env = "MCD_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the beacon server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on, overriding configuration
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Issue a nonce and signed report URI for a user
    Nonce {
        /// User id the nonce is bound to
        #[arg(short, long)]
        user: u64,
    },

    /// Print the policy header
    Policy {
        /// Sign the report-uri for this user
        #[arg(short, long)]
        user: Option<u64>,
    },

    /// List stored reports, newest first
    #[command(alias = "r")]
    Reports {
        /// Maximum number of reports
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Print raw records as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = cli.config.as_deref();

    let result: CliResult<()> = match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await,
        Commands::Nonce { user } => commands::nonce::run(config, user).await,
        Commands::Policy { user } => commands::policy::run(config, user).await,
        Commands::Reports { limit, json } => commands::reports::run(config, limit, json).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
