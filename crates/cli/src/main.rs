//! Autoparts CLI - session store migrations and connectivity checks.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table used by the storefront
//! autoparts-cli migrate
//!
//! # Check the database and the remote commerce and content APIs
//! autoparts-cli ping
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create or update the session store schema
//! - `ping` - Probe every backing service the storefront needs

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "autoparts-cli")]
#[command(author, version, about = "Autoparts storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the session store migration
    Migrate,
    /// Check that the database and remote APIs answer
    Ping {
        /// Skip the database check
        #[arg(long)]
        skip_database: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::session_store().await?,
        Commands::Ping { skip_database } => commands::ping::all(skip_database).await?,
    }
    Ok(())
}
