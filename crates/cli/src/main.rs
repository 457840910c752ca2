//! Gadget Shop CLI - Database migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! gs-cli migrate
//!
//! # Validate a catalog seed and store it in the database
//! gs-cli seed catalog.yaml
//!
//! # Validate a catalog seed without touching the database
//! gs-cli check-catalog catalog.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gs-cli")]
#[command(author, version, about = "Gadget Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Store a catalog seed file in the database
    Seed {
        /// Path to the YAML seed file
        file: PathBuf,
    },
    /// Validate a catalog seed file
    CheckCatalog {
        /// Path to the YAML seed file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
        Commands::CheckCatalog { file } => {
            commands::check_catalog::run(&file).await?;
        }
    }
    Ok(())
}
