//! # User Service Main Entry Point
//!
//! Loads configuration, installs tracing, connects to the database and either
//! applies migrations or serves the HTTP API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use user_service::{
    config::ConfigLoader,
    db::{init_pool, run_migrations},
    server::run_server,
    telemetry::init_tracing,
};

/// Multi-tenant user identity and membership service
#[derive(Parser)]
#[command(name = "user-service")]
#[command(about = "Multi-tenant user identity and membership service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new()
        .load()
        .context("Failed to load configuration")?;

    init_tracing(&config).context("Failed to initialize tracing")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config)
        .await
        .context("Failed to initialize database")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => {
            run_migrations(&db).await.context("Migration failed")?;
        }
        Commands::Serve => {
            if config.run_migrations {
                run_migrations(&db).await.context("Migration failed")?;
            }
            run_server(config, db).await?;
        }
    }

    Ok(())
}
