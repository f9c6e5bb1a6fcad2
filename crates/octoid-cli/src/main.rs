mod cli;
mod commands;
mod config;
mod observability;
mod output;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use octoid_store::{AlreadyExistsRegistry, ClientStore, ConnectorConfigStore, ConnectorRegistry};
use octoid_store_postgres::{PostgresDatabase, register_already_exists_checker};

use cli::{Cli, Commands};
use config::AppConfig;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    let app_config = config::load_config(cli.config.as_deref())?;
    observability::init_tracing(&app_config.logging.level);

    let db = Arc::new(
        PostgresDatabase::connect(&app_config.storage)
            .await
            .context("Failed to connect to PostgreSQL")?,
    );
    let mut already_exists = AlreadyExistsRegistry::new();
    register_already_exists_checker(&mut already_exists);
    let already_exists = Arc::new(already_exists);
    info!(?already_exists, "Storage ready");

    match &cli.command {
        Commands::Client(args) => {
            let store = client_store(&app_config, db, already_exists)?;
            commands::clients::run(&store, &args.command, format).await?;
        }
        Commands::Connector(args) => {
            let store = ConnectorConfigStore::new(
                db,
                Arc::new(ConnectorRegistry::with_builtin()),
                already_exists,
            );
            commands::connectors::run(&store, &args.command, format).await?;
        }
    }

    Ok(())
}

fn client_store(
    app_config: &AppConfig,
    db: Arc<PostgresDatabase>,
    already_exists: Arc<AlreadyExistsRegistry>,
) -> Result<ClientStore> {
    let hasher = app_config.hashing.build()?;
    Ok(ClientStore::new(db, already_exists).with_hasher(hasher))
}
