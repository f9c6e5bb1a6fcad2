use std::path::Path;

use anyhow::{Context, Result};

use octoid_store::ConnectorConfigStore;

use crate::cli::{ConnectorCommands, OutputFormat};
use crate::output::{self, print_json, print_success};

pub async fn run(
    store: &ConnectorConfigStore,
    command: &ConnectorCommands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConnectorCommands::List => {
            let mut configs = store.all().await?;
            configs.sort_by(|a, b| a.connector_id().cmp(b.connector_id()));
            output::print_connectors(&configs, format)?;
        }
        ConnectorCommands::Get(args) => {
            let config = store.get(None, &args.id).await?;
            output::print_connector(config.as_ref(), format)?;
        }
        ConnectorCommands::Set(args) => {
            let count = set_from_file(store, &args.file).await?;
            print_success(&format!("Stored {count} connector config(s)"));
        }
        ConnectorCommands::Types => {
            let types = store.registry().types();
            match format {
                OutputFormat::Json => print_json(&types)?,
                OutputFormat::Table => {
                    for tag in types {
                        println!("{tag}");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Replaces the stored connector configs with the list in `path`. Each item
/// names its shape in a `type` field.
pub async fn set_from_file(store: &ConnectorConfigStore, path: &Path) -> Result<usize> {
    let text = super::read_file(path)?;
    let configs = store
        .registry()
        .decode_list(&text)
        .with_context(|| format!("Invalid connector list in {}", path.display()))?;
    store.set(&configs).await?;
    Ok(configs.len())
}
