use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use octoid_store::{Client, ConnectorConfig};

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn client_json(client: &Client) -> Value {
    serde_json::json!({
        "id": client.id,
        "admin": client.admin,
        "metadata": client.metadata,
    })
}

/// Parses the stored text form back into a JSON value for display.
fn connector_json(config: &dyn ConnectorConfig) -> Result<Value> {
    Ok(serde_json::json!({
        "id": config.connector_id(),
        "type": config.connector_type(),
        "config": serde_json::from_str::<Value>(&config.to_json()?)?,
    }))
}

pub fn print_clients(clients: &[Client], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let values: Vec<Value> = clients.iter().map(client_json).collect();
            print_json(&values)
        }
        OutputFormat::Table => {
            if clients.is_empty() {
                println!("No clients found.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["ID", "Name", "Admin", "Redirect URIs"]);
            for client in clients {
                let redirects = client.metadata.redirect_uris.join("\n");
                builder.push_record([
                    client.id.as_str(),
                    client.metadata.client_name.as_deref().unwrap_or("-"),
                    if client.admin { "yes" } else { "no" },
                    redirects.as_str(),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            println!("Total: {}", clients.len());
            Ok(())
        }
    }
}

pub fn print_client(client: &Client, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&client_json(client)),
        OutputFormat::Table => {
            println!("{}: {}", "Client".cyan(), client.id);
            println!("{}: {}", "Admin".cyan(), client.admin);
            print_json(&client.metadata)
        }
    }
}

pub fn print_connectors(configs: &[Box<dyn ConnectorConfig>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let values = configs
                .iter()
                .map(|c| connector_json(c.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            print_json(&values)
        }
        OutputFormat::Table => {
            if configs.is_empty() {
                println!("No connectors configured.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["ID", "Type"]);
            for config in configs {
                builder.push_record([config.connector_id(), config.connector_type()]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            Ok(())
        }
    }
}

pub fn print_connector(config: &dyn ConnectorConfig, format: OutputFormat) -> Result<()> {
    let value = connector_json(config)?;
    match format {
        OutputFormat::Json => print_json(&value),
        OutputFormat::Table => {
            println!("{}: {}", "Connector".cyan(), config.connector_id());
            println!("{}: {}", "Type".cyan(), config.connector_type());
            print_json(&value["config"])
        }
    }
}
