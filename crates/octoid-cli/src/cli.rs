use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "octoid")]
#[command(about = "octoid admin CLI: manage client credentials and connector configurations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file (defaults to ./octoid.toml when present)
    #[arg(short, long, global = true, env = "OCTOID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage OAuth2 clients
    Client(ClientArgs),
    /// Manage upstream connector configurations
    Connector(ConnectorArgs),
}

#[derive(clap::Args)]
pub struct ClientArgs {
    #[command(subcommand)]
    pub command: ClientCommands,
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a new client and print its credentials
    Create(CreateClientArgs),
    /// Register every client in a JSON file, all or nothing
    Seed(FileArgs),
    /// Show a client
    Get(IdArgs),
    /// List all clients
    List,
    /// Grant or revoke the administrator flag
    SetAdmin(SetAdminArgs),
    /// Print whether a client is an administrator
    IsAdmin(IdArgs),
    /// Check a client ID and secret
    Authenticate(AuthenticateArgs),
}

#[derive(clap::Args)]
pub struct CreateClientArgs {
    /// Client ID
    pub id: String,
    /// Path to a JSON file with the client metadata
    #[arg(long)]
    pub metadata: Option<PathBuf>,
    /// URL-safe base64 secret to use instead of a generated one
    #[arg(long)]
    pub secret: Option<String>,
    /// Mark the client as an administrator
    #[arg(long)]
    pub admin: bool,
}

#[derive(clap::Args)]
pub struct SetAdminArgs {
    /// Client ID
    pub id: String,
    /// New value of the administrator flag
    #[arg(action = clap::ArgAction::Set)]
    pub admin: bool,
}

#[derive(clap::Args)]
pub struct AuthenticateArgs {
    /// Client ID
    pub id: String,
    /// URL-safe base64 secret
    #[arg(long, env = "OCTOID_CLIENT_SECRET", hide_env_values = true)]
    pub secret: String,
}

#[derive(clap::Args)]
pub struct ConnectorArgs {
    #[command(subcommand)]
    pub command: ConnectorCommands,
}

#[derive(Subcommand)]
pub enum ConnectorCommands {
    /// List all connector configurations
    List,
    /// Show one connector configuration
    Get(IdArgs),
    /// Replace every connector configuration with the contents of a JSON file
    Set(FileArgs),
    /// List the registered connector types
    Types,
}

#[derive(clap::Args)]
pub struct IdArgs {
    /// ID to look up
    pub id: String,
}

#[derive(clap::Args)]
pub struct FileArgs {
    /// Path to a JSON file
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_admin() {
        let cli = Cli::try_parse_from(["octoid", "client", "set-admin", "web", "true"]).unwrap();
        match cli.command {
            Commands::Client(ClientArgs {
                command: ClientCommands::SetAdmin(args),
            }) => {
                assert_eq!(args.id, "web");
                assert!(args.admin);
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_parse_connector_set() {
        let cli =
            Cli::try_parse_from(["octoid", "-f", "json", "connector", "set", "connectors.json"])
                .unwrap();
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(
            cli.command,
            Commands::Connector(ConnectorArgs {
                command: ConnectorCommands::Set(_)
            })
        ));
    }
}
