use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use octoid_store::{ClientCredentials, ClientMetadata, ClientStore, NewClient};

use crate::cli::{ClientCommands, OutputFormat};
use crate::output::{self, print_json, print_success};

pub async fn run(
    store: &ClientStore,
    command: &ClientCommands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ClientCommands::Create(args) => {
            let metadata = match &args.metadata {
                Some(path) => load_metadata(path)?,
                None => ClientMetadata::default(),
            };
            let mut client = NewClient::new(&args.id, metadata).with_admin(args.admin);
            if let Some(secret) = &args.secret {
                client = client.with_secret(secret);
            }
            let creds = create(store, client).await?;
            print_credentials(&creds, format)?;
        }
        ClientCommands::Seed(args) => {
            let count = seed(store, &args.file).await?;
            print_success(&format!("Registered {count} client(s)"));
        }
        ClientCommands::Get(args) => {
            let client = store.get(None, &args.id).await?;
            output::print_client(&client, format)?;
        }
        ClientCommands::List => {
            let mut clients = store.all(None).await?;
            clients.sort_by(|a, b| a.id.cmp(&b.id));
            output::print_clients(&clients, format)?;
        }
        ClientCommands::SetAdmin(args) => {
            store.set_admin(&args.id, args.admin).await?;
            print_success(&format!("Set admin = {} for {}", args.admin, args.id));
        }
        ClientCommands::IsAdmin(args) => {
            let admin = store.is_admin(&args.id).await?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({ "admin": admin }))?,
                OutputFormat::Table => println!("{admin}"),
            }
        }
        ClientCommands::Authenticate(args) => {
            let creds = ClientCredentials::new(&args.id, &args.secret);
            if store.authenticate(None, &creds).await? {
                print_success("Credentials are valid");
            } else {
                anyhow::bail!("Invalid client credentials");
            }
        }
    }
    Ok(())
}

fn load_metadata(path: &Path) -> Result<ClientMetadata> {
    let text = super::read_file(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid client metadata in {}", path.display()))
}

async fn create(store: &ClientStore, client: NewClient) -> Result<ClientCredentials> {
    let id = client.id.clone();
    store
        .create(None, client)
        .await
        .with_context(|| format!("Failed to create client {id:?}"))
}

/// Registers every client listed in `path`, a JSON array of clients that
/// each carry a secret.
pub async fn seed(store: &ClientStore, path: &Path) -> Result<usize> {
    let text = super::read_file(path)?;
    let clients: Vec<NewClient> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid client list in {}", path.display()))?;
    let count = clients.len();
    store.create_batch(clients).await?;
    Ok(count)
}

fn print_credentials(creds: &ClientCredentials, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(creds),
        OutputFormat::Table => {
            print_success(&format!("Created client {}", creds.id));
            println!("{}: {}", "Client ID".cyan(), creds.id);
            println!("{}: {}", "Client secret".cyan(), creds.secret);
            println!("{}", "Store the secret now; it cannot be shown again.".yellow());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use octoid_store::hasher::BcryptHasher;
    use octoid_store::memory::{self, MemoryDatabase};
    use octoid_store::{AlreadyExistsRegistry, secret};

    use super::*;

    fn store() -> ClientStore {
        let mut registry = AlreadyExistsRegistry::new();
        memory::register_already_exists_checker(&mut registry);
        ClientStore::new(Arc::new(MemoryDatabase::new()), Arc::new(registry))
            .with_hasher(Arc::new(BcryptHasher::new(4).unwrap()))
    }

    fn json_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_seed_from_file() {
        let store = store();
        let file = json_file(&format!(
            r#"[
                {{"id": "web", "secret": "{}", "metadata": {{"clientName": "Web"}}}},
                {{"id": "ops", "secret": "{}", "admin": true}}
            ]"#,
            secret::encode(b"web-secret"),
            secret::encode(b"ops-secret"),
        ));

        assert_eq!(seed(&store, file.path()).await.unwrap(), 2);
        assert!(store.is_admin("ops").await.unwrap());
        let creds = ClientCredentials::new("web", secret::encode(b"web-secret"));
        assert!(store.authenticate(None, &creds).await.unwrap());
    }

    #[tokio::test]
    async fn test_seed_without_secret_registers_nothing() {
        let store = store();
        let file = json_file(&format!(
            r#"[{{"id": "a", "secret": "{}"}}, {{"id": "b"}}]"#,
            secret::encode(b"a"),
        ));

        assert!(seed(&store, file.path()).await.is_err());
        assert!(store.all(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_reports_duplicate_id() {
        let store = store();
        create(&store, NewClient::new("web", ClientMetadata::default()))
            .await
            .unwrap();
        let err = create(&store, NewClient::new("web", ClientMetadata::default()))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("\"web\""));
    }
}
