//! Client credential storage (`client_identity` table).
//!
//! Issues client credentials, persists them hashed, and authenticates
//! presented credentials. Plaintext secrets are observable exactly once, in
//! the [`ClientCredentials`] returned by [`ClientStore::create`].

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::StorageResult;
use crate::error::StorageError;
use crate::hasher::{BcryptHasher, SecretHasher};
use crate::registry::AlreadyExistsRegistry;
use crate::secret::{self, MAX_SECRET_LENGTH, RandomSecretGenerator, SecretGenerator};
use crate::traits::{self, Database, Executor, Transaction};
use crate::types::{Client, ClientCredentials, ClientMetadata, ClientRow, NewClient};

const ENTITY: &str = "client";

// =============================================================================
// Row Mapping
// =============================================================================

impl ClientRow {
    /// Converts the row into a [`Client`], parsing the stored metadata.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Deserialization` if the metadata is malformed.
    pub fn into_client(self) -> StorageResult<Client> {
        let metadata = ClientMetadata::from_json(&self.metadata)
            .map_err(|e| StorageError::deserialization(ENTITY, self.id.clone(), e))?;
        Ok(Client {
            id: self.id,
            metadata,
            admin: self.dex_admin,
        })
    }
}

fn validate_metadata(id: &str, metadata: &ClientMetadata) -> StorageResult<()> {
    if let Some(key) = metadata.reserved_extra_key() {
        return Err(StorageError::validation(format!(
            "client {id:?} metadata repeats known field {key:?} in its extra fields"
        )));
    }
    for uri in metadata.uris() {
        if let Err(e) = Url::parse(uri) {
            return Err(StorageError::validation(format!(
                "client {id:?} has an invalid URI {uri:?}: {e}"
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Client Store
// =============================================================================

/// Client credential store.
///
/// # Example
///
/// ```ignore
/// let store = ClientStore::new(db, already_exists);
/// let creds = store.create(None, NewClient::new("web", metadata)).await?;
/// assert!(store.authenticate(None, &creds).await?);
/// ```
pub struct ClientStore {
    db: Arc<dyn Database>,
    hasher: Arc<dyn SecretHasher>,
    generator: Arc<dyn SecretGenerator>,
    already_exists: Arc<AlreadyExistsRegistry>,
}

impl ClientStore {
    /// Create a store with bcrypt hashing and random secret generation.
    #[must_use]
    pub fn new(db: Arc<dyn Database>, already_exists: Arc<AlreadyExistsRegistry>) -> Self {
        Self {
            db,
            hasher: Arc::new(BcryptHasher::default()),
            generator: Arc::new(RandomSecretGenerator),
            already_exists,
        }
    }

    /// Use a different secret hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn SecretHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Use a different secret generator.
    #[must_use]
    pub fn with_secret_generator(mut self, generator: Arc<dyn SecretGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Builds a store and seeds it with pre-provisioned clients.
    ///
    /// Every client must carry its own secret; see [`ClientStore::create_batch`].
    ///
    /// # Errors
    ///
    /// Returns the first error of the seeding batch. Nothing is written then.
    pub async fn from_clients(self, clients: Vec<NewClient>) -> StorageResult<Self> {
        self.create_batch(clients).await?;
        Ok(self)
    }

    /// Checks the metadata, decodes `encoded`, checks its length and hashes
    /// it into a row.
    fn build_row(&self, client: &NewClient, encoded: &str) -> StorageResult<ClientRow> {
        validate_metadata(&client.id, &client.metadata)?;
        let raw = secret::decode(encoded)?;
        if raw.is_empty() {
            return Err(StorageError::validation(format!(
                "client {:?} has an empty secret",
                client.id
            )));
        }
        if raw.len() > MAX_SECRET_LENGTH {
            return Err(StorageError::validation(format!(
                "client {:?} secret exceeds {MAX_SECRET_LENGTH} bytes",
                client.id
            )));
        }

        Ok(ClientRow {
            id: client.id.clone(),
            secret: self.hasher.hash(&raw)?,
            metadata: client.metadata.to_json()?,
            dex_admin: client.admin,
        })
    }

    async fn insert(&self, exec: &mut dyn Executor, row: &ClientRow) -> StorageResult<()> {
        exec.insert_client(row).await.map_err(|err| {
            if self.already_exists.is_already_exists(&err) {
                StorageError::already_exists(ENTITY, row.id.clone())
            } else {
                err
            }
        })
    }

    /// Registers a client and returns its credentials.
    ///
    /// Uses the client's secret when one is supplied, otherwise generates one.
    /// Runs in `tx` when given (the caller commits), or in a transaction of its
    /// own.
    ///
    /// # Errors
    ///
    /// - `StorageError::AlreadyExists` if the ID is taken
    /// - `StorageError::Validation` if the secret is empty or too long, a URI
    ///   does not parse, or `extra` metadata repeats a known field
    /// - `StorageError::Decode` if a supplied secret is not URL-safe base64
    #[instrument(skip(self, tx, client), fields(client_id = %client.id))]
    pub async fn create(
        &self,
        tx: Option<&mut dyn Transaction>,
        client: NewClient,
    ) -> StorageResult<ClientCredentials> {
        let encoded = match &client.secret {
            Some(supplied) => supplied.clone(),
            None => secret::encode(&self.generator.generate()?),
        };
        let row = self.build_row(&client, &encoded)?;

        match tx {
            Some(tx) => self.insert(tx.as_executor(), &row).await?,
            None => {
                let mut tx = self.db.begin().await?;
                let result = self.insert(tx.as_executor(), &row).await;
                traits::finish(tx, result).await?;
            }
        }

        info!(admin = row.dex_admin, "Created client");
        Ok(ClientCredentials {
            id: row.id,
            secret: encoded,
        })
    }

    /// Registers several clients in one all-or-nothing transaction.
    ///
    /// Unlike [`ClientStore::create`], every client must carry a secret.
    ///
    /// # Errors
    ///
    /// Returns the first failing item's error; all inserts are rolled back.
    #[instrument(skip(self, clients), fields(count = clients.len()))]
    pub async fn create_batch(&self, clients: Vec<NewClient>) -> StorageResult<()> {
        let mut tx = self.db.begin().await?;
        let result = self.insert_batch(tx.as_executor(), &clients).await;
        traits::finish(tx, result).await?;

        info!(count = clients.len(), "Created client batch");
        Ok(())
    }

    async fn insert_batch(
        &self,
        exec: &mut dyn Executor,
        clients: &[NewClient],
    ) -> StorageResult<()> {
        for client in clients {
            let encoded = client.secret.as_deref().unwrap_or_default();
            if encoded.is_empty() {
                return Err(StorageError::validation(format!(
                    "client {:?} has no secret",
                    client.id
                )));
            }
            let row = self.build_row(client, encoded)?;
            self.insert(exec, &row).await?;
        }
        Ok(())
    }

    /// Fetches a client by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no client has that ID.
    #[instrument(skip(self, tx))]
    pub async fn get(&self, tx: Option<&mut dyn Transaction>, id: &str) -> StorageResult<Client> {
        let mut exec = traits::resolve(self.db.as_ref(), tx).await?;
        let row = exec
            .get()
            .get_client(id)
            .await?
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        row.into_client()
    }

    /// Fetches only the metadata of a client.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no client has that ID.
    pub async fn metadata(
        &self,
        tx: Option<&mut dyn Transaction>,
        id: &str,
    ) -> StorageResult<ClientMetadata> {
        Ok(self.get(tx, id).await?.metadata)
    }

    /// Checks presented credentials.
    ///
    /// An unknown ID, a secret that is not valid URL-safe base64, a secret
    /// longer than [`MAX_SECRET_LENGTH`] bytes and a wrong secret all yield
    /// `Ok(false)` so callers cannot tell them apart. Only backend failures
    /// are returned as errors.
    #[instrument(skip(self, tx, credentials), fields(client_id = %credentials.id))]
    pub async fn authenticate(
        &self,
        tx: Option<&mut dyn Transaction>,
        credentials: &ClientCredentials,
    ) -> StorageResult<bool> {
        let mut exec = traits::resolve(self.db.as_ref(), tx).await?;
        let Some(row) = exec.get().get_client(&credentials.id).await? else {
            debug!("Unknown client");
            return Ok(false);
        };

        // The decode error names the offending byte, so it is not logged.
        let Ok(raw) = secret::decode(&credentials.secret) else {
            warn!("Failed to decode presented client secret");
            return Ok(false);
        };
        if raw.len() > MAX_SECRET_LENGTH {
            debug!(len = raw.len(), "Presented client secret too long");
            return Ok(false);
        }

        Ok(self.hasher.verify(&row.secret, &raw))
    }

    /// Sets or clears the administrator flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no client has that ID; nothing is
    /// written in that case.
    #[instrument(skip(self))]
    pub async fn set_admin(&self, id: &str, admin: bool) -> StorageResult<()> {
        let mut tx = self.db.begin().await?;
        let result = Self::update_admin(tx.as_executor(), id, admin).await;
        traits::finish(tx, result).await?;

        info!("Updated client admin flag");
        Ok(())
    }

    async fn update_admin(exec: &mut dyn Executor, id: &str, admin: bool) -> StorageResult<()> {
        let mut row = exec
            .get_client(id)
            .await?
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        row.dex_admin = admin;
        if !exec.update_client(&row).await? {
            return Err(StorageError::not_found(ENTITY, id));
        }
        Ok(())
    }

    /// Returns whether a client is an administrator.
    ///
    /// An unknown ID is not an administrator.
    #[instrument(skip(self))]
    pub async fn is_admin(&self, id: &str) -> StorageResult<bool> {
        let mut exec = self.db.executor().await?;
        let admin = exec.get_client(id).await?.is_some_and(|row| row.dex_admin);
        Ok(admin)
    }

    /// Lists every client, in no particular order.
    ///
    /// # Errors
    ///
    /// Fails as a whole on the first row whose metadata cannot be parsed.
    #[instrument(skip(self, tx))]
    pub async fn all(&self, tx: Option<&mut dyn Transaction>) -> StorageResult<Vec<Client>> {
        let mut exec = traits::resolve(self.db.as_ref(), tx).await?;
        let rows = exec.get().select_clients().await?;
        rows.into_iter().map(ClientRow::into_client).collect()
    }
}
