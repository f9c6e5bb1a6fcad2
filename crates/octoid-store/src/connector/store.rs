//! Connector configuration storage (`connector_config` table).

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{ConnectorConfig, ConnectorRegistry};
use crate::StorageResult;
use crate::error::StorageError;
use crate::registry::AlreadyExistsRegistry;
use crate::traits::{self, Database, Executor, Transaction};
use crate::types::ConnectorConfigRow;

const ENTITY: &str = "connector config";

/// Persists connector configurations and loads them back as concrete shapes.
pub struct ConnectorConfigStore {
    db: Arc<dyn Database>,
    registry: Arc<ConnectorRegistry>,
    already_exists: Arc<AlreadyExistsRegistry>,
}

impl ConnectorConfigStore {
    /// Create a store over `db`, decoding rows with `registry`.
    #[must_use]
    pub fn new(
        db: Arc<dyn Database>,
        registry: Arc<ConnectorRegistry>,
        already_exists: Arc<AlreadyExistsRegistry>,
    ) -> Self {
        Self {
            db,
            registry,
            already_exists,
        }
    }

    /// Returns the type registry used to decode rows.
    #[must_use]
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    fn to_row(config: &dyn ConnectorConfig) -> StorageResult<ConnectorConfigRow> {
        Ok(ConnectorConfigRow {
            id: config.connector_id().to_owned(),
            connector_type: config.connector_type().to_owned(),
            config: config.to_json()?,
        })
    }

    fn from_row(&self, row: &ConnectorConfigRow) -> StorageResult<Box<dyn ConnectorConfig>> {
        self.registry
            .decode(&row.connector_type, &row.id, &row.config)
    }

    /// Loads every stored configuration.
    ///
    /// # Errors
    ///
    /// Fails as a whole if any row has an unregistered type or a malformed
    /// document; no partial result is returned.
    #[instrument(skip(self))]
    pub async fn all(&self) -> StorageResult<Vec<Box<dyn ConnectorConfig>>> {
        let mut exec = self.db.executor().await?;
        let rows = exec.select_connector_configs().await?;
        let configs = rows
            .iter()
            .map(|row| self.from_row(row))
            .collect::<StorageResult<Vec<_>>>()?;
        debug!(count = configs.len(), "Loaded connector configs");
        Ok(configs)
    }

    /// Loads one configuration by connector ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row has that ID, and
    /// `StorageError::UnknownType` if its type is not registered.
    #[instrument(skip(self, tx))]
    pub async fn get(
        &self,
        tx: Option<&mut dyn Transaction>,
        id: &str,
    ) -> StorageResult<Box<dyn ConnectorConfig>> {
        let mut exec = traits::resolve(self.db.as_ref(), tx).await?;
        let row = exec
            .get()
            .get_connector_config(id)
            .await?
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        self.from_row(&row)
    }

    /// Replaces the full set of stored configurations.
    ///
    /// Every configuration is serialized before the database is touched. The
    /// delete and the inserts then run in one transaction, so a failure leaves
    /// the previous set in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if two configurations share an
    /// ID, or the first serialization or backend error.
    #[instrument(skip(self, configs), fields(count = configs.len()))]
    pub async fn set(&self, configs: &[Box<dyn ConnectorConfig>]) -> StorageResult<()> {
        let rows = configs
            .iter()
            .map(|config| Self::to_row(config.as_ref()))
            .collect::<StorageResult<Vec<_>>>()?;

        let mut tx = self.db.begin().await?;
        let result = self.replace(tx.as_executor(), &rows).await;
        traits::finish(tx, result).await?;

        info!(count = rows.len(), "Replaced connector configs");
        Ok(())
    }

    async fn replace(
        &self,
        exec: &mut dyn Executor,
        rows: &[ConnectorConfigRow],
    ) -> StorageResult<()> {
        let removed = exec.delete_connector_configs().await?;
        debug!(removed, "Deleted previous connector configs");

        for row in rows {
            if let Err(err) = exec.insert_connector_config(row).await {
                if self.already_exists.is_already_exists(&err) {
                    return Err(StorageError::already_exists(ENTITY, row.id.clone()));
                }
                return Err(err);
            }
        }
        Ok(())
    }
}
