//! In-memory database backend.
//!
//! Both tables live behind one async mutex. A transaction holds the lock for
//! its whole lifetime and works on a private copy of the tables, which is
//! written back on commit and discarded on rollback or drop. Transactions are
//! therefore fully serialized. Plain executors take the lock per statement
//! and give up after [`DEFAULT_LOCK_TIMEOUT`], so a plain read issued by a
//! task that still holds a transaction fails with [`MemoryError::LockTimeout`]
//! instead of hanging.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tracing::debug;

use crate::StorageResult;
use crate::error::StorageError;
use crate::registry::AlreadyExistsRegistry;
use crate::traits::{Database, Executor, Transaction};
use crate::types::{ClientRow, ConnectorConfigRow};

const CLIENT_TABLE: &str = "client_identity";
const CONNECTOR_TABLE: &str = "connector_config";

/// How long a plain executor waits for the table lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by the in-memory backend.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Insert of a primary key that is already present.
    #[error("duplicate key value violates primary key of {table}: {id}")]
    UniqueViolation { table: &'static str, id: String },

    /// Statement issued on a transaction that already finished.
    #[error("transaction already completed")]
    Completed,

    /// A plain statement could not get the table lock in time, usually
    /// because the calling task still holds an open transaction.
    #[error("table lock held by an open transaction for more than {0:?}")]
    LockTimeout(Duration),
}

/// Registers the in-memory unique violation with `registry`.
pub fn register_already_exists_checker(registry: &mut AlreadyExistsRegistry) {
    registry.register("memory", |err| {
        matches!(
            err.downcast_ref::<MemoryError>(),
            Some(MemoryError::UniqueViolation { .. })
        )
    });
}

#[derive(Debug, Clone, Default)]
struct Tables {
    clients: HashMap<String, ClientRow>,
    connectors: HashMap<String, ConnectorConfigRow>,
}

impl Tables {
    fn insert_client(&mut self, row: &ClientRow) -> StorageResult<()> {
        if self.clients.contains_key(&row.id) {
            return Err(StorageError::backend(MemoryError::UniqueViolation {
                table: CLIENT_TABLE,
                id: row.id.clone(),
            }));
        }
        self.clients.insert(row.id.clone(), row.clone());
        Ok(())
    }

    fn update_client(&mut self, row: &ClientRow) -> bool {
        match self.clients.get_mut(&row.id) {
            Some(existing) => {
                *existing = row.clone();
                true
            }
            None => false,
        }
    }

    fn insert_connector(&mut self, row: &ConnectorConfigRow) -> StorageResult<()> {
        if self.connectors.contains_key(&row.id) {
            return Err(StorageError::backend(MemoryError::UniqueViolation {
                table: CONNECTOR_TABLE,
                id: row.id.clone(),
            }));
        }
        self.connectors.insert(row.id.clone(), row.clone());
        Ok(())
    }

    fn delete_connectors(&mut self) -> u64 {
        let removed = self.connectors.len() as u64;
        self.connectors.clear();
        removed
    }
}

/// In-memory [`Database`].
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    lock_timeout: Duration,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self {
            tables: Arc::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl MemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long plain executors wait for the table lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Writes a client row directly, bypassing the stores.
    pub async fn put_client_row(&self, row: ClientRow) {
        self.tables.lock().await.clients.insert(row.id.clone(), row);
    }

    /// Writes a connector config row directly, bypassing the stores.
    pub async fn put_connector_row(&self, row: ConnectorConfigRow) {
        self.tables
            .lock()
            .await
            .connectors
            .insert(row.id.clone(), row);
    }

    /// Number of committed client rows.
    pub async fn client_count(&self) -> usize {
        self.tables.lock().await.clients.len()
    }

    /// Number of committed connector config rows.
    pub async fn connector_count(&self) -> usize {
        self.tables.lock().await.connectors.len()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn begin(&self) -> StorageResult<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            working,
        }))
    }

    async fn executor(&self) -> StorageResult<Box<dyn Executor>> {
        Ok(Box::new(MemoryExecutor {
            tables: Arc::clone(&self.tables),
            timeout: self.lock_timeout,
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Autocommit executor: every statement locks, runs and unlocks.
struct MemoryExecutor {
    tables: Arc<Mutex<Tables>>,
    timeout: Duration,
}

impl MemoryExecutor {
    async fn lock(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        tokio::time::timeout(self.timeout, self.tables.lock())
            .await
            .map_err(|_| StorageError::backend(MemoryError::LockTimeout(self.timeout)))
    }
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn get_client(&mut self, id: &str) -> StorageResult<Option<ClientRow>> {
        Ok(self.lock().await?.clients.get(id).cloned())
    }

    async fn insert_client(&mut self, row: &ClientRow) -> StorageResult<()> {
        self.lock().await?.insert_client(row)
    }

    async fn update_client(&mut self, row: &ClientRow) -> StorageResult<bool> {
        Ok(self.lock().await?.update_client(row))
    }

    async fn select_clients(&mut self) -> StorageResult<Vec<ClientRow>> {
        Ok(self.lock().await?.clients.values().cloned().collect())
    }

    async fn get_connector_config(
        &mut self,
        id: &str,
    ) -> StorageResult<Option<ConnectorConfigRow>> {
        Ok(self.lock().await?.connectors.get(id).cloned())
    }

    async fn select_connector_configs(&mut self) -> StorageResult<Vec<ConnectorConfigRow>> {
        Ok(self.lock().await?.connectors.values().cloned().collect())
    }

    async fn insert_connector_config(&mut self, row: &ConnectorConfigRow) -> StorageResult<()> {
        self.lock().await?.insert_connector(row)
    }

    async fn delete_connector_configs(&mut self) -> StorageResult<u64> {
        Ok(self.lock().await?.delete_connectors())
    }
}

/// Transaction holding the table lock and a private working copy.
struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<Tables>>,
    working: Tables,
}

impl MemoryTransaction {
    fn working(&mut self) -> StorageResult<&mut Tables> {
        if self.guard.is_none() {
            return Err(StorageError::backend(MemoryError::Completed));
        }
        Ok(&mut self.working)
    }
}

#[async_trait]
impl Executor for MemoryTransaction {
    async fn get_client(&mut self, id: &str) -> StorageResult<Option<ClientRow>> {
        Ok(self.working()?.clients.get(id).cloned())
    }

    async fn insert_client(&mut self, row: &ClientRow) -> StorageResult<()> {
        self.working()?.insert_client(row)
    }

    async fn update_client(&mut self, row: &ClientRow) -> StorageResult<bool> {
        Ok(self.working()?.update_client(row))
    }

    async fn select_clients(&mut self) -> StorageResult<Vec<ClientRow>> {
        Ok(self.working()?.clients.values().cloned().collect())
    }

    async fn get_connector_config(
        &mut self,
        id: &str,
    ) -> StorageResult<Option<ConnectorConfigRow>> {
        Ok(self.working()?.connectors.get(id).cloned())
    }

    async fn select_connector_configs(&mut self) -> StorageResult<Vec<ConnectorConfigRow>> {
        Ok(self.working()?.connectors.values().cloned().collect())
    }

    async fn insert_connector_config(&mut self, row: &ConnectorConfigRow) -> StorageResult<()> {
        self.working()?.insert_connector(row)
    }

    async fn delete_connector_configs(&mut self) -> StorageResult<u64> {
        Ok(self.working()?.delete_connectors())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn as_executor(&mut self) -> &mut dyn Executor {
        self
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| StorageError::transaction("transaction already completed"))?;
        *guard = std::mem::take(&mut self.working);
        debug!("Memory transaction committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        if self.guard.take().is_some() {
            debug!("Memory transaction rolled back");
        }
        Ok(())
    }
}
