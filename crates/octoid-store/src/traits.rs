//! Executor traits that database backends implement.
//!
//! The stores never talk to a driver directly. A backend provides a
//! [`Database`] that hands out either a plain [`Executor`] (autocommit) or a
//! [`Transaction`]. Store operations take one `Option<&mut dyn Transaction>`
//! argument: `Some` runs the operation inside the caller's transaction, `None`
//! lets the store pick (a plain executor for reads, its own transaction for
//! writes).
//!
//! # Example
//!
//! ```ignore
//! let mut tx = db.begin().await?;
//! let creds = clients.create(Some(tx.as_mut()), new_client).await?;
//! let client = clients.get(Some(tx.as_mut()), &creds.id).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;
use tracing::warn;

use crate::StorageResult;
use crate::types::{ClientRow, ConnectorConfigRow};

/// Typed row operations for both tables.
///
/// Driver failures are reported as `StorageError::Backend` wrapping the
/// driver's own error, so that the already-exists registry can inspect it.
#[async_trait]
pub trait Executor: Send {
    // ==================== client_identity ====================

    /// Reads a client row by primary key.
    async fn get_client(&mut self, id: &str) -> StorageResult<Option<ClientRow>>;

    /// Inserts a client row. Fails if the ID is taken.
    async fn insert_client(&mut self, row: &ClientRow) -> StorageResult<()>;

    /// Replaces a client row. Returns `false` if no row has that ID.
    async fn update_client(&mut self, row: &ClientRow) -> StorageResult<bool>;

    /// Reads every client row, in no particular order.
    async fn select_clients(&mut self) -> StorageResult<Vec<ClientRow>>;

    // ==================== connector_config ====================

    /// Reads a connector config row by primary key.
    async fn get_connector_config(&mut self, id: &str) -> StorageResult<Option<ConnectorConfigRow>>;

    /// Reads every connector config row, in no particular order.
    async fn select_connector_configs(&mut self) -> StorageResult<Vec<ConnectorConfigRow>>;

    /// Inserts a connector config row. Fails if the ID is taken.
    async fn insert_connector_config(&mut self, row: &ConnectorConfigRow) -> StorageResult<()>;

    /// Deletes every connector config row and returns how many were removed.
    async fn delete_connector_configs(&mut self) -> StorageResult<u64>;
}

/// An executor whose effects become visible only on commit.
///
/// Dropping a transaction without committing rolls it back. Both `commit` and
/// `rollback` consume the transaction, so rolling back after a commit cannot
/// happen.
#[async_trait]
pub trait Transaction: Executor {
    /// View this transaction as a plain executor.
    fn as_executor(&mut self) -> &mut dyn Executor;

    /// Commits all operations in this transaction.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Rolls back all operations in this transaction.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}

/// A database backend.
#[async_trait]
pub trait Database: Send + Sync {
    /// Begins a new transaction.
    async fn begin(&self) -> StorageResult<Box<dyn Transaction>>;

    /// Returns an executor running each statement on its own.
    async fn executor(&self) -> StorageResult<Box<dyn Executor>>;

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}

/// Executor borrowed from the caller's transaction or owned by the store.
pub(crate) enum ExecutorRef<'a> {
    Borrowed(&'a mut dyn Transaction),
    Owned(Box<dyn Executor>),
}

impl ExecutorRef<'_> {
    pub(crate) fn get(&mut self) -> &mut dyn Executor {
        match self {
            Self::Borrowed(tx) => tx.as_executor(),
            Self::Owned(exec) => exec.as_mut(),
        }
    }
}

/// Resolves the executor for an optional ambient transaction.
pub(crate) async fn resolve<'a>(
    db: &dyn Database,
    tx: Option<&'a mut dyn Transaction>,
) -> StorageResult<ExecutorRef<'a>> {
    match tx {
        Some(tx) => Ok(ExecutorRef::Borrowed(tx)),
        None => Ok(ExecutorRef::Owned(db.executor().await?)),
    }
}

/// Commits `tx` if `result` is `Ok`, otherwise rolls it back and returns the
/// original error.
pub async fn finish<T>(tx: Box<dyn Transaction>, result: StorageResult<T>) -> StorageResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
