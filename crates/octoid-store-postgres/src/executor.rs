//! PostgreSQL executors and transactions.
//!
//! The autocommit executor holds one pooled connection; the transaction holds
//! an sqlx transaction that rolls back on drop unless committed. Both funnel
//! into the same query helpers on `&mut PgConnection`.

use async_trait::async_trait;
use sqlx_core::pool::PoolConnection;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::{PgConnection, PgTransaction, Postgres};
use tracing::debug;

use octoid_store::{
    ClientRow, ConnectorConfigRow, Executor, StorageError, StorageResult, Transaction,
};

type ClientTuple = (String, Vec<u8>, String, bool);
type ConnectorTuple = (String, String, String);

fn client_row((id, secret, metadata, dex_admin): ClientTuple) -> ClientRow {
    ClientRow {
        id,
        secret,
        metadata,
        dex_admin,
    }
}

fn connector_row((id, connector_type, config): ConnectorTuple) -> ConnectorConfigRow {
    ConnectorConfigRow {
        id,
        connector_type,
        config,
    }
}

mod queries {
    use super::*;

    pub(super) async fn get_client(
        conn: &mut PgConnection,
        id: &str,
    ) -> StorageResult<Option<ClientRow>> {
        let row: Option<ClientTuple> = query_as(
            r#"SELECT id, secret, metadata, dex_admin FROM client_identity WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(StorageError::backend)?;
        Ok(row.map(client_row))
    }

    pub(super) async fn insert_client(
        conn: &mut PgConnection,
        row: &ClientRow,
    ) -> StorageResult<()> {
        query(
            r#"INSERT INTO client_identity (id, secret, metadata, dex_admin)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&row.id)
        .bind(&row.secret)
        .bind(&row.metadata)
        .bind(row.dex_admin)
        .execute(conn)
        .await
        .map_err(StorageError::backend)?;
        Ok(())
    }

    pub(super) async fn update_client(
        conn: &mut PgConnection,
        row: &ClientRow,
    ) -> StorageResult<bool> {
        let result = query(
            r#"UPDATE client_identity
               SET secret = $2, metadata = $3, dex_admin = $4
               WHERE id = $1"#,
        )
        .bind(&row.id)
        .bind(&row.secret)
        .bind(&row.metadata)
        .bind(row.dex_admin)
        .execute(conn)
        .await
        .map_err(StorageError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn select_clients(conn: &mut PgConnection) -> StorageResult<Vec<ClientRow>> {
        let rows: Vec<ClientTuple> =
            query_as(r#"SELECT id, secret, metadata, dex_admin FROM client_identity"#)
                .fetch_all(conn)
                .await
                .map_err(StorageError::backend)?;
        Ok(rows.into_iter().map(client_row).collect())
    }

    pub(super) async fn get_connector_config(
        conn: &mut PgConnection,
        id: &str,
    ) -> StorageResult<Option<ConnectorConfigRow>> {
        let row: Option<ConnectorTuple> =
            query_as(r#"SELECT id, "type", config FROM connector_config WHERE id = $1"#)
                .bind(id)
                .fetch_optional(conn)
                .await
                .map_err(StorageError::backend)?;
        Ok(row.map(connector_row))
    }

    pub(super) async fn select_connector_configs(
        conn: &mut PgConnection,
    ) -> StorageResult<Vec<ConnectorConfigRow>> {
        let rows: Vec<ConnectorTuple> =
            query_as(r#"SELECT id, "type", config FROM connector_config"#)
                .fetch_all(conn)
                .await
                .map_err(StorageError::backend)?;
        Ok(rows.into_iter().map(connector_row).collect())
    }

    pub(super) async fn insert_connector_config(
        conn: &mut PgConnection,
        row: &ConnectorConfigRow,
    ) -> StorageResult<()> {
        query(r#"INSERT INTO connector_config (id, "type", config) VALUES ($1, $2, $3)"#)
            .bind(&row.id)
            .bind(&row.connector_type)
            .bind(&row.config)
            .execute(conn)
            .await
            .map_err(StorageError::backend)?;
        Ok(())
    }

    pub(super) async fn delete_connector_configs(conn: &mut PgConnection) -> StorageResult<u64> {
        let result = query(r#"DELETE FROM connector_config"#)
            .execute(conn)
            .await
            .map_err(StorageError::backend)?;
        Ok(result.rows_affected())
    }
}

/// Forwards every [`Executor`] method to the query helpers through the
/// type's `conn()` accessor.
macro_rules! impl_executor {
    ($ty:ty) => {
        #[async_trait]
        impl Executor for $ty {
            async fn get_client(&mut self, id: &str) -> StorageResult<Option<ClientRow>> {
                queries::get_client(self.conn()?, id).await
            }

            async fn insert_client(&mut self, row: &ClientRow) -> StorageResult<()> {
                queries::insert_client(self.conn()?, row).await
            }

            async fn update_client(&mut self, row: &ClientRow) -> StorageResult<bool> {
                queries::update_client(self.conn()?, row).await
            }

            async fn select_clients(&mut self) -> StorageResult<Vec<ClientRow>> {
                queries::select_clients(self.conn()?).await
            }

            async fn get_connector_config(
                &mut self,
                id: &str,
            ) -> StorageResult<Option<ConnectorConfigRow>> {
                queries::get_connector_config(self.conn()?, id).await
            }

            async fn select_connector_configs(&mut self) -> StorageResult<Vec<ConnectorConfigRow>> {
                queries::select_connector_configs(self.conn()?).await
            }

            async fn insert_connector_config(
                &mut self,
                row: &ConnectorConfigRow,
            ) -> StorageResult<()> {
                queries::insert_connector_config(self.conn()?, row).await
            }

            async fn delete_connector_configs(&mut self) -> StorageResult<u64> {
                queries::delete_connector_configs(self.conn()?).await
            }
        }
    };
}

/// Autocommit executor on one pooled connection.
pub struct PostgresExecutor {
    conn: PoolConnection<Postgres>,
}

impl PostgresExecutor {
    pub(crate) fn new(conn: PoolConnection<Postgres>) -> Self {
        Self { conn }
    }

    fn conn(&mut self) -> StorageResult<&mut PgConnection> {
        Ok(&mut *self.conn)
    }
}

impl_executor!(PostgresExecutor);

/// PostgreSQL transaction wrapper.
///
/// The underlying sqlx transaction rolls back on drop if it was never
/// committed.
pub struct PostgresTransaction {
    tx: Option<PgTransaction<'static>>,
}

impl PostgresTransaction {
    pub(crate) fn new(tx: PgTransaction<'static>) -> Self {
        Self { tx: Some(tx) }
    }

    fn conn(&mut self) -> StorageResult<&mut PgConnection> {
        let tx = self.tx.as_mut().ok_or_else(|| {
            StorageError::transaction("Transaction already completed (committed or rolled back)")
        })?;
        Ok(&mut **tx)
    }
}

impl_executor!(PostgresTransaction);

#[async_trait]
impl Transaction for PostgresTransaction {
    fn as_executor(&mut self) -> &mut dyn Executor {
        self
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(|e| {
                StorageError::transaction(format!("Failed to commit transaction: {e}"))
            })?;
            debug!("Transaction committed successfully");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(|e| {
                StorageError::transaction(format!("Failed to rollback transaction: {e}"))
            })?;
            debug!("Transaction rolled back successfully");
        }
        Ok(())
    }
}
