//! PostgreSQL backend for the octoid storage core.
//!
//! Implements [`Database`] on top of an sqlx connection pool. The tables are
//! created by external migration tooling and are expected to look like this:
//!
//! ```sql
//! CREATE TABLE client_identity (
//!     id TEXT PRIMARY KEY,
//!     secret BYTEA NOT NULL,
//!     metadata TEXT NOT NULL,
//!     dex_admin BOOLEAN NOT NULL DEFAULT FALSE
//! );
//!
//! CREATE TABLE connector_config (
//!     id TEXT PRIMARY KEY,
//!     type TEXT NOT NULL,
//!     config TEXT NOT NULL
//! );
//! ```
//!
//! Duplicate primary keys surface as SQLSTATE `23505`; call
//! [`register_already_exists_checker`] while wiring the stores so they report
//! them as `StorageError::AlreadyExists`.
//!
//! # Example
//!
//! ```ignore
//! use octoid_store::{AlreadyExistsRegistry, ClientStore};
//! use octoid_store_postgres::{PostgresConfig, PostgresDatabase};
//!
//! let db = PostgresDatabase::connect(&PostgresConfig::new("postgres://localhost/octoid")).await?;
//!
//! let mut already_exists = AlreadyExistsRegistry::new();
//! octoid_store_postgres::register_already_exists_checker(&mut already_exists);
//! let clients = ClientStore::new(Arc::new(db), Arc::new(already_exists));
//! ```

mod config;
mod error;
mod executor;
mod pool;

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::instrument;

use octoid_store::{Database, Executor, StorageError, StorageResult, Transaction};

pub use config::PostgresConfig;
pub use error::{
    PG_UNIQUE_VIOLATION, PostgresError, Result, has_pg_error_code, is_unique_violation,
    register_already_exists_checker,
};
pub use executor::{PostgresExecutor, PostgresTransaction};
pub use pool::{create_pool, test_connection};

/// PostgreSQL [`Database`] backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a pool from `config` and verifies it can reach the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the server cannot
    /// be reached.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        test_connection(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    #[instrument(skip(self))]
    async fn begin(&self) -> StorageResult<Box<dyn Transaction>> {
        let tx = self.pool.begin().await.map_err(|e| {
            StorageError::transaction(format!("Failed to begin transaction: {e}"))
        })?;
        Ok(Box::new(PostgresTransaction::new(tx)))
    }

    async fn executor(&self) -> StorageResult<Box<dyn Executor>> {
        let conn = self.pool.acquire().await.map_err(StorageError::backend)?;
        Ok(Box::new(PostgresExecutor::new(conn)))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
