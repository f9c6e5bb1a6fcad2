//! Storage core for the octoid identity provider.
//!
//! Provides persistent storage for:
//!
//! - Client credentials (`client_identity` table): issuance, hashing,
//!   authentication and the administrator flag
//! - Upstream connector configurations (`connector_config` table), decoded
//!   into concrete shapes through a type registry
//!
//! The stores are backend-agnostic. A database backend implements the
//! [`Database`], [`Executor`] and [`Transaction`] traits and registers how it
//! reports uniqueness violations with an [`AlreadyExistsRegistry`]. The
//! in-memory backend in [`memory`] ships with this crate; PostgreSQL lives in
//! `octoid-store-postgres`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use octoid_store::memory::{self, MemoryDatabase};
//! use octoid_store::{AlreadyExistsRegistry, ClientMetadata, ClientStore, NewClient};
//!
//! # tokio_test::block_on(async {
//! let mut already_exists = AlreadyExistsRegistry::new();
//! memory::register_already_exists_checker(&mut already_exists);
//!
//! let store = ClientStore::new(Arc::new(MemoryDatabase::new()), Arc::new(already_exists));
//! let creds = store
//!     .create(None, NewClient::new("web", ClientMetadata::default()))
//!     .await
//!     .unwrap();
//! assert!(store.authenticate(None, &creds).await.unwrap());
//! # });
//! ```

pub mod client;
pub mod connector;
mod error;
pub mod hasher;
pub mod memory;
pub mod registry;
pub mod secret;
mod traits;
mod types;

pub use client::ClientStore;
pub use connector::{
    ConnectorConfig, ConnectorConfigStore, ConnectorKind, ConnectorRegistry, GitHubConnectorConfig,
    LocalConnectorConfig, OidcConnectorConfig,
};
pub use error::{BoxError, ErrorCategory, StorageError};
pub use hasher::{HashAlgorithm, HashConfig, SecretHasher};
pub use registry::AlreadyExistsRegistry;
pub use traits::{Database, Executor, Transaction, finish};
pub use types::{
    Client, ClientCredentials, ClientMetadata, ClientRow, ConnectorConfigRow, NewClient,
    RESERVED_METADATA_KEYS,
};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
