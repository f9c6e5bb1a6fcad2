//! Upstream identity connector configurations.
//!
//! Each connector implementation owns a configuration shape identified by a
//! type tag. Shapes are registered with a [`ConnectorRegistry`] at startup, and
//! the [`ConnectorConfigStore`] uses the registry to turn stored rows back into
//! concrete values.

mod builtin;
mod registry;
mod store;

use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use builtin::{GitHubConnectorConfig, LocalConnectorConfig, OidcConnectorConfig};
pub use registry::{ConnectorRegistry, Constructor};
pub use store::ConnectorConfigStore;

/// Object-safe view of a connector configuration.
///
/// Implemented for every [`ConnectorKind`]; implement that trait instead.
pub trait ConnectorConfig: fmt::Debug + Send + Sync + 'static {
    /// ID of the connector instance.
    fn connector_id(&self) -> &str;

    /// Type tag of the configuration shape.
    fn connector_type(&self) -> &'static str;

    /// Serializes the configuration into its stored text form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> serde_json::Result<String>;

    fn as_any(&self) -> &dyn Any;
}

/// A concrete connector configuration shape.
pub trait ConnectorKind: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {
    /// Type tag stored alongside the configuration.
    const TYPE: &'static str;

    /// ID of the connector instance.
    fn id(&self) -> &str;
}

impl<T: ConnectorKind> ConnectorConfig for T {
    fn connector_id(&self) -> &str {
        self.id()
    }

    fn connector_type(&self) -> &'static str {
        T::TYPE
    }

    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn ConnectorConfig {
    /// Downcast to a concrete configuration shape.
    #[must_use]
    pub fn downcast_ref<T: ConnectorKind>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
