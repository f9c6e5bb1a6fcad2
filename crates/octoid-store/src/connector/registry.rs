//! Type tag to configuration shape mapping.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::builtin::{GitHubConnectorConfig, LocalConnectorConfig, OidcConnectorConfig};
use super::{ConnectorConfig, ConnectorKind};
use crate::StorageResult;
use crate::error::StorageError;

/// Builds a concrete configuration from its JSON document.
pub type Constructor = fn(Value) -> serde_json::Result<Box<dyn ConnectorConfig>>;

fn construct<T: ConnectorKind>(value: Value) -> serde_json::Result<Box<dyn ConnectorConfig>> {
    let config: T = serde_json::from_value(value)?;
    Ok(Box::new(config))
}

/// Registry of connector configuration shapes keyed by type tag.
#[derive(Debug, Clone, Default)]
pub struct ConnectorRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl ConnectorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `local`, `oidc` and `github` shapes.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register::<LocalConnectorConfig>();
        registry.register::<OidcConnectorConfig>();
        registry.register::<GitHubConnectorConfig>();
        registry
    }

    /// Register a configuration shape under its type tag.
    ///
    /// Registering the same tag twice keeps the latest shape.
    pub fn register<T: ConnectorKind>(&mut self) {
        if self.constructors.insert(T::TYPE, construct::<T>).is_some() {
            debug!(connector_type = T::TYPE, "Replaced connector config type");
        } else {
            debug!(connector_type = T::TYPE, "Registered connector config type");
        }
    }

    /// Returns `true` if `tag` has a registered shape.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered type tags, sorted.
    #[must_use]
    pub fn types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.constructors.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Looks up the constructor for `tag`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnknownType` if nothing is registered for `tag`.
    pub fn new_config_for_type(&self, tag: &str) -> StorageResult<Constructor> {
        self.constructors
            .get(tag)
            .copied()
            .ok_or_else(|| StorageError::unknown_type(tag))
    }

    /// Decodes a stored configuration document of type `tag`.
    ///
    /// `id` is only used to label deserialization errors.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnknownType` for an unregistered tag and
    /// `StorageError::Deserialization` if the document does not match the shape.
    pub fn decode(
        &self,
        tag: &str,
        id: &str,
        config: &str,
    ) -> StorageResult<Box<dyn ConnectorConfig>> {
        let constructor = self.new_config_for_type(tag)?;
        serde_json::from_str(config)
            .and_then(constructor)
            .map_err(|e| StorageError::deserialization("connector config", id, e))
    }

    /// Decodes a JSON array of configurations, each carrying its own `type`.
    ///
    /// ```
    /// use octoid_store::connector::ConnectorRegistry;
    ///
    /// let registry = ConnectorRegistry::with_builtin();
    /// let configs = registry
    ///     .decode_list(r#"[{"type": "local", "id": "local"}]"#)
    ///     .unwrap();
    /// assert_eq!(configs[0].connector_id(), "local");
    /// ```
    ///
    /// # Errors
    ///
    /// Fails on the first item that has no `type`, an unknown `type`, or does
    /// not match its shape.
    pub fn decode_list(&self, document: &str) -> StorageResult<Vec<Box<dyn ConnectorConfig>>> {
        let items: Vec<Value> = serde_json::from_str(document)?;
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let tag = item
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        StorageError::validation(format!(
                            "connector config at index {index} has no \"type\""
                        ))
                    })?
                    .to_owned();
                let constructor = self.new_config_for_type(&tag)?;
                constructor(item).map_err(|e| {
                    StorageError::deserialization("connector config", format!("#{index}"), e)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_types() {
        let registry = ConnectorRegistry::with_builtin();
        assert_eq!(registry.types(), vec!["github", "local", "oidc"]);
        assert!(registry.contains("oidc"));
        assert!(!ConnectorRegistry::new().contains("oidc"));
    }

    #[test]
    fn test_unknown_type() {
        let registry = ConnectorRegistry::new();
        let err = registry.decode("saml", "corp", "{}").unwrap_err();
        assert!(err.is_unknown_type());
        assert!(registry.new_config_for_type("saml").is_err());
    }

    #[test]
    fn test_decode_concrete_shape() {
        let registry = ConnectorRegistry::with_builtin();
        let doc = json!({
            "id": "google",
            "issuerURL": "https://accounts.google.com",
            "clientID": "cid",
            "clientSecret": "shh"
        });
        let config = registry.decode("oidc", "google", &doc.to_string()).unwrap();
        assert_eq!(config.connector_type(), "oidc");
        let oidc = config.downcast_ref::<OidcConnectorConfig>().unwrap();
        assert_eq!(oidc.client_id, "cid");
        assert!(config.downcast_ref::<LocalConnectorConfig>().is_none());
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let registry = ConnectorRegistry::with_builtin();
        let err = registry.decode("oidc", "google", r#"{"id":"google"}"#).unwrap_err();
        assert!(matches!(err, StorageError::Deserialization { .. }));
    }

    #[test]
    fn test_decode_list_mixed_types() {
        let registry = ConnectorRegistry::with_builtin();
        let configs = registry
            .decode_list(
                r#"[
                    {"type": "local", "id": "local"},
                    {"type": "github", "id": "gh", "clientID": "abc", "clientSecret": "def"}
                ]"#,
            )
            .unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[1].connector_type(), "github");
        assert_eq!(configs[1].connector_id(), "gh");
    }

    #[test]
    fn test_decode_list_requires_type() {
        let registry = ConnectorRegistry::with_builtin();
        let err = registry.decode_list(r#"[{"id": "local"}]"#).unwrap_err();
        assert!(err.is_validation());

        let err = registry
            .decode_list(r#"[{"type": "local", "id": "a"}, {"type": "ldap", "id": "b"}]"#)
            .unwrap_err();
        assert!(err.is_unknown_type());
    }
}
