//! Client types and the stored row shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Client Types
// =============================================================================

/// Keys of the known metadata fields. None of them may appear in `extra`.
pub const RESERVED_METADATA_KEYS: &[&str] = &[
    "redirectURIs",
    "clientName",
    "logoURI",
    "clientURI",
    "contacts",
    "responseTypes",
    "grantTypes",
    "tokenEndpointAuthMethod",
];

/// Registration metadata of a client.
///
/// Unknown keys are kept in `extra` so that a stored document loads back into
/// an equal value. URIs are kept as the exact text given; they are checked
/// to parse as absolute URLs when a client is created. A known field that is
/// `null` or an empty list is treated as absent and is not written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMetadata {
    /// Allowed redirect URIs.
    #[serde(default, rename = "redirectURIs", skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,

    /// Human-readable client name.
    #[serde(default, rename = "clientName", skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    #[serde(default, rename = "logoURI", skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,

    #[serde(default, rename = "clientURI", skip_serializing_if = "Option::is_none")]
    pub client_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<String>,

    #[serde(default, rename = "responseTypes", skip_serializing_if = "Vec::is_empty")]
    pub response_types: Vec<String>,

    #[serde(default, rename = "grantTypes", skip_serializing_if = "Vec::is_empty")]
    pub grant_types: Vec<String>,

    #[serde(
        default,
        rename = "tokenEndpointAuthMethod",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_endpoint_auth_method: Option<String>,

    /// Any other metadata fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientMetadata {
    /// Returns the first key of `extra` that names a known field.
    ///
    /// Such a key would be written twice and the document could not be read
    /// back.
    #[must_use]
    pub fn reserved_extra_key(&self) -> Option<&str> {
        RESERVED_METADATA_KEYS
            .iter()
            .copied()
            .find(|key| self.extra.contains_key(*key))
    }

    /// Every URI field: redirect URIs, then logo and client URIs.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.redirect_uris
            .iter()
            .chain(&self.logo_uri)
            .chain(&self.client_uri)
            .map(String::as_str)
    }

    /// Serializes the metadata into its stored text form.
    ///
    /// # Errors
    ///
    /// Returns an error if `extra` repeats a known field or serialization
    /// fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        if let Some(key) = self.reserved_extra_key() {
            return Err(serde::ser::Error::custom(format!(
                "extra metadata field {key:?} repeats a known field"
            )));
        }
        serde_json::to_string(self)
    }

    /// Parses metadata from its stored text form.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid metadata document.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// A registered client, as read back from storage.
///
/// The secret is never part of this type: only its hash is stored, and the
/// hash never leaves the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: String,
    pub metadata: ClientMetadata,
    pub admin: bool,
}

/// A client to be registered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub id: String,

    /// URL-safe base64 encoded secret. When absent the store generates one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(default)]
    pub metadata: ClientMetadata,

    #[serde(default)]
    pub admin: bool,
}

impl NewClient {
    /// Create a client with a server-generated secret.
    #[must_use]
    pub fn new(id: impl Into<String>, metadata: ClientMetadata) -> Self {
        Self {
            id: id.into(),
            secret: None,
            metadata,
            admin: false,
        }
    }

    /// Use a caller-supplied, already encoded secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set the administrator flag.
    #[must_use]
    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }
}

/// Client ID plus the URL-safe base64 encoded secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub id: String,
    pub secret: String,
}

impl ClientCredentials {
    #[must_use]
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Rows
// =============================================================================

/// Row of the `client_identity` table.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientRow {
    /// Client ID (primary key).
    pub id: String,
    /// Hash of the raw secret.
    pub secret: Vec<u8>,
    /// Metadata as JSON text.
    pub metadata: String,
    /// `dex_admin` column.
    pub dex_admin: bool,
}

impl fmt::Debug for ClientRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRow")
            .field("id", &self.id)
            .field("metadata", &self.metadata)
            .field("dex_admin", &self.dex_admin)
            .finish_non_exhaustive()
    }
}

/// Row of the `connector_config` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfigRow {
    /// Connector ID (primary key).
    pub id: String,
    /// Type tag selecting the configuration shape.
    pub connector_type: String,
    /// Configuration as JSON text.
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_roundtrip_preserves_unknown_fields() {
        let doc = json!({
            "redirectURIs": ["https://app.example.com/callback"],
            "clientName": "Example",
            "contacts": ["ops@example.com"],
            "x-tenant": {"region": "eu", "tiers": [1, 2, {"gold": true}]},
            "nullable": null
        });
        let metadata: ClientMetadata = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(metadata.client_name.as_deref(), Some("Example"));
        assert_eq!(metadata.extra.len(), 2);

        let text = metadata.to_json().unwrap();
        let reloaded = ClientMetadata::from_json(&text).unwrap();
        assert_eq!(reloaded, metadata);
        assert_eq!(serde_json::to_value(&reloaded).unwrap(), doc);
    }

    #[test]
    fn test_uri_text_is_kept_verbatim() {
        let doc = json!({
            "redirectURIs": ["https://a.example.com", "http://localhost:8080/cb"],
            "logoURI": "https://cdn.example.com"
        });
        let metadata: ClientMetadata = serde_json::from_value(doc.clone()).unwrap();
        let reloaded = ClientMetadata::from_json(&metadata.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.redirect_uris[0], "https://a.example.com");
        assert_eq!(
            reloaded.uris().collect::<Vec<_>>(),
            ["https://a.example.com", "http://localhost:8080/cb", "https://cdn.example.com"]
        );
        assert_eq!(serde_json::to_value(&reloaded).unwrap(), doc);
    }

    #[test]
    fn test_null_and_empty_known_fields_read_as_absent() {
        let metadata: ClientMetadata =
            serde_json::from_value(json!({"clientName": null, "contacts": []})).unwrap();
        assert_eq!(metadata, ClientMetadata::default());
        assert_eq!(metadata.to_json().unwrap(), "{}");
    }

    #[test]
    fn test_reserved_key_in_extra_fails_serialization() {
        let mut metadata = ClientMetadata {
            client_name: Some("A".into()),
            ..ClientMetadata::default()
        };
        metadata.extra.insert("clientName".into(), json!(5));
        assert_eq!(metadata.reserved_extra_key(), Some("clientName"));
        assert!(metadata.to_json().is_err());

        metadata.extra.remove("clientName");
        metadata.extra.insert("x-client-name".into(), json!(5));
        assert_eq!(metadata.reserved_extra_key(), None);
        assert!(metadata.to_json().is_ok());
    }

    #[test]
    fn test_empty_metadata_serializes_to_empty_object() {
        assert_eq!(ClientMetadata::default().to_json().unwrap(), "{}");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = ClientCredentials::new("web", "c2VjcmV0");
        let debug = format!("{creds:?}");
        assert!(debug.contains("web"));
        assert!(!debug.contains("c2VjcmV0"));
    }

    #[test]
    fn test_client_row_debug_hides_hash() {
        let row = ClientRow {
            id: "web".into(),
            secret: b"$2b$10$hash".to_vec(),
            metadata: "{}".into(),
            dex_admin: false,
        };
        assert!(!format!("{row:?}").contains("hash"));
    }

    #[test]
    fn test_new_client_from_seed_document() {
        let client: NewClient = serde_json::from_value(json!({
            "id": "seeded",
            "secret": "c2VjcmV0",
            "metadata": {"redirectURIs": ["http://127.0.0.1:5555/callback"]}
        }))
        .unwrap();
        assert_eq!(client.secret.as_deref(), Some("c2VjcmV0"));
        assert!(!client.admin);
        assert_eq!(client.metadata.redirect_uris.len(), 1);
    }
}
