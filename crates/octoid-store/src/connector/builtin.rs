//! Built-in connector configuration shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConnectorKind;

/// Username/password accounts stored by the identity provider itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConnectorConfig {
    pub id: String,
}

impl ConnectorKind for LocalConnectorConfig {
    const TYPE: &'static str = "local";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Any OpenID Connect provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcConnectorConfig {
    pub id: String,

    #[serde(rename = "issuerURL")]
    pub issuer_url: Url,

    #[serde(rename = "clientID")]
    pub client_id: String,

    #[serde(rename = "clientSecret")]
    pub client_secret: String,

    /// Accept the upstream `email_verified` claim as-is.
    #[serde(default, rename = "trustedEmailProvider")]
    pub trusted_email_provider: bool,

    #[serde(default, rename = "emailClaim", skip_serializing_if = "Option::is_none")]
    pub email_claim: Option<String>,
}

impl ConnectorKind for OidcConnectorConfig {
    const TYPE: &'static str = "oidc";

    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for OidcConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcConnectorConfig")
            .field("id", &self.id)
            .field("issuer_url", &self.issuer_url.as_str())
            .field("client_id", &self.client_id)
            .field("trusted_email_provider", &self.trusted_email_provider)
            .field("email_claim", &self.email_claim)
            .finish_non_exhaustive()
    }
}

/// GitHub OAuth application.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConnectorConfig {
    pub id: String,

    #[serde(rename = "clientID")]
    pub client_id: String,

    #[serde(rename = "clientSecret")]
    pub client_secret: String,

    /// GitHub Enterprise API endpoint. Defaults to github.com when unset.
    #[serde(default, rename = "apiURL", skip_serializing_if = "Option::is_none")]
    pub api_url: Option<Url>,
}

impl ConnectorKind for GitHubConnectorConfig {
    const TYPE: &'static str = "github";

    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for GitHubConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConnectorConfig")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("api_url", &self.api_url.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}
