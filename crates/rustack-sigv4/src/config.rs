//! Signing configuration.
//!
//! Provides [`SigningConfig`], loaded from environment variables with the same
//! names the Rustack servers read their credentials from.

use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::credentials::Credential;

/// Credentials and scope used to sign outgoing requests.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::config::SigningConfig;
///
/// let config = SigningConfig::default();
/// assert_eq!(config.region, "us-east-1");
/// assert_eq!(config.service, "execute-api");
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfig {
    /// Access key ID placed in the credential scope.
    #[builder(default = String::from("test"))]
    pub access_key_id: String,

    /// Secret access key. Never serialized.
    #[serde(default, skip_serializing)]
    #[builder(default = String::from("test"))]
    pub secret_key: String,

    /// Region of the credential scope.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Service name of the credential scope.
    #[builder(default = String::from("execute-api"))]
    pub service: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::from("test"),
            secret_key: String::from("test"),
            region: String::from("us-east-1"),
            service: String::from("execute-api"),
        }
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

impl SigningConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ACCESS_KEY` or `AWS_ACCESS_KEY_ID` | `test` |
    /// | `SECRET_KEY` or `AWS_SECRET_ACCESS_KEY` | `test` |
    /// | `DEFAULT_REGION` or `AWS_DEFAULT_REGION` | `us-east-1` |
    /// | `SIGNING_SERVICE` | `execute-api` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source, with the same names and
    /// defaults as [`SigningConfig::from_env`].
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| names.iter().copied().find_map(&lookup);
        let mut config = Self::default();

        if let Some(v) = first(&["ACCESS_KEY", "AWS_ACCESS_KEY_ID"]) {
            config.access_key_id = v;
        }
        if let Some(v) = first(&["SECRET_KEY", "AWS_SECRET_ACCESS_KEY"]) {
            config.secret_key = v;
        }
        if let Some(v) = first(&["DEFAULT_REGION", "AWS_DEFAULT_REGION"]) {
            config.region = v;
        }
        if let Some(v) = lookup("SIGNING_SERVICE") {
            config.service = v;
        }

        config
    }

    /// Build the immutable [`Credential`] this configuration describes.
    #[must_use]
    pub fn credential(&self) -> Credential {
        Credential::new(
            self.access_key_id.clone(),
            self.secret_key.clone(),
            self.region.clone(),
            self.service.clone(),
        )
    }
}
