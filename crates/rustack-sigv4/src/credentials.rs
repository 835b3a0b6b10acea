//! Signing credentials and the lookup used when verifying requests.
//!
//! [`Credential`] is the immutable access key / secret / scope bundle a caller
//! signs with. [`CredentialProvider`] resolves a secret key from the access key
//! ID found in an incoming `Authorization` header.

use std::collections::HashMap;
use std::fmt;

use crate::error::SigningError;

/// An access key pair bound to a region and service.
///
/// Immutable once built, so one value can be shared across threads and reused
/// for any number of signing calls. The secret key is redacted from `Debug`.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::Credential;
///
/// let credential = Credential::new(
///     "AKIDEXAMPLE",
///     "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
///     "us-east-1",
///     "host",
/// );
/// assert!(!format!("{credential:?}").contains("EXAMPLEKEY"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key_id: String,
    secret_key: String,
    region: String,
    service: String,
}

impl Credential {
    /// Create a credential.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// The access key ID.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret access key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// The region of the credential scope.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The service of the credential scope.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

/// Trait for looking up secret access keys by access key ID.
///
/// Implementations may back this with a database, configuration file,
/// or any other credential store.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret access key for the given access key ID.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::AccessKeyNotFound`] if the access key ID is not recognized.
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, SigningError>;
}

/// A simple in-memory credential provider backed by a `HashMap`.
#[derive(Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Create a provider from (access_key_id, secret_key) pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }
}

impl fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("access_keys", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, SigningError> {
        self.credentials
            .get(access_key_id)
            .cloned()
            .ok_or_else(|| SigningError::AccessKeyNotFound(access_key_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_expose_credential_fields() {
        let credential = Credential::new("AKID", "secret", "us-east-1", "host");
        assert_eq!(credential.access_key_id(), "AKID");
        assert_eq!(credential.secret_key(), "secret");
        assert_eq!(credential.region(), "us-east-1");
        assert_eq!(credential.service(), "host");
    }

    #[test]
    fn test_should_redact_secret_in_debug() {
        let credential = Credential::new("AKID", "super-secret", "us-east-1", "host");
        let debug = format!("{credential:?}");
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_should_return_secret_key_for_known_access_key() {
        let provider =
            StaticCredentialProvider::new(vec![("AKID".to_owned(), "secret".to_owned())]);

        let result = provider.get_secret_key("AKID");
        assert_eq!(result.unwrap(), "secret");
        assert!(!format!("{provider:?}").contains("secret"));
    }

    #[test]
    fn test_should_return_error_for_unknown_access_key() {
        let provider = StaticCredentialProvider::new(vec![]);

        let result = provider.get_secret_key("UNKNOWN");
        assert!(matches!(result, Err(SigningError::AccessKeyNotFound(_))));
    }
}
