//! Error types for SigV4 signing and Authorization header parsing.
//!
//! All failures are represented by [`SigningError`]. Parse failures carry the
//! [`ParseStage`] that rejected the header so callers can tell a bad algorithm
//! tag from a bad credential segment.

use std::fmt;

/// The step of the Authorization header parser that rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseStage {
    /// The value is too short or does not start with `AWS4-HMAC-SHA256`.
    Algorithm,
    /// The value does not split into exactly four tokens.
    TokenCount,
    /// The `Credential=` token is missing or malformed.
    Credential,
    /// The `SignedHeaders=` token is missing.
    SignedHeaders,
    /// The `Signature` token is missing.
    Signature,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Algorithm => "algorithm",
            Self::TokenCount => "token count",
            Self::Credential => "credential",
            Self::SignedHeaders => "signed headers",
            Self::Signature => "signature",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while signing a request or parsing its credential.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The `Authorization` header failed a structural check.
    #[error("Malformed Authorization header at {stage} stage: {reason}")]
    MalformedHeader {
        /// The parser stage that failed.
        stage: ParseStage,
        /// What was wrong with the input.
        reason: String,
    },

    /// No usable timestamp: a date header did not parse, or the clock is unavailable.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The underlying digest or MAC primitive failed.
    #[error("Hash failure: {0}")]
    HashFailure(String),

    /// The request body could not be buffered.
    #[error("Failed to read request body: {0}")]
    BodyReadFailure(String),

    /// A computed header value cannot be carried by an HTTP header.
    #[error("Invalid header value for {0}")]
    InvalidHeaderValue(String),

    /// The access key ID was not found in the credential store.
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The recomputed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,
}

impl SigningError {
    /// Build a [`SigningError::MalformedHeader`] for the given stage.
    pub(crate) fn malformed(stage: ParseStage, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            stage,
            reason: reason.into(),
        }
    }
}

/// Convenience result type for signing operations.
pub type SigningResult<T> = Result<T, SigningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_name_stage_in_malformed_message() {
        let err = SigningError::malformed(ParseStage::Credential, "wrong terminator");
        assert_eq!(
            err.to_string(),
            "Malformed Authorization header at credential stage: wrong terminator"
        );
    }
}
