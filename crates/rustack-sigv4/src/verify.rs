//! Verification of signed incoming requests.
//!
//! [`parse_authorization`](crate::authorization::parse_authorization) only
//! checks structure. [`verify_request`] builds on it:
//!
//! 1. Parse the `Authorization` header.
//! 2. Resolve the secret key via the credential provider.
//! 3. Re-run the signing flow with the parsed signed headers and the
//!    request's own date header.
//! 4. Compare signatures using constant-time comparison.

use subtle::ConstantTimeEq;
use tracing::debug;

use crate::authorization::{ParsedAuthorization, parse_request_authorization};
use crate::credentials::{Credential, CredentialProvider};
use crate::error::{SigningError, SigningResult};
use crate::request::SignableRequest;
use crate::signer::{header_timestamp, request_signature};

/// Verify a SigV4-signed request.
///
/// Returns the parsed credential on success.
///
/// # Errors
///
/// Returns a [`SigningError`] if:
/// - The `Authorization` header is missing or malformed
/// - The access key is not found
/// - Neither `x-amz-date` nor `Date` holds a usable timestamp
/// - The signature does not match
pub fn verify_request(
    credential_provider: &dyn CredentialProvider,
    request: &SignableRequest,
) -> SigningResult<ParsedAuthorization> {
    let parsed = parse_request_authorization(request)?;
    let secret_key = credential_provider.get_secret_key(parsed.access_key_id())?;

    let timestamp = header_timestamp(&request.headers).unwrap_or_else(|| {
        Err(SigningError::InvalidTimestamp(
            "signed request carries no date header".to_owned(),
        ))
    })?;

    debug!(
        access_key_id = %parsed.access_key_id(),
        region = %parsed.region(),
        service = %parsed.service(),
        "Verifying SigV4 signature"
    );

    let credential = Credential::new(
        parsed.access_key_id(),
        secret_key,
        parsed.region(),
        parsed.service(),
    );
    let expected_signature = request_signature(
        &credential,
        request,
        &parsed.signed_header_set(),
        &timestamp,
    )?;

    if signatures_match(parsed.signature(), &expected_signature) {
        debug!(access_key_id = %parsed.access_key_id(), "Signature verification succeeded");
        Ok(parsed)
    } else {
        debug!(
            expected = %expected_signature,
            provided = %parsed.signature(),
            "Signature mismatch"
        );
        Err(SigningError::SignatureDoesNotMatch)
    }
}

/// Compare two hex signatures in constant time.
#[must_use]
pub fn signatures_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
