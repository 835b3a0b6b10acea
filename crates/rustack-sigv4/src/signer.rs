//! Request signing.
//!
//! [`sign_request`] runs the full SigV4 flow over a [`SignableRequest`]:
//! resolve the timestamp, build the canonical request and string to sign,
//! derive the signing key, and attach the `Authorization` header.
//!
//! The request is updated only after every step succeeded. On error its
//! headers are exactly as they were before the call.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::canonical::{canonical_request, signed_headers_string};
use crate::clock::{Clock, SystemClock};
use crate::credentials::Credential;
use crate::error::{SigningError, SigningResult};
use crate::request::{HeaderMultimap, SignableRequest, SignedHeaderSet};
use crate::sigv4::{
    DATE, X_AMZ_DATE, compute_signature, credential_scope, derive_signing_key, format_amz_date,
    format_credential_value, parse_amz_date, parse_http_date, string_to_sign,
};

/// Name of the header carrying the credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Sign a request in place.
///
/// The timestamp comes from the `x-amz-date` header if present, else from the
/// `Date` header, else from `clock`. In the last case any empty `Date` header is
/// dropped and a fresh `x-amz-date` header is set and signed.
///
/// # Errors
///
/// - [`SigningError::InvalidTimestamp`] if a date header does not parse, or no
///   date header is present and the clock is unavailable.
/// - [`SigningError::HashFailure`] if key derivation fails.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::clock::SystemClock;
/// use rustack_sigv4::request::{SignableRequest, SignedHeaderSet};
/// use rustack_sigv4::{Credential, sign_request};
///
/// let credential = Credential::new(
///     "AKIDEXAMPLE",
///     "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
///     "us-east-1",
///     "host",
/// );
/// let mut request = SignableRequest::new("GET", "host.foo.com", "/%20/foo")
///     .with_header("date", "Mon, 09 Sep 2011 23:36:00 GMT");
/// sign_request(&credential, &mut request, &SignedHeaderSet::all(), &SystemClock).unwrap();
/// assert_eq!(
///     request.headers.get("authorization"),
///     Some(
///         "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20110909/us-east-1/host/aws4_request, \
///          SignedHeaders=date;host, \
///          Signature=f309cfbd10197a230c42dd17dbf5cca8a0722564cb40a872d25623cfa758e374"
///     )
/// );
/// ```
pub fn sign_request(
    credential: &Credential,
    request: &mut SignableRequest,
    signed_headers: &SignedHeaderSet,
    clock: &dyn Clock,
) -> SigningResult<()> {
    let mut staged = request.clone();
    let timestamp = resolve_timestamp(&mut staged.headers, clock)?;
    let authorization = authorization_value(credential, &staged, signed_headers, &timestamp)?;

    staged.headers.insert(AUTHORIZATION, authorization);
    request.headers = staged.headers;
    Ok(())
}

/// Compute the `Authorization` header value for a request at a fixed timestamp.
///
/// Pure: the request is not modified.
///
/// # Errors
///
/// Returns [`SigningError::HashFailure`] if key derivation fails.
pub fn authorization_value(
    credential: &Credential,
    request: &SignableRequest,
    signed_headers: &SignedHeaderSet,
    timestamp: &DateTime<Utc>,
) -> SigningResult<String> {
    let signature = request_signature(credential, request, signed_headers, timestamp)?;
    let scope = credential_scope(timestamp, credential.region(), credential.service());

    Ok(format_credential_value(
        &signature,
        credential.access_key_id(),
        &scope,
        &signed_headers_string(request, signed_headers),
    ))
}

/// Compute the hex signature of a request at a fixed timestamp.
///
/// # Errors
///
/// Returns [`SigningError::HashFailure`] if key derivation fails.
pub fn request_signature(
    credential: &Credential,
    request: &SignableRequest,
    signed_headers: &SignedHeaderSet,
    timestamp: &DateTime<Utc>,
) -> SigningResult<String> {
    let canonical_request = canonical_request(request, signed_headers);
    debug!(canonical_request, "Built canonical request");

    let scope = credential_scope(timestamp, credential.region(), credential.service());
    let string_to_sign = string_to_sign(&canonical_request, &scope, timestamp);
    debug!(string_to_sign, "Built string to sign");

    let signing_key = derive_signing_key(
        credential.secret_key(),
        credential.region(),
        credential.service(),
        timestamp,
    )?;
    compute_signature(&string_to_sign, &signing_key)
}

/// Build the string to sign for a request that already carries `x-amz-date`.
///
/// Useful for handing the string to an external signer. The request is not
/// modified and no clock is consulted.
///
/// # Errors
///
/// Returns [`SigningError::InvalidTimestamp`] if `x-amz-date` is missing or malformed.
pub fn string_to_sign_for_request(
    credential: &Credential,
    request: &SignableRequest,
    signed_headers: &SignedHeaderSet,
) -> SigningResult<String> {
    let value = non_empty_header(&request.headers, X_AMZ_DATE)
        .ok_or_else(|| SigningError::InvalidTimestamp(format!("missing {X_AMZ_DATE} header")))?;
    let timestamp = parse_amz_date(value)?;

    let canonical_request = canonical_request(request, signed_headers);
    let scope = credential_scope(&timestamp, credential.region(), credential.service());
    Ok(string_to_sign(&canonical_request, &scope, &timestamp))
}

/// Read the signing timestamp from the request's date headers.
///
/// Returns `None` when neither `x-amz-date` nor `Date` is set.
pub(crate) fn header_timestamp(
    headers: &HeaderMultimap,
) -> Option<SigningResult<DateTime<Utc>>> {
    if let Some(value) = non_empty_header(headers, X_AMZ_DATE) {
        debug!(value, "Using x-amz-date header as signing time");
        return Some(parse_amz_date(value));
    }
    if let Some(value) = non_empty_header(headers, DATE) {
        debug!(value, "Using Date header as signing time");
        return Some(parse_http_date(value));
    }
    None
}

/// Resolve the signing timestamp, stamping `x-amz-date` when the clock is used.
fn resolve_timestamp(
    headers: &mut HeaderMultimap,
    clock: &dyn Clock,
) -> SigningResult<DateTime<Utc>> {
    if let Some(timestamp) = header_timestamp(headers) {
        return timestamp;
    }

    let now = clock.now().ok_or_else(|| {
        SigningError::InvalidTimestamp("no date header and clock unavailable".to_owned())
    })?;
    debug!(%now, "Stamping request with current time");

    headers.remove(DATE);
    headers.insert(X_AMZ_DATE, format_amz_date(&now));
    Ok(now)
}

fn non_empty_header<'a>(headers: &'a HeaderMultimap, name: &str) -> Option<&'a str> {
    headers.get(name).filter(|value| !value.is_empty())
}

/// A credential paired with a clock.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::request::{SignableRequest, SignedHeaderSet};
/// use rustack_sigv4::{Credential, Signer};
///
/// let signer = Signer::new(Credential::new("AKID", "secret", "us-east-1", "execute-api"));
/// let mut request = SignableRequest::new("GET", "api.example.com", "/items");
/// signer.sign(&mut request, &SignedHeaderSet::all()).unwrap();
/// assert!(request.headers.contains("x-amz-date"));
/// assert!(request.headers.contains("authorization"));
/// ```
#[derive(Debug, Clone)]
pub struct Signer<C = SystemClock> {
    credential: Credential,
    clock: C,
}

impl Signer<SystemClock> {
    /// Create a signer using the system clock.
    #[must_use]
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> Signer<C> {
    /// Replace the clock.
    #[must_use]
    pub fn with_clock<D: Clock>(self, clock: D) -> Signer<D> {
        Signer {
            credential: self.credential,
            clock,
        }
    }

    /// The credential used for signing.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Sign a request in place. See [`sign_request`].
    ///
    /// # Errors
    ///
    /// See [`sign_request`].
    pub fn sign(
        &self,
        request: &mut SignableRequest,
        signed_headers: &SignedHeaderSet,
    ) -> SigningResult<()> {
        sign_request(&self.credential, request, signed_headers, &self.clock)
    }

    /// Build the string to sign. See [`string_to_sign_for_request`].
    ///
    /// # Errors
    ///
    /// See [`string_to_sign_for_request`].
    pub fn string_to_sign(
        &self,
        request: &SignableRequest,
        signed_headers: &SignedHeaderSet,
    ) -> SigningResult<String> {
        string_to_sign_for_request(&self.credential, request, signed_headers)
    }
}
