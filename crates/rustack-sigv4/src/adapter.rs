//! Boundary between the `http` crate types and [`SignableRequest`].
//!
//! The signing core never reads a body stream. This module buffers the body,
//! hands the bytes to the core, and gives the caller back a request whose body
//! holds the same bytes and can be read again by the transport.

use bytes::Bytes;
use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use http_body_util::{BodyExt, Full};
use tracing::debug;

use crate::authorization::{ParsedAuthorization, parse_authorization};
use crate::clock::Clock;
use crate::credentials::CredentialProvider;
use crate::error::{ParseStage, SigningError, SigningResult};
use crate::request::{HeaderMultimap, QueryParams, SignableRequest, SignedHeaderSet};
use crate::sigv4::{DATE, X_AMZ_DATE};
use crate::signer::Signer;
use crate::verify::verify_request;

/// Headers the signer may add, replace or remove.
const SIGNER_MANAGED_HEADERS: [&str; 3] = ["authorization", X_AMZ_DATE, DATE];

impl SignableRequest {
    /// Build a signable view of an `http` request head and its buffered body.
    ///
    /// The authority comes from the URI, falling back to the `Host` header.
    /// Header values that are not valid UTF-8 are decoded lossily.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts, body: Bytes) -> Self {
        let host = parts
            .uri
            .authority()
            .map(|authority| {
                let authority = authority.as_str();
                authority.rsplit('@').next().unwrap_or(authority).to_owned()
            })
            .or_else(|| {
                parts
                    .headers
                    .get(http::header::HOST)
                    .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .unwrap_or_default();

        let headers: HeaderMultimap = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Self {
            method: parts.method.as_str().to_owned(),
            host,
            path: parts.uri.path().to_owned(),
            query: QueryParams::parse(parts.uri.query().unwrap_or_default()),
            headers,
            body,
        }
    }
}

/// Sign an `http` request head in place.
///
/// Only `Authorization`, `x-amz-date` and `Date` are written back. If signing
/// fails the head is left untouched.
///
/// # Errors
///
/// See [`sign_request`](crate::sign_request); additionally
/// [`SigningError::InvalidHeaderValue`] if a computed value is not a valid header value.
pub fn sign_parts<C: Clock>(
    signer: &Signer<C>,
    parts: &mut http::request::Parts,
    body: &Bytes,
    signed_headers: &SignedHeaderSet,
) -> SigningResult<()> {
    let mut request = SignableRequest::from_parts(parts, body.clone());
    signer.sign(&mut request, signed_headers)?;

    let mut updates: Vec<(HeaderName, Vec<HeaderValue>)> = Vec::new();
    for name in SIGNER_MANAGED_HEADERS {
        let values = request
            .headers
            .get_all(name)
            .iter()
            .map(|value| {
                HeaderValue::from_str(value)
                    .map_err(|_| SigningError::InvalidHeaderValue(name.to_owned()))
            })
            .collect::<SigningResult<Vec<_>>>()?;
        updates.push((HeaderName::from_static(name), values));
    }

    for (name, values) in updates {
        parts.headers.remove(&name);
        for value in values {
            parts.headers.append(name.clone(), value);
        }
    }
    Ok(())
}

/// Buffer the body of an `http` request, sign it, and return it with a
/// re-readable body holding the same bytes.
///
/// A body that fails mid-stream cannot be rewound, so on
/// [`SigningError::BodyReadFailure`] the request is consumed.
///
/// # Errors
///
/// - [`SigningError::BodyReadFailure`] if the body stream yields an error.
/// - Otherwise see [`sign_parts`].
pub async fn sign_http_request<B, C>(
    signer: &Signer<C>,
    request: http::Request<B>,
    signed_headers: &SignedHeaderSet,
) -> SigningResult<http::Request<Full<Bytes>>>
where
    B: http_body::Body,
    B::Error: std::fmt::Display,
    C: Clock,
{
    let (mut parts, body) = request.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| SigningError::BodyReadFailure(e.to_string()))?
        .to_bytes();
    debug!(len = body.len(), "Buffered request body for signing");

    sign_parts(signer, &mut parts, &body, signed_headers)?;
    Ok(http::Request::from_parts(parts, Full::new(body)))
}

/// Parse the `Authorization` header of an incoming request.
///
/// # Errors
///
/// Returns [`SigningError::MalformedHeader`] if the header is missing, not
/// visible ASCII, or structurally invalid.
pub fn authorization_from_headers(headers: &HeaderMap) -> SigningResult<ParsedAuthorization> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| {
            SigningError::malformed(ParseStage::Algorithm, "missing Authorization header")
        })?
        .to_str()
        .map_err(|_| {
            SigningError::malformed(ParseStage::Algorithm, "Authorization header is not ASCII")
        })?;
    parse_authorization(value)
}

/// Verify an incoming `http` request whose body has already been buffered.
///
/// # Errors
///
/// See [`verify_request`].
pub fn verify_parts(
    credential_provider: &dyn CredentialProvider,
    parts: &http::request::Parts,
    body: Bytes,
) -> SigningResult<ParsedAuthorization> {
    verify_request(credential_provider, &SignableRequest::from_parts(parts, body))
}
