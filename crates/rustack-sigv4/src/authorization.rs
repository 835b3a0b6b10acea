//! Parsing of SigV4 `Authorization` header values.
//!
//! The header has a fixed four-token structure:
//!
//! ```text
//! AWS4-HMAC-SHA256 Credential=AKID/20110909/us-east-1/host/aws4_request,
//!   SignedHeaders=content-type;date;host,
//!   Signature=<hex-signature>
//! ```
//!
//! Tokens may be separated by spaces, commas, or commas followed by spaces.
//! Parsing only checks structure. Recomputing and comparing the signature is a
//! separate step, see [`verify`](crate::verify).

use tracing::debug;

use crate::error::{ParseStage, SigningError, SigningResult};
use crate::request::{SignableRequest, SignedHeaderSet};
use crate::sigv4::{ALGORITHM, SCOPE_TERMINATOR};

const CREDENTIAL_PREFIX: &str = "Credential=";
const SIGNED_HEADERS_PREFIX: &str = "SignedHeaders=";
const SIGNATURE_PREFIX: &str = "Signature";

/// The structured content of a parsed `Authorization` header.
///
/// Only [`parse_authorization`] builds this type, and it is never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuthorization {
    access_key_id: String,
    region: String,
    service: String,
    signed_headers: Vec<String>,
    signature: String,
    raw_header_value: String,
}

impl ParsedAuthorization {
    /// The access key ID from the credential scope.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The region from the credential scope.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The service from the credential scope.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The signed header names exactly as they appear in the header.
    #[must_use]
    pub fn signed_headers(&self) -> &[String] {
        &self.signed_headers
    }

    /// The signed header names lower-cased, ready to re-run canonicalization.
    #[must_use]
    pub fn signed_header_set(&self) -> SignedHeaderSet {
        self.signed_headers.iter().collect()
    }

    /// The provided signature, not validated.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The full header value that was parsed.
    #[must_use]
    pub fn raw_header_value(&self) -> &str {
        &self.raw_header_value
    }
}

/// Parse an `Authorization` header value.
///
/// # Errors
///
/// Returns [`SigningError::MalformedHeader`] naming the failed stage if the
/// value does not start with the algorithm tag, does not split into four
/// tokens, or has a malformed `Credential=`, `SignedHeaders=` or `Signature`
/// token.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::authorization::parse_authorization;
///
/// let parsed = parse_authorization(
///     "AWS4-HMAC-SHA256 Credential=devops/20180312/hz/dnsapi/aws4_request,\
///      SignedHeaders=Content-Length;Content-type;host;x-amz-date,\
///      Signature=8a31f6aaa5026579bb2cf20962768190fdd0b4846ed5c48842fa61936245e9c5",
/// )
/// .unwrap();
/// assert_eq!(parsed.access_key_id(), "devops");
/// assert_eq!(parsed.region(), "hz");
/// assert_eq!(parsed.service(), "dnsapi");
/// assert_eq!(parsed.signed_headers()[1], "Content-type");
/// ```
pub fn parse_authorization(header: &str) -> SigningResult<ParsedAuthorization> {
    if header.len() < ALGORITHM.len() || !header.starts_with(ALGORITHM) {
        return Err(SigningError::malformed(
            ParseStage::Algorithm,
            format!("expected {ALGORITHM} prefix"),
        ));
    }

    let tokens: Vec<&str> = header
        .split(' ')
        .flat_map(|part| part.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();

    // The first token is only checked through the prefix above.
    let [_algorithm, credential, signed_headers, signature] = tokens.as_slice() else {
        return Err(SigningError::malformed(
            ParseStage::TokenCount,
            format!("expected 4 tokens, found {}", tokens.len()),
        ));
    };

    let (access_key_id, region, service) = parse_credential(credential)?;

    let signed_headers: Vec<String> = signed_headers
        .strip_prefix(SIGNED_HEADERS_PREFIX)
        .ok_or_else(|| {
            SigningError::malformed(
                ParseStage::SignedHeaders,
                format!("expected {SIGNED_HEADERS_PREFIX} prefix"),
            )
        })?
        .split(';')
        .map(ToOwned::to_owned)
        .collect();

    let signature = signature.strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
        SigningError::malformed(
            ParseStage::Signature,
            format!("expected {SIGNATURE_PREFIX} prefix"),
        )
    })?;
    let signature = signature.strip_prefix('=').unwrap_or(signature);

    Ok(ParsedAuthorization {
        access_key_id,
        region,
        service,
        signed_headers,
        signature: signature.to_owned(),
        raw_header_value: header.to_owned(),
    })
}

/// Parse the `Authorization` header carried by a request.
///
/// # Errors
///
/// A missing header is a [`SigningError::MalformedHeader`] at the algorithm
/// stage; otherwise see [`parse_authorization`].
pub fn parse_request_authorization(
    request: &SignableRequest,
) -> SigningResult<ParsedAuthorization> {
    let header = request.headers.get("authorization").unwrap_or_default();
    parse_authorization(header).inspect_err(|err| {
        debug!(error = %err, "Rejected Authorization header");
    })
}

/// Split `Credential=AKID/date/region/service/aws4_request`.
///
/// The date part is discarded; the signing time comes from the request headers.
fn parse_credential(token: &str) -> SigningResult<(String, String, String)> {
    let scope = token.strip_prefix(CREDENTIAL_PREFIX).ok_or_else(|| {
        SigningError::malformed(
            ParseStage::Credential,
            format!("expected {CREDENTIAL_PREFIX} prefix"),
        )
    })?;

    let parts: Vec<&str> = scope.split('/').collect();
    let [access_key_id, _date, region, service, terminator] = parts.as_slice() else {
        return Err(SigningError::malformed(
            ParseStage::Credential,
            format!("expected 5 credential segments, found {}", parts.len()),
        ));
    };

    if *terminator != SCOPE_TERMINATOR {
        return Err(SigningError::malformed(
            ParseStage::Credential,
            format!("expected {SCOPE_TERMINATOR} terminator, found {terminator:?}"),
        ));
    }

    Ok((
        (*access_key_id).to_owned(),
        (*region).to_owned(),
        (*service).to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigv4::format_credential_value;

    const VALID: &str = "AWS4-HMAC-SHA256 \
        Credential=AKIDEXAMPLE/20110909/us-east-1/host/aws4_request, \
        SignedHeaders=content-type;date;host, \
        Signature=b105eb10c6d318d2294de9d49dd8b031b55e3c3fe139f2e637da70511e9e7b71";

    fn assert_malformed(header: &str, expected: ParseStage) {
        match parse_authorization(header) {
            Err(SigningError::MalformedHeader { stage, .. }) => assert_eq!(stage, expected),
            other => panic!("expected MalformedHeader at {expected}, got {other:?}"),
        }
    }

    #[test]
    fn test_should_parse_authorization_header() {
        let parsed = parse_authorization(VALID).unwrap();
        assert_eq!(parsed.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(parsed.region(), "us-east-1");
        assert_eq!(parsed.service(), "host");
        assert_eq!(parsed.signed_headers(), ["content-type", "date", "host"]);
        assert_eq!(
            parsed.signature(),
            "b105eb10c6d318d2294de9d49dd8b031b55e3c3fe139f2e637da70511e9e7b71"
        );
        assert_eq!(parsed.raw_header_value(), VALID);
    }

    #[test]
    fn test_should_accept_space_separated_tokens() {
        let header = "AWS4-HMAC-SHA256 Credential=AKID/20110909/r/s/aws4_request \
                      SignedHeaders=host Signature=abc";
        let parsed = parse_authorization(header).unwrap();
        assert_eq!(parsed.access_key_id(), "AKID");
        assert_eq!(parsed.signature(), "abc");
    }

    #[test]
    fn test_should_keep_signed_header_case_verbatim() {
        let header = "AWS4-HMAC-SHA256 Credential=devops/20180312/hz/dnsapi/aws4_request,\
                      SignedHeaders=Content-Length;Content-type;host;x-amz-date,\
                      Signature=8a31f6aaa5026579bb2cf20962768190fdd0b4846ed5c48842fa61936245e9c5";
        let parsed = parse_authorization(header).unwrap();
        assert_eq!(
            parsed.signed_headers(),
            ["Content-Length", "Content-type", "host", "x-amz-date"]
        );
        let set = parsed.signed_header_set();
        assert!(set.contains("content-length"));
        assert!(set.contains("content-type"));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_should_round_trip_formatted_value() {
        let value = format_credential_value(
            "deadbeef",
            "AKIDEXAMPLE",
            "20110909/eu-west-1/execute-api/aws4_request",
            "date;host;x-amz-date",
        );
        let parsed = parse_authorization(&value).unwrap();
        assert_eq!(parsed.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(parsed.region(), "eu-west-1");
        assert_eq!(parsed.service(), "execute-api");
        let expected: SignedHeaderSet = ["x-amz-date", "host", "date"].into_iter().collect();
        assert_eq!(parsed.signed_header_set(), expected);
        assert_eq!(parsed.signature(), "deadbeef");
    }

    #[test]
    fn test_should_reject_short_value() {
        assert_malformed("AWS4", ParseStage::Algorithm);
        assert_malformed("", ParseStage::Algorithm);
    }

    #[test]
    fn test_should_reject_wrong_algorithm_prefix() {
        assert_malformed(
            "AWS4-HMAC-SHA512 Credential=AKID/20110909/r/s/aws4_request, \
             SignedHeaders=host, Signature=abc",
            ParseStage::Algorithm,
        );
    }

    #[test]
    fn test_should_accept_first_token_extending_algorithm_prefix() {
        let parsed = parse_authorization(
            "AWS4-HMAC-SHA256X Credential=AKID/20110909/r/s/aws4_request, \
             SignedHeaders=host, Signature=abc",
        )
        .unwrap();
        assert_eq!(parsed.access_key_id(), "AKID");
        assert_eq!(parsed.signature(), "abc");
    }

    #[test]
    fn test_should_reject_three_tokens() {
        assert_malformed(
            "AWS4-HMAC-SHA256 Credential=AKID/20110909/r/s/aws4_request, SignedHeaders=host",
            ParseStage::TokenCount,
        );
    }

    #[test]
    fn test_should_reject_five_tokens() {
        assert_malformed(&format!("{VALID}, Extra=1"), ParseStage::TokenCount);
    }

    #[test]
    fn test_should_reject_wrong_terminator() {
        assert_malformed(
            "AWS4-HMAC-SHA256 Credential=AKID/20110909/r/s/aws5_request, \
             SignedHeaders=host, Signature=abc",
            ParseStage::Credential,
        );
    }

    #[test]
    fn test_should_reject_wrong_credential_segment_count() {
        assert_malformed(
            "AWS4-HMAC-SHA256 Credential=AKID/20110909/r/aws4_request, \
             SignedHeaders=host, Signature=abc",
            ParseStage::Credential,
        );
    }

    #[test]
    fn test_should_reject_missing_credential_prefix() {
        assert_malformed(
            "AWS4-HMAC-SHA256 Cred=AKID/20110909/r/s/aws4_request, \
             SignedHeaders=host, Signature=abc",
            ParseStage::Credential,
        );
    }

    #[test]
    fn test_should_reject_missing_signed_headers_prefix() {
        assert_malformed(
            "AWS4-HMAC-SHA256 Credential=AKID/20110909/r/s/aws4_request, \
             Headers=host, Signature=abc",
            ParseStage::SignedHeaders,
        );
    }

    #[test]
    fn test_should_reject_missing_signature_prefix() {
        assert_malformed(
            "AWS4-HMAC-SHA256 Credential=AKID/20110909/r/s/aws4_request, \
             SignedHeaders=host, Sig=abc",
            ParseStage::Signature,
        );
    }

    #[test]
    fn test_should_reject_request_without_authorization() {
        let request = SignableRequest::new("GET", "host.foo.com", "/");
        let result = parse_request_authorization(&request);
        assert!(matches!(
            result,
            Err(SigningError::MalformedHeader {
                stage: ParseStage::Algorithm,
                ..
            })
        ));
    }

    #[test]
    fn test_should_parse_authorization_from_request() {
        let request =
            SignableRequest::new("GET", "host.foo.com", "/").with_header("Authorization", VALID);
        let parsed = parse_request_authorization(&request).unwrap();
        assert_eq!(parsed.raw_header_value(), VALID);
    }
}
