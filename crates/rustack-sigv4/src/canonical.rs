//! Canonical request construction for AWS Signature Version 4.
//!
//! This module turns a [`SignableRequest`] into the canonical request format:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HexEncode(SHA256(RequestPayload))
//! ```
//!
//! Every byte matters: the server re-derives the same string, so any deviation
//! in encoding, ordering or whitespace handling makes the signature fail.

use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};
use sha2::{Digest, Sha256};

use crate::request::{QueryParams, SignableRequest, SignedHeaderSet};

/// Characters percent-encoded in path segments, query keys and query values.
///
/// Everything except the RFC 3986 unreserved set (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The header sourced from the request authority.
const HOST_HEADER: &str = "host";

/// Never part of the canonical form; it carries the signature itself.
const AUTHORIZATION_HEADER: &str = "authorization";

/// Build the full canonical request for a request.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::canonical::canonical_request;
/// use rustack_sigv4::request::{SignableRequest, SignedHeaderSet};
///
/// let request = SignableRequest::new("GET", "host.foo.com", "/%20/foo")
///     .with_header("date", "Mon, 09 Sep 2011 23:36:00 GMT");
/// let canonical = canonical_request(&request, &SignedHeaderSet::all());
/// assert!(canonical.starts_with("GET\n/%20/foo\n\n"));
/// assert!(canonical.contains("\n\ndate;host\n"));
/// ```
#[must_use]
pub fn canonical_request(request: &SignableRequest, signed_headers: &SignedHeaderSet) -> String {
    let canonical_uri = canonical_uri(&request.path);
    let canonical_query = canonical_query_string(&request.query);
    let canonical_headers = canonical_headers(request, signed_headers);
    let signed_headers_str = signed_headers_string(request, signed_headers);
    let payload_hash = hash_payload(&request_payload(request));

    format!(
        "{}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers_str}\n{payload_hash}",
        request.method
    )
}

/// Build the canonical URI.
///
/// The path is decoded, split on `/`, and normalized: empty and `.` segments
/// are dropped, each `..` removes the previous segment (never above the root).
/// The remaining segments are re-encoded, so an already-encoded path is not
/// double-encoded.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::canonical::canonical_uri;
///
/// assert_eq!(canonical_uri(""), "/");
/// assert_eq!(canonical_uri("/%20/foo"), "/%20/foo");
/// assert_eq!(canonical_uri("/a/../b"), "/b");
/// ```
#[must_use]
pub fn canonical_uri(path: &str) -> String {
    let decoded: Vec<u8> = percent_decode_str(path).collect();

    let mut segments: Vec<String> = Vec::new();
    for segment in decoded.split(|byte| *byte == b'/') {
        match segment {
            b"" | b"." => {}
            b".." => {
                segments.pop();
            }
            _ => segments.push(uri_encode(segment)),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Build the canonical query string.
///
/// Keys and values are encoded independently. Each key/value pair becomes one
/// entry (`key` alone when the value is empty), and entries are sorted by the
/// encoded entry string, not by key alone.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::canonical::canonical_query_string;
/// use rustack_sigv4::request::QueryParams;
///
/// let query = QueryParams::parse("b=2&a=hello+world&flag=");
/// assert_eq!(canonical_query_string(&query), "a=hello%20world&b=2&flag");
/// ```
#[must_use]
pub fn canonical_query_string(query: &QueryParams) -> String {
    let mut entries: Vec<String> = query
        .iter()
        .flat_map(|(key, values)| {
            let key = uri_encode(key);
            values.iter().map(move |value| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{key}={}", uri_encode(value))
                }
            })
        })
        .collect();

    entries.sort_unstable();
    entries.join("&")
}

/// Build the canonical headers block, terminated by a newline.
///
/// Header names are lower-cased. Each value is trimmed and has runs of spaces
/// outside double quotes collapsed; multiple values are sorted and joined with
/// commas. A `host` line from the request authority is added unless the request
/// carries its own selected `host` header. Lines are sorted.
#[must_use]
pub fn canonical_headers(request: &SignableRequest, signed_headers: &SignedHeaderSet) -> String {
    let mut lines: Vec<String> = selected_headers(request, signed_headers)
        .into_iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect();
    lines.sort_unstable();

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

/// Build the signed headers list: sorted, lower-cased, semicolon-separated.
///
/// Uses exactly the names that appear in [`canonical_headers`], `host` included.
#[must_use]
pub fn signed_headers_string(
    request: &SignableRequest,
    signed_headers: &SignedHeaderSet,
) -> String {
    let mut names: Vec<String> = selected_headers(request, signed_headers)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    names.sort_unstable();
    names.join(";")
}

/// The bytes to hash as the request payload.
///
/// An absent body is zero-length. The request keeps its body.
#[must_use]
pub fn request_payload(request: &SignableRequest) -> Bytes {
    request.payload()
}

/// Compute the SHA-256 hash of a payload and return it as lowercase hex.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::canonical::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Collect `(lowercase_name, joined_value)` for every header in the canonical form.
fn selected_headers(
    request: &SignableRequest,
    signed_headers: &SignedHeaderSet,
) -> Vec<(String, String)> {
    let mut selected: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|(name, _, _)| *name != AUTHORIZATION_HEADER && signed_headers.selects(name))
        .map(|(name, _, values)| {
            let mut normalized: Vec<String> =
                values.iter().map(|value| normalize_value(value)).collect();
            normalized.sort_unstable();
            (name.to_owned(), normalized.join(","))
        })
        .collect();

    if !selected.iter().any(|(name, _)| name == HOST_HEADER) {
        selected.push((HOST_HEADER.to_owned(), request.host.clone()));
    }

    selected
}

/// Percent-encode a path segment, query key or query value.
///
/// A space encodes as `%20`, never `+`. Bytes outside UTF-8 are escaped as-is.
fn uri_encode(input: &[u8]) -> String {
    percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Trim a header value and collapse runs of spaces that sit outside double quotes.
fn normalize_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut in_quote = false;
    let mut last = None;
    for ch in value.trim().chars() {
        if ch == '"' {
            in_quote = !in_quote;
        }
        if ch == ' ' && last == Some(' ') && !in_quote {
            continue;
        }
        result.push(ch);
        last = Some(ch);
    }
    result
}
