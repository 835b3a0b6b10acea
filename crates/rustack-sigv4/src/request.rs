//! Transport-independent model of the request being signed.
//!
//! [`SignableRequest`] carries exactly what the canonical form needs: method,
//! authority, path, query, headers and an already-materialized body. Buffering
//! a live body stream is the job of the [`adapter`](crate::adapter) module, so
//! nothing here performs I/O.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use percent_encoding::percent_decode_str;

/// A single header entry: the name as first seen plus every value in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

/// Case-insensitive header multimap.
///
/// Entries are keyed by the lower-cased header name and kept in sorted order.
/// Each entry preserves the original-case name and the list of values.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::request::HeaderMultimap;
///
/// let mut headers = HeaderMultimap::new();
/// headers.append("X-Custom", "a");
/// headers.append("x-custom", "b");
/// assert_eq!(headers.get_all("X-CUSTOM"), ["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMultimap {
    entries: BTreeMap<String, HeaderEntry>,
}

impl HeaderMultimap {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, keeping any values already present under the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| HeaderEntry {
                name,
                values: Vec::new(),
            })
            .values
            .push(value.into());
    }

    /// Set a header, replacing every existing value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.insert(
            name.to_ascii_lowercase(),
            HeaderEntry {
                name,
                values: vec![value.into()],
            },
        );
    }

    /// Remove a header and return its values, if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries
            .remove(&name.to_ascii_lowercase())
            .map(|entry| entry.values)
    }

    /// The first value of a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Every value of a header, in arrival order. Empty when absent.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|entry| entry.values.as_slice())
            .unwrap_or(&[])
    }

    /// Whether a header with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate over `(lowercase_name, original_name, values)` in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &[String])> {
        self.entries
            .iter()
            .map(|(lower, entry)| (lower.as_str(), entry.name.as_str(), entry.values.as_slice()))
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderMultimap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Decoded query parameters: key to every value supplied for it.
///
/// Keys and values are kept as the raw decoded bytes, so escapes that do not
/// form valid UTF-8 (such as `%FF`) survive canonicalization unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
}

impl QueryParams {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw `application/x-www-form-urlencoded` query string.
    ///
    /// `+` decodes to a space and percent escapes are decoded to bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustack_sigv4::request::QueryParams;
    ///
    /// let query = QueryParams::parse("b=2&a=hello+world&a=");
    /// assert_eq!(query.get_all("a"), ["hello world", ""]);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_form_component(key), decode_form_component(value))
            })
            .collect()
    }

    /// Add a value for a key.
    pub fn append(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Every value of a key, decoded lossily as UTF-8. Empty when absent.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<Cow<'_, str>> {
        self.get_all_raw(key.as_bytes())
            .iter()
            .map(|value| String::from_utf8_lossy(value))
            .collect()
    }

    /// Every value of a key as raw bytes. Empty when absent.
    #[must_use]
    pub fn get_all_raw(&self, key: &[u8]) -> &[Vec<u8>] {
        self.params.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over `(key, values)` as raw bytes.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[Vec<u8>])> {
        self.params.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Decode one `application/x-www-form-urlencoded` key or value to bytes.
fn decode_form_component(component: &str) -> Vec<u8> {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).collect()
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<Vec<u8>>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.append(key, value);
        }
        query
    }
}

/// The set of lower-cased header names bound by a signature.
///
/// The empty set is a sentinel: sign every header on the request plus `host`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedHeaderSet {
    names: BTreeSet<String>,
}

impl SignedHeaderSet {
    /// The sentinel set selecting every header present on the request.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether this is the "sign everything" sentinel.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether the set names this header. Case-insensitive.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }

    /// Whether a header with this name takes part in the canonical form.
    #[must_use]
    pub fn selects(&self, name: &str) -> bool {
        self.is_all() || self.contains(name)
    }

    /// Iterate over the names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of names in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set is empty (equivalent to [`is_all`](Self::is_all)).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SignedHeaderSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|name| name.as_ref().trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

/// An HTTP request reduced to the parts that are signed.
///
/// `host` is the request authority; it feeds the `host:` canonical header when
/// the header map does not supply one. `body` is empty when the request has none.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::request::SignableRequest;
///
/// let request = SignableRequest::new("POST", "host.foo.com", "/")
///     .with_header("content-type", "application/x-www-form-urlencoded")
///     .with_body("foo=bar");
/// assert_eq!(request.payload().as_ref(), b"foo=bar");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignableRequest {
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// Request authority (`host[:port]`).
    pub host: String,
    /// URL path, raw or decoded.
    pub path: String,
    /// Decoded query parameters.
    pub query: QueryParams,
    /// Request headers.
    pub headers: HeaderMultimap,
    /// Materialized request body.
    pub body: Bytes,
}

impl SignableRequest {
    /// Create a request with no query, headers or body.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            host: host.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query_param(
        mut self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.query.append(key, value);
        self
    }

    /// Replace the query with a parsed raw query string.
    #[must_use]
    pub fn with_raw_query(mut self, raw: &str) -> Self {
        self.query = QueryParams::parse(raw);
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The payload to hash.
    ///
    /// `Bytes` is reference counted, so the returned handle shares the buffer and
    /// the request body stays readable for the transport.
    #[must_use]
    pub fn payload(&self) -> Bytes {
        self.body.clone()
    }
}
