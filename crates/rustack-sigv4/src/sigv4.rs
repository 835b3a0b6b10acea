//! AWS Signature Version 4 primitives.
//!
//! This module holds the fixed protocol constants and the pure steps that follow
//! canonicalization:
//!
//! 1. Build the credential scope from the timestamp, region and service.
//! 2. Build the string to sign from the scope and the canonical request hash.
//! 3. Derive the signing key with an HMAC-SHA256 cascade from the secret key.
//! 4. Compute the hex signature and format the `Authorization` header value.

use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

use crate::error::{SigningError, SigningResult};

/// The only algorithm supported by this implementation.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Prefix prepended to the secret key to seed the key derivation.
pub const KEY_PREFIX: &str = "AWS4";

/// The fixed last component of every credential scope.
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// The algorithm-specific date header.
pub const X_AMZ_DATE: &str = "x-amz-date";

/// The standard HTTP date header.
pub const DATE: &str = "date";

/// ISO 8601 basic format used by `x-amz-date` and the string to sign.
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Date format of the credential scope.
pub const SHORT_DATE_FORMAT: &str = "%Y%m%d";

/// RFC 1123 `Date` layout after the weekday token.
const HTTP_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S GMT";

type HmacSha256 = Hmac<Sha256>;

/// Format a timestamp as `YYYYMMDDTHHMMSSZ`.
#[must_use]
pub fn format_amz_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(AMZ_DATE_FORMAT).to_string()
}

/// Parse an `x-amz-date` value (`YYYYMMDDTHHMMSSZ`).
///
/// # Errors
///
/// Returns [`SigningError::InvalidTimestamp`] if the value is not in basic ISO 8601 form.
pub fn parse_amz_date(value: &str) -> SigningResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, AMZ_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| SigningError::InvalidTimestamp(format!("{X_AMZ_DATE} {value:?}: {e}")))
}

/// Parse an RFC 1123 HTTP `Date` value such as `Mon, 09 Sep 2011 23:36:00 GMT`.
///
/// The weekday token is not checked against the date.
///
/// # Errors
///
/// Returns [`SigningError::InvalidTimestamp`] if the value does not parse.
pub fn parse_http_date(value: &str) -> SigningResult<DateTime<Utc>> {
    let rest = value
        .split_once(',')
        .map_or(value, |(_weekday, rest)| rest)
        .trim();
    NaiveDateTime::parse_from_str(rest, HTTP_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| SigningError::InvalidTimestamp(format!("{DATE} {value:?}: {e}")))
}

/// Build the credential scope `YYYYMMDD/region/service/aws4_request`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rustack_sigv4::sigv4::credential_scope;
///
/// let t = Utc.with_ymd_and_hms(2011, 9, 9, 23, 36, 0).unwrap();
/// assert_eq!(
///     credential_scope(&t, "us-east-1", "host"),
///     "20110909/us-east-1/host/aws4_request"
/// );
/// ```
#[must_use]
pub fn credential_scope(timestamp: &DateTime<Utc>, region: &str, service: &str) -> String {
    format!(
        "{}/{region}/{service}/{SCOPE_TERMINATOR}",
        timestamp.format(SHORT_DATE_FORMAT)
    )
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <YYYYMMDDTHHMMSSZ>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
#[must_use]
pub fn string_to_sign(
    canonical_request: &str,
    credential_scope: &str,
    timestamp: &DateTime<Utc>,
) -> String {
    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    format!(
        "{ALGORITHM}\n{}\n{credential_scope}\n{canonical_hash}",
        format_amz_date(timestamp)
    )
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// # Errors
///
/// Returns [`SigningError::HashFailure`] if the MAC primitive rejects a key.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rustack_sigv4::sigv4::derive_signing_key;
///
/// let t = Utc.with_ymd_and_hms(2011, 9, 9, 23, 36, 0).unwrap();
/// let secret = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";
/// let key = derive_signing_key(secret, "us-east-1", "host", &t).unwrap();
/// assert_eq!(
///     hex::encode(key),
///     "e220a8ee99f059729066fd06efe5c0f949d6aa8973360d189dd0e0eddd7a9596"
/// );
/// ```
pub fn derive_signing_key(
    secret_key: &str,
    region: &str,
    service: &str,
    timestamp: &DateTime<Utc>,
) -> SigningResult<Vec<u8>> {
    let date = timestamp.format(SHORT_DATE_FORMAT).to_string();
    let seed = format!("{KEY_PREFIX}{secret_key}");

    let date_key = hmac_sha256(seed.as_bytes(), date.as_bytes())?;
    let date_region_key = hmac_sha256(&date_key, region.as_bytes())?;
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes())?;
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the HMAC-SHA256 of `string_to_sign` under `signing_key`, lowercase hex.
///
/// # Errors
///
/// Returns [`SigningError::HashFailure`] if the MAC primitive rejects the key.
pub fn compute_signature(string_to_sign: &str, signing_key: &[u8]) -> SigningResult<String> {
    hmac_sha256(signing_key, string_to_sign.as_bytes()).map(hex::encode)
}

/// Format the `Authorization` header value.
///
/// # Examples
///
/// ```
/// use rustack_sigv4::sigv4::format_credential_value;
///
/// let value = format_credential_value(
///     "abc123",
///     "AKIDEXAMPLE",
///     "20110909/us-east-1/host/aws4_request",
///     "date;host",
/// );
/// assert_eq!(
///     value,
///     "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20110909/us-east-1/host/aws4_request, \
///      SignedHeaders=date;host, Signature=abc123"
/// );
/// ```
#[must_use]
pub fn format_credential_value(
    signature: &str,
    access_key_id: &str,
    credential_scope: &str,
    signed_headers: &str,
) -> String {
    format!(
        "{ALGORITHM} Credential={access_key_id}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}"
    )
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> SigningResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| SigningError::HashFailure(format!("HMAC-SHA256 key rejected: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const TEST_SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";
    const TEST_REGION: &str = "us-east-1";
    const TEST_SERVICE: &str = "host";

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 9, 9, 23, 36, 0).unwrap()
    }

    #[test]
    fn test_should_derive_signing_key_matching_test_vector() {
        let key = derive_signing_key(TEST_SECRET_KEY, TEST_REGION, TEST_SERVICE, &test_time())
            .unwrap();
        assert_eq!(
            hex::encode(&key),
            "e220a8ee99f059729066fd06efe5c0f949d6aa8973360d189dd0e0eddd7a9596"
        );
    }

    #[test]
    fn test_should_derive_signing_key_matching_s3_example() {
        // The AWS GET Object example signs with this key.
        let t = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
            "us-east-1",
            "s3",
            &t,
        )
        .unwrap();
        let string_to_sign = "AWS4-HMAC-SHA256\n\
                              20130524T000000Z\n\
                              20130524/us-east-1/s3/aws4_request\n\
                              7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972";
        assert_eq!(
            compute_signature(string_to_sign, &key).unwrap(),
            "f0e8bdb87c964420e857bd35b5d6ed310bd44f0170aba48dd91039c6036bdb41"
        );
    }

    #[test]
    fn test_should_build_credential_scope() {
        assert_eq!(
            credential_scope(&test_time(), TEST_REGION, TEST_SERVICE),
            "20110909/us-east-1/host/aws4_request"
        );
    }

    #[test]
    fn test_should_use_utc_date_in_scope() {
        // 2011-09-10 01:00 at +05:00 is still 2011-09-09 in UTC.
        let t = DateTime::parse_from_rfc3339("2011-09-10T01:00:00+05:00")
            .unwrap()
            .with_timezone(&Utc);
        assert!(credential_scope(&t, "r", "s").starts_with("20110909/"));
    }

    #[test]
    fn test_should_build_string_to_sign_for_get_vector() {
        let canonical = "GET\n/%20/foo\n\ndate:Mon, 09 Sep 2011 23:36:00 GMT\nhost:host.foo.com\n\n\
                         date;host\n\
                         e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        let scope = credential_scope(&test_time(), TEST_REGION, TEST_SERVICE);
        let sts = string_to_sign(canonical, &scope, &test_time());
        let expected = "AWS4-HMAC-SHA256\n\
                        20110909T233600Z\n\
                        20110909/us-east-1/host/aws4_request\n\
                        69c45fb9fe3fd76442b5086e50b2e9fec8298358da957b293ef26e506fdfb54b";
        assert_eq!(sts, expected);
    }

    #[test]
    fn test_should_compute_signature_for_get_vector() {
        let key = derive_signing_key(TEST_SECRET_KEY, TEST_REGION, TEST_SERVICE, &test_time())
            .unwrap();
        let sts = "AWS4-HMAC-SHA256\n\
                   20110909T233600Z\n\
                   20110909/us-east-1/host/aws4_request\n\
                   69c45fb9fe3fd76442b5086e50b2e9fec8298358da957b293ef26e506fdfb54b";
        assert_eq!(
            compute_signature(sts, &key).unwrap(),
            "f309cfbd10197a230c42dd17dbf5cca8a0722564cb40a872d25623cfa758e374"
        );
    }

    #[test]
    fn test_should_round_trip_amz_date() {
        let parsed = parse_amz_date("20110909T233600Z").unwrap();
        assert_eq!(parsed, test_time());
        assert_eq!(format_amz_date(&parsed), "20110909T233600Z");
    }

    #[test]
    fn test_should_parse_http_date() {
        assert_eq!(
            parse_http_date("Mon, 09 Sep 2011 23:36:00 GMT").unwrap(),
            test_time()
        );
    }

    #[test]
    fn test_should_ignore_weekday_in_http_date() {
        // 2011-09-09 was a Friday.
        assert_eq!(
            parse_http_date("Fri, 09 Sep 2011 23:36:00 GMT").unwrap(),
            parse_http_date("Mon, 09 Sep 2011 23:36:00 GMT").unwrap()
        );
        assert_eq!(parse_http_date("09 Sep 2011 23:36:00 GMT").unwrap(), test_time());
    }

    #[test]
    fn test_should_reject_http_date_outside_gmt() {
        assert!(matches!(
            parse_http_date("Fri, 09 Sep 2011 23:36:00 +0200"),
            Err(SigningError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_should_reject_bad_dates() {
        assert!(matches!(
            parse_amz_date("2011-09-09T23:36:00Z"),
            Err(SigningError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_http_date("yesterday"),
            Err(SigningError::InvalidTimestamp(_))
        ));
    }
}
