//! AWS Signature Version 4 request signing for Rustack clients.
//!
//! This crate signs outgoing HTTP requests with the `AWS4-HMAC-SHA256`
//! scheme and parses (and optionally verifies) the `Authorization` header of
//! signed requests.
//!
//! # Overview
//!
//! Signing a request runs these steps:
//!
//! 1. Resolve the request timestamp from `x-amz-date`, then `Date`, then the clock.
//! 2. Build the canonical request (method, URI, query, headers, payload hash).
//! 3. Build the string to sign from the timestamp, credential scope and the
//!    hash of the canonical request.
//! 4. Derive the signing key from the secret key, date, region and service.
//! 5. Attach `Authorization: AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...`.
//!
//! # Usage
//!
//! ```rust
//! use rustack_sigv4::request::{SignableRequest, SignedHeaderSet};
//! use rustack_sigv4::{Credential, parse_authorization, sign_request};
//! use rustack_sigv4::clock::SystemClock;
//!
//! let credential = Credential::new("AKIDEXAMPLE", "secret", "us-east-1", "execute-api");
//! let mut request = SignableRequest::new("POST", "api.example.com", "/orders")
//!     .with_header("content-type", "application/json")
//!     .with_body(r#"{"id":1}"#);
//!
//! sign_request(&credential, &mut request, &SignedHeaderSet::all(), &SystemClock).unwrap();
//!
//! let parsed = parse_authorization(request.headers.get("authorization").unwrap()).unwrap();
//! assert_eq!(parsed.access_key_id(), "AKIDEXAMPLE");
//! assert_eq!(parsed.service(), "execute-api");
//! ```
//!
//! # Modules
//!
//! - [`adapter`] - Conversion from and to `http` crate request types
//! - [`authorization`] - `Authorization` header parsing
//! - [`canonical`] - Canonical request construction
//! - [`clock`] - Injectable time source
//! - [`config`] - Signing configuration loaded from the environment
//! - [`credentials`] - Signing credential and credential provider trait
//! - [`error`] - Signing error types
//! - [`request`] - Transport-neutral request model
//! - [`signer`] - The signing flow
//! - [`sigv4`] - Scope, string-to-sign and key derivation primitives
//! - [`verify`] - Signature verification of incoming requests

pub mod adapter;
pub mod authorization;
pub mod canonical;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod request;
pub mod signer;
pub mod sigv4;
pub mod verify;

pub use adapter::{authorization_from_headers, sign_http_request, sign_parts, verify_parts};
pub use authorization::{ParsedAuthorization, parse_authorization, parse_request_authorization};
pub use config::SigningConfig;
pub use credentials::{Credential, CredentialProvider, StaticCredentialProvider};
pub use error::{ParseStage, SigningError, SigningResult};
pub use signer::{Signer, sign_request};
pub use verify::verify_request;
