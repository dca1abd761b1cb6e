//! One-legged OAuth 1.0a request signing (RFC 5849, HMAC-SHA1).
//!
//! The consumer signs each request with its own secret; there is no token
//! and the token secret is empty. Signing is stateless: every call takes a
//! fresh nonce and timestamp.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use ring::hmac;
use url::Url;

use crate::error::AuthError;
use crate::types::HttpMethod;

/// RFC 3986 unreserved characters are left as is; everything else is encoded.
const OAUTH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

const NONCE_LENGTH: usize = 32;

/// Percent-encode per RFC 5849 section 3.6.
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_SET).to_string()
}

/// Random alphanumeric nonce.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Protocol parameters for one signed request.
#[derive(Debug, Clone)]
pub struct SigningParams<'a> {
    pub consumer_key: &'a str,
    pub nonce: &'a str,
    pub timestamp: i64,
}

impl SigningParams<'_> {
    fn protocol_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("oauth_consumer_key", self.consumer_key.to_string()),
            ("oauth_nonce", self.nonce.to_string()),
            ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp", self.timestamp.to_string()),
            ("oauth_version", OAUTH_VERSION.to_string()),
        ]
    }
}

/// Base string URI: scheme and host lowercased, default port dropped, no query.
fn base_string_uri(url: &Url) -> Result<String, AuthError> {
    let host = url.host_str().ok_or_else(|| AuthError::SigningFailed {
        reason: "URL has no host".to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(AuthError::SigningFailed {
            reason: "URL is not hierarchical".to_string(),
        });
    }

    let mut uri = format!("{}://{}", url.scheme(), host.to_ascii_lowercase());
    if let Some(port) = url.port() {
        uri.push_str(&format!(":{}", port));
    }
    uri.push_str(url.path());
    Ok(uri)
}

/// Build the signature base string.
///
/// Request query parameters and protocol parameters are encoded, then sorted
/// by name and value, and joined into the normalized parameter string.
pub fn signature_base_string(
    method: HttpMethod,
    url: &Url,
    params: &SigningParams<'_>,
) -> Result<String, AuthError> {
    let uri = base_string_uri(url)?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(
            params
                .protocol_params()
                .into_iter()
                .map(|(k, v)| (encode(k), encode(&v))),
        )
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.as_str(),
        encode(&uri),
        encode(&normalized)
    ))
}

/// Compute the base64 HMAC-SHA1 signature of a base string.
pub fn compute_signature(base_string: &str, consumer_secret: &str) -> String {
    let signing_key = format!("{}&", encode(consumer_secret));
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, signing_key.as_bytes());
    let tag = hmac::sign(&key, base_string.as_bytes());
    STANDARD.encode(tag.as_ref())
}

/// Sign a request and return the `Authorization` header value.
pub fn authorization_header(
    method: HttpMethod,
    url: &Url,
    consumer_secret: &str,
    params: &SigningParams<'_>,
) -> Result<String, AuthError> {
    let base_string = signature_base_string(method, url, params)?;
    let signature = compute_signature(&base_string, consumer_secret);

    let mut fields = params.protocol_params();
    fields.push(("oauth_signature", signature));
    fields.sort();

    let rendered = fields
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {}", rendered))
}
