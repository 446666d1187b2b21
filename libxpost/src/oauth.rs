//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Builds the `Authorization` header value for a request. Given a fixed nonce
//! and timestamp the output is byte-for-byte deterministic.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

use crate::id::{new_id, NONCE_LEN};

/// RFC 3986 unreserved characters are the only ones left unencoded
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// User-context credentials for the remote API
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl OAuthCredentials {
    pub fn is_complete(&self) -> bool {
        !self.consumer_key.is_empty()
            && !self.consumer_secret.is_empty()
            && !self.access_token.is_empty()
            && !self.access_secret.is_empty()
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &self.access_token)
            .field("access_secret", &"[REDACTED]")
            .finish()
    }
}

/// Percent-encode per RFC 3986 (space becomes `%20`, never `+`)
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// Sign a request with a fresh nonce and the current time
pub fn sign(
    method: &str,
    url: &str,
    credentials: &OAuthCredentials,
    body_params: &[(&str, &str)],
) -> String {
    sign_with(method, url, credentials, body_params, None, None)
}

/// Sign a request, optionally pinning the nonce and timestamp
///
/// Body parameters take part in the signature but are not emitted in the
/// header.
pub fn sign_with(
    method: &str,
    url: &str,
    credentials: &OAuthCredentials,
    body_params: &[(&str, &str)],
    nonce: Option<&str>,
    timestamp: Option<&str>,
) -> String {
    let nonce = nonce
        .map(str::to_string)
        .unwrap_or_else(|| new_id(NONCE_LEN));
    let timestamp = timestamp
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());

    let mut oauth_params: BTreeMap<String, String> = BTreeMap::new();
    oauth_params.insert("oauth_consumer_key".into(), credentials.consumer_key.clone());
    oauth_params.insert("oauth_nonce".into(), nonce);
    oauth_params.insert("oauth_signature_method".into(), SIGNATURE_METHOD.into());
    oauth_params.insert("oauth_timestamp".into(), timestamp);
    oauth_params.insert("oauth_token".into(), credentials.access_token.clone());
    oauth_params.insert("oauth_version".into(), OAUTH_VERSION.into());

    // BTreeMap<String, _> iterates in byte-wise key order
    let mut all_params = oauth_params.clone();
    for (key, value) in body_params {
        all_params.insert((*key).to_string(), (*value).to_string());
    }

    let parameter_string = all_params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string)
    );

    let signing_key = format!(
        "{}&{}",
        percent_encode(&credentials.consumer_secret),
        percent_encode(&credentials.access_secret)
    );

    let signature = hmac_sha1_base64(signing_key.as_bytes(), base_string.as_bytes());
    oauth_params.insert("oauth_signature".into(), signature);

    tracing::trace!("OAuth base string: {}", base_string);

    let header = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {}", header)
}

fn hmac_sha1_base64(key: &[u8], message: &[u8]) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    STANDARD.encode(mac.finalize().into_bytes())
}
