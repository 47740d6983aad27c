//! OAuth 1.0a one-legged request signing (HMAC-SHA1).
//!
//! The remote platform authenticates each request from an `Authorization:
//! OAuth …` header carrying the consumer key, a single-use nonce, a
//! timestamp, and an HMAC-SHA1 signature over the canonical request. There
//! is no token secret; the signing key is the percent-encoded consumer
//! secret followed by a literal `&`.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Generates a fresh nonce: 16 random bytes, hex-encoded.
///
/// The remote side rejects reused nonces, so one is generated per request
/// (and per retry attempt, since the signature covers it).
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);

    let mut nonce = String::with_capacity(32);
    for b in bytes {
        nonce.push_str(&format!("{:02x}", b));
    }
    nonce
}

/// RFC 3986 percent-encoding: everything except unreserved characters
/// (`A-Z a-z 0-9 - . _ ~`) is escaped.
fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Computes the signed protocol parameters for one request.
///
/// `url` is the bare endpoint without a query string; `query` holds the
/// query parameters, which enter the signature base (request bodies never
/// do). Nonce and timestamp are arguments rather than generated here so
/// the signature is a pure function of its inputs.
///
/// Returns the protocol parameters with `oauth_signature` appended, in the
/// order they appear in the Authorization header.
pub fn sign_request(
    method: &str,
    url: &str,
    query: &[(String, String)],
    consumer_key: &str,
    consumer_secret: &str,
    nonce: &str,
    timestamp: i64,
) -> Vec<(String, String)> {
    let mut protocol: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), consumer_key.to_string()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
    ];

    // Protocol + query parameters, sorted lexicographically by key
    let mut all: Vec<(String, String)> = protocol.clone();
    all.extend(query.iter().cloned());
    all.sort();

    let param_string = all
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    );

    // No token secret, so the key ends with a bare '&'
    let signing_key = format!("{}&", percent_encode(consumer_secret));

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(base_string.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    protocol.push(("oauth_signature".to_string(), signature));
    protocol
}

/// Assembles the Authorization header value: `OAuth k1="v1", k2="v2", …`
/// with each value percent-encoded.
pub fn authorization_header(params: &[(String, String)]) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {}", joined)
}
