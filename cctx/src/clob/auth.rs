//! L2 HMAC authentication headers for Polymarket-style CLOB endpoints
//! (spec.md §4.6, "L2 HMAC header").

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Credentials issued by the L1 key-issuance handshake, used to sign
/// every subsequent authenticated request.
#[derive(Debug, Clone)]
pub struct L2Credentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

/// The five headers a signed request must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2Headers {
    pub poly_address: String,
    pub poly_signature: String,
    pub poly_timestamp: String,
    pub poly_api_key: String,
    pub poly_passphrase: String,
}

/// Build the L2 HMAC headers for one request.
///
/// `body`, if present, has every single quote replaced with a double
/// quote before signing to match upstream's JSON canonicalisation.
///
/// # Errors
///
/// Returns [`Error::Authentication`] if `credentials.secret` is not
/// valid URL-safe base64.
pub fn build_l2_headers(
    address: &str,
    credentials: &L2Credentials,
    timestamp_unix: i64,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> Result<L2Headers> {
    let secret_bytes = decode_secret(&credentials.secret)?;
    let message = sign_message(timestamp_unix, method, path, body);

    let mut mac = HmacSha256::new_from_slice(&secret_bytes)
        .map_err(|err| Error::Authentication(format!("invalid HMAC key length: {err}")))?;
    mac.update(message.as_bytes());
    let signature = URL_SAFE.encode(mac.finalize().into_bytes());

    Ok(L2Headers {
        poly_address: address.to_string(),
        poly_signature: signature,
        poly_timestamp: timestamp_unix.to_string(),
        poly_api_key: credentials.api_key.clone(),
        poly_passphrase: credentials.passphrase.clone(),
    })
}

fn sign_message(timestamp_unix: i64, method: &str, path: &str, body: Option<&str>) -> String {
    let canonical_body = body.map(|b| b.replace('\'', "\"")).unwrap_or_default();
    format!("{timestamp_unix}{method}{path}{canonical_body}")
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let mut padded = secret.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|err| Error::Authentication(format!("invalid API secret encoding: {err}")))
}
