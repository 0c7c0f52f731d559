//! Webhook authentication.
//!
//! Credentials are looked up in a fixed order:
//! 1. `X-Webhook-Signature`: hex HMAC-SHA256 of the raw body, optionally `sha256=`-prefixed
//! 2. `Webhook-Signature`: same format, as sent by the email provider
//! 3. `Authorization: Bearer <secret>`
//!
//! Every comparison is constant-time. Without a configured secret every
//! request is refused (fail-closed).

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{IntakeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signature headers, in lookup order.
pub const SIGNATURE_HEADERS: &[&str] = &["x-webhook-signature", "webhook-signature"];

/// A credential presented by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    /// Body signature from one of [`SIGNATURE_HEADERS`].
    Signature(&'a str),
    /// Bearer token from `Authorization`.
    Bearer(&'a str),
}

/// Find the first credential present in `headers`.
pub fn find_credential(headers: &HeaderMap) -> Option<Credential<'_>> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(sig) = SIGNATURE_HEADERS.iter().find_map(|name| header(name)) {
        return Some(Credential::Signature(sig));
    }
    header("authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| Credential::Bearer(token.trim()))
}

/// Verify the request against the shared secret.
pub fn verify(secret: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(IntakeError::NotConfigured)?;

    match find_credential(headers) {
        None => Err(IntakeError::MissingSignature),
        Some(Credential::Signature(sig)) => verify_signature(secret, sig, body),
        Some(Credential::Bearer(token)) => {
            if constant_time_eq(token.as_bytes(), secret.as_bytes()) {
                Ok(())
            } else {
                Err(IntakeError::InvalidSignature)
            }
        }
    }
}

fn verify_signature(secret: &str, signature: &str, body: &[u8]) -> Result<()> {
    let hex_sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    let expected = hex::decode(hex_sig).map_err(|_| IntakeError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| IntakeError::NotConfigured)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| IntakeError::InvalidSignature)
}

/// Hex HMAC-SHA256 of `body` under `secret`, as callers are expected to send it.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("any key length is valid");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Compare two byte strings without short-circuiting on the first difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
