// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook verification: the subscription handshake and payload signatures.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Answer the one-time GET handshake Meta sends when a webhook is
/// subscribed. Returns the challenge to echo back, or `None` when the
/// mode or token does not match.
pub fn answer_challenge<'a>(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&'a str>,
    expected_token: &str,
) -> Option<&'a str> {
    if mode == Some("subscribe") && token == Some(expected_token) {
        challenge
    } else {
        None
    }
}

/// Verify the `X-Hub-Signature-256` header against the raw request body.
///
/// The header format is `sha256=<hex hmac>`. Comparison is constant-time
/// via the hmac crate's verify.
pub fn verify_signature(app_secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
