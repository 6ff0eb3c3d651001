// ABOUTME: Per-request signature computation for the upstream signing contract
// ABOUTME: Pure HMAC-SHA256 derivation over prompt, session secrets and a timestamp
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Request Signing
//!
//! The upstream authenticates each chat request with a signature computed
//! from the prompt and the session secrets. The algorithm is an external,
//! versioned contract of the upstream service; it is reproduced here as an
//! opaque stable function: identical inputs at the same instant always yield
//! the same output, and the output must never be cached across prompts or
//! timestamps.
//!
//! Signing never fails. Degenerate inputs (an empty token) still produce a
//! signature; upstream rejects it later, which surfaces as an auth failure.

use std::time::{SystemTime, UNIX_EPOCH};

use ring::hmac;
use uuid::Uuid;

/// Output of the signing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signed {
    /// Hex-encoded request signature for the `X-Signature` header
    pub signature: String,
    /// Millisecond timestamp the signature was computed at
    pub timestamp: String,
    /// Query string suffix appended to the upstream completions URL
    pub query_suffix: String,
}

/// Sign a prompt with the current session secrets at the current instant
#[must_use]
pub fn sign(prompt: &str, token: &str, user_id: &str, salt_key: &str) -> Signed {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
    sign_at(prompt, token, user_id, salt_key, now_ms, Uuid::new_v4())
}

/// Sign at a pinned instant with a pinned request id
///
/// Deterministic: the same inputs always produce the same [`Signed`] value.
#[must_use]
pub fn sign_at(
    prompt: &str,
    token: &str,
    user_id: &str,
    salt_key: &str,
    timestamp_ms: u64,
    request_id: Uuid,
) -> Signed {
    let timestamp = timestamp_ms.to_string();

    // Two-stage HMAC: the salt key signs the timestamp to derive the
    // per-instant key, which then signs the canonical request string.
    let salt = hmac::Key::new(hmac::HMAC_SHA256, salt_key.as_bytes());
    let derived = hmac::sign(&salt, timestamp.as_bytes());
    let key = hmac::Key::new(hmac::HMAC_SHA256, derived.as_ref());

    let canonical = format!(
        "requestId,{request_id},timestamp,{timestamp},user_id,{user_id},token,{token}"
    );
    let payload = format!("{canonical}|{prompt}|{timestamp}");
    let signature = hex::encode(hmac::sign(&key, payload.as_bytes()).as_ref());

    let query_suffix = format!(
        "timestamp={timestamp}&requestId={request_id}&user_id={user_id}&signature_timestamp={timestamp}"
    );

    Signed {
        signature,
        timestamp,
        query_suffix,
    }
}
