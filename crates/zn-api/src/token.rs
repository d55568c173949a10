// Token-derived endpoint resolution
//
// Zero Networks API keys are three-segment signed tokens. The middle
// segment carries the tenant's portal host in its `aud` claim, which is
// all we need to route requests. The signature is NOT verified: the key is
// an opaque credential the server authenticates, we only read where to
// send it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Error;

/// Decoded claims payload of an API token.
pub type Claims = Map<String, Value>;

/// Decode the claims segment of a token without verifying its signature.
pub fn decode_claims(token: &str) -> Result<Claims, Error> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::Token("API key cannot be empty".into()));
    }

    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(Error::Token(format!(
            "expected 3 segments separated by '.', got {}",
            segments.len()
        )));
    };

    let padded = restore_padding(payload);
    let bytes = URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| Error::Token(format!("failed to decode base64url payload: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::Token(format!("payload is not valid UTF-8: {e}")))?;

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(other) => Err(Error::Token(format!(
            "payload is not a JSON object (got {other})"
        ))),
        Err(e) => Err(Error::Token(format!("failed to parse payload as JSON: {e}"))),
    }
}

/// Read the tenant host from the token's `aud` claim.
///
/// `aud` may be a string or an array of strings; the first non-blank
/// entry wins.
pub fn base_url_from_token(token: &str) -> Result<String, Error> {
    let claims = decode_claims(token)?;
    audience(&claims).ok_or_else(|| Error::Token("aud claim not found in token payload".into()))
}

/// The `aud` claim of already-decoded claims.
pub fn audience(claims: &Claims) -> Option<String> {
    let first = match claims.get("aud")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .find(|s| !s.trim().is_empty()),
        _ => None,
    }?;
    let trimmed = first.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// The `exp` claim as a UTC timestamp, when present and numeric.
pub fn expires_at(claims: &Claims) -> Option<DateTime<Utc>> {
    let secs = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(secs, 0)
}

fn restore_padding(segment: &str) -> String {
    match segment.len() % 4 {
        0 => segment.to_owned(),
        rem => format!("{segment}{}", "=".repeat(4 - rem)),
    }
}
