//! Cookie/token codec: authenticated encryption of opaque security values
//! and session payloads.
//!
//! Tokens are `base64url(nonce || ciphertext)` where the ciphertext is a JSON
//! claim set sealed with `ChaCha20-Poly1305`. The key is derived per purpose
//! with HKDF-SHA256, salted by the logical cookie name, so a token minted for
//! one cookie never decrypts under another. The cookie name is also bound as
//! AAD.
//!
//! Secrets are an ordered list: the first entry encrypts, every entry is
//! tried for decryption. That is the whole key-rotation story.

pub mod chunks;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use hkdf::Hkdf;
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use sha2::Sha256;
use uuid::Uuid;

/// Accepted clock skew when checking the embedded `exp`, in seconds.
pub const CLOCK_TOLERANCE_SECONDS: i64 = 15;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

use crate::errors::CodecError;

/// Current unix time in seconds.
#[must_use]
pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Derive the purpose-scoped encryption key for `salt` from one secret.
fn derive_key(secret: &SecretString, salt: &str) -> [u8; KEY_LEN] {
    let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), secret.expose_secret().as_bytes());
    let info = format!("ensaluti encryption key ({salt})");
    let mut okm = [0u8; KEY_LEN];
    // Expand cannot fail for a 32-byte output with SHA-256.
    hk.expand(info.as_bytes(), &mut okm)
        .unwrap_or_else(|_| unreachable!("hkdf output length is fixed"));
    okm
}

/// Seal `claims` into a token scoped to `salt`, valid for `max_age` seconds.
///
/// Injects `iat`, `exp = now + max_age`, and a random `jti` into the claim
/// set before sealing. The `jti` distinguishes re-issues of the same claims;
/// it is not by itself a replay defense.
///
/// # Errors
/// Returns an error if no secret is configured or encryption fails.
pub fn encode(
    claims: Map<String, Value>,
    secrets: &[SecretString],
    salt: &str,
    max_age: i64,
) -> anyhow::Result<String> {
    encode_at(claims, secrets, salt, max_age, now_unix())
}

pub(crate) fn encode_at(
    mut claims: Map<String, Value>,
    secrets: &[SecretString],
    salt: &str,
    max_age: i64,
    now: i64,
) -> anyhow::Result<String> {
    let secret = secrets
        .first()
        .ok_or_else(|| anyhow::anyhow!("no secret configured"))?;

    claims.insert("iat".to_string(), json!(now));
    claims.insert("exp".to_string(), json!(now + max_age));
    claims.insert("jti".to_string(), json!(Uuid::new_v4().to_string()));

    let key = derive_key(secret, salt);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let plaintext = serde_json::to_vec(&claims)?;
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: &plaintext,
                aad: salt.as_bytes(),
            },
        )
        .map_err(|e| anyhow::anyhow!("encryption failure: {e}"))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(sealed))
}

/// Open a token scoped to `salt`. `None` on any failure or when the token is
/// empty; the reason is logged at debug level and never propagated.
#[must_use]
pub fn decode(token: &str, secrets: &[SecretString], salt: &str) -> Option<Map<String, Value>> {
    if token.is_empty() {
        return None;
    }
    match try_decode(token, secrets, salt) {
        Ok(claims) => Some(claims),
        Err(err) => {
            tracing::debug!(salt, %err, "token rejected");
            None
        }
    }
}

/// Open a token, reporting why it was rejected. Fails closed.
///
/// # Errors
/// [`CodecError::Format`] for anything that is not one of our tokens,
/// [`CodecError::Integrity`] when no configured secret opens it,
/// [`CodecError::Expired`] once `exp` is beyond the clock tolerance.
pub fn try_decode(
    token: &str,
    secrets: &[SecretString],
    salt: &str,
) -> Result<Map<String, Value>, CodecError> {
    try_decode_at(token, secrets, salt, now_unix())
}

pub(crate) fn try_decode_at(
    token: &str,
    secrets: &[SecretString],
    salt: &str,
    now: i64,
) -> Result<Map<String, Value>, CodecError> {
    let sealed = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|_| CodecError::Format)?;
    if sealed.len() <= NONCE_LEN {
        return Err(CodecError::Format);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    for secret in secrets {
        let key = derive_key(secret, salt);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let Ok(plaintext) = cipher.decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: salt.as_bytes(),
            },
        ) else {
            continue;
        };

        // Only the right key opens the box, so from here on any problem is
        // about the payload itself, not about trying more secrets.
        let claims: Map<String, Value> =
            serde_json::from_slice(&plaintext).map_err(|_| CodecError::Format)?;
        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(CodecError::Format)?;
        if now > exp + CLOCK_TOLERANCE_SECONDS {
            return Err(CodecError::Expired);
        }
        return Ok(claims);
    }

    Err(CodecError::Integrity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(values: &[&str]) -> Vec<SecretString> {
        values
            .iter()
            .map(|v| SecretString::from((*v).to_string()))
            .collect()
    }

    fn claims(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect()
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn round_trip_preserves_claims_and_adds_timing_fields() {
        let secrets = secrets(&["correct horse battery staple"]);
        let payload = claims(&[("sub", "u1"), ("email", "u1@example.com")]);

        let token = encode(payload, &secrets, "ensaluti.session-token", 3600).unwrap();
        let decoded = try_decode(&token, &secrets, "ensaluti.session-token").unwrap();

        assert_eq!(decoded.get("sub"), Some(&json!("u1")));
        assert_eq!(decoded.get("email"), Some(&json!("u1@example.com")));
        assert!(decoded.get("iat").and_then(Value::as_i64).is_some());
        assert!(decoded.get("exp").and_then(Value::as_i64).is_some());
        assert!(decoded.get("jti").and_then(Value::as_str).is_some());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn decode_fails_once_expired_beyond_tolerance() {
        let secrets = secrets(&["secret"]);
        let now = 1_700_000_000;
        let token = encode_at(claims(&[("sub", "u1")]), &secrets, "salt", 100, now).unwrap();

        // Still valid inside the tolerance window.
        assert!(try_decode_at(&token, &secrets, "salt", now + 100 + CLOCK_TOLERANCE_SECONDS).is_ok());
        assert_eq!(
            try_decode_at(
                &token,
                &secrets,
                "salt",
                now + 100 + CLOCK_TOLERANCE_SECONDS + 1
            ),
            Err(CodecError::Expired)
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn salts_are_not_interchangeable() {
        let secrets = secrets(&["secret"]);
        let token = encode(claims(&[("sub", "u1")]), &secrets, "ensaluti.state", 60).unwrap();
        assert_eq!(
            try_decode(&token, &secrets, "ensaluti.nonce"),
            Err(CodecError::Integrity)
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn rotation_decrypts_with_any_listed_secret() {
        let old = secrets(&["old secret"]);
        let token = encode(claims(&[("sub", "u1")]), &old, "salt", 60).unwrap();

        let rotated = secrets(&["new secret", "old secret"]);
        let decoded = try_decode(&token, &rotated, "salt").unwrap();
        assert_eq!(decoded.get("sub"), Some(&json!("u1")));

        // Encryption switches to the new first entry.
        let fresh = encode(claims(&[("sub", "u2")]), &rotated, "salt", 60).unwrap();
        assert_eq!(
            try_decode(&fresh, &old, "salt"),
            Err(CodecError::Integrity)
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn tampered_token_fails_integrity() {
        let secrets = secrets(&["secret"]);
        let token = encode(claims(&[("sub", "u1")]), &secrets, "salt", 60).unwrap();
        let mut sealed = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        let tampered = URL_SAFE_NO_PAD.encode(sealed);
        assert_eq!(
            try_decode(&tampered, &secrets, "salt"),
            Err(CodecError::Integrity)
        );
    }

    #[test]
    fn garbage_tokens_are_format_errors_and_empty_is_none() {
        let secrets = secrets(&["secret"]);
        assert_eq!(
            try_decode("not base64!!", &secrets, "salt"),
            Err(CodecError::Format)
        );
        assert_eq!(try_decode("YWJj", &secrets, "salt"), Err(CodecError::Format));
        assert!(decode("", &secrets, "salt").is_none());
    }
}
