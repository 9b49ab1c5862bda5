//! Security check store: short-lived, cookie-bound, single-use values
//! (`state`, PKCE code verifier, `nonce`, WebAuthn challenge).
//!
//! Each value is sealed with the codec into its own cookie, so the check
//! cookie itself can neither be read nor forged by the client. "Single-use"
//! is enforced by the consume path always returning a clear instruction for
//! the cookie it read, success or not.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::{
    codec,
    config::AuthConfig,
    cookies::{Cookie, CookieName, CookieOptions, RequestCookies},
};

/// Check cookies live for one authorization attempt, not a session.
pub const CHECK_MAX_AGE_SECONDS: i64 = 15 * 60;

/// The kinds of per-attempt checks a provider can require.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CheckKind {
    State,
    Pkce,
    Nonce,
    WebAuthnChallenge,
}

impl CheckKind {
    #[must_use]
    pub fn cookie(self) -> CookieName {
        match self {
            Self::State => CookieName::State,
            Self::Pkce => CookieName::PkceCodeVerifier,
            Self::Nonce => CookieName::Nonce,
            Self::WebAuthnChallenge => CookieName::WebAuthnChallenge,
        }
    }
}

/// A consumed check value. `user_id` is only populated for WebAuthn
/// registration challenges.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckValue {
    pub value: String,
    pub user_id: Option<String>,
}

/// Random URL-safe opaque value for `state` and `nonce`.
#[must_use]
pub fn random_value() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Random PKCE code verifier (RFC 7636 §4.1).
#[must_use]
pub fn pkce_code_verifier() -> String {
    random_value()
}

/// S256 code challenge for a verifier (RFC 7636 §4.2).
#[must_use]
pub fn pkce_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Seal `value` into the check cookie for `kind`.
///
/// # Errors
/// Returns an error if no secret is configured or sealing fails.
pub fn create(
    kind: CheckKind,
    value: &str,
    user_id: Option<&str>,
    config: &AuthConfig,
) -> anyhow::Result<Cookie> {
    let mut claims = serde_json::Map::new();
    claims.insert("value".to_string(), json!(value));
    if let Some(user_id) = user_id {
        claims.insert("userId".to_string(), json!(user_id));
    }

    let name = kind.cookie();
    let token = codec::encode(claims, config.secrets(), name.salt(), CHECK_MAX_AGE_SECONDS)?;

    let secure = config.use_secure_cookies();
    Ok(Cookie::new(
        name.browser_name(secure),
        token,
        CookieOptions::defaults(secure).with_max_age(CHECK_MAX_AGE_SECONDS),
    ))
}

/// Read-once: open the check cookie for `kind` and schedule it for clearing.
///
/// Absent cookie yields `(None, [])`. A cookie that fails to open still
/// yields the clear instruction so stale state is cleaned up client-side.
#[must_use]
pub fn consume(
    kind: CheckKind,
    cookies: &RequestCookies,
    config: &AuthConfig,
) -> (Option<CheckValue>, Vec<Cookie>) {
    let name = kind.cookie();
    let secure = config.use_secure_cookies();
    let browser_name = name.browser_name(secure);

    let Some(token) = cookies.get(&browser_name) else {
        return (None, Vec::new());
    };
    let clears = vec![Cookie::clearing(browser_name, secure)];

    let Some(claims) = codec::decode(token, config.secrets(), name.salt()) else {
        return (None, clears);
    };
    let Some(value) = claims.get("value").and_then(Value::as_str) else {
        return (None, clears);
    };

    let user_id = claims
        .get("userId")
        .and_then(Value::as_str)
        .map(str::to_string);

    (
        Some(CheckValue {
            value: value.to_string(),
            user_id,
        }),
        clears,
    )
}
