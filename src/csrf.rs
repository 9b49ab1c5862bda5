//! Double-submit CSRF token.
//!
//! The cookie stores `"{token}|{digest}"` where the digest binds the token
//! to the server secret. The client echoes the bare token back in request
//! bodies; a POST whose echoed token does not match the cookie is rejected.
//! Unlike the check cookies this one is plain (hash-bound, not encrypted):
//! the token itself is not secret, only unforgeable.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::{
    checks,
    config::AuthConfig,
    cookies::{Cookie, CookieName, CookieOptions, RequestCookies},
    errors::ProtocolError,
};

fn digest(token: &str, secret: &SecretString) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(secret.expose_secret().as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Mint a fresh CSRF token and its cookie.
#[must_use]
pub fn issue(config: &AuthConfig) -> (String, Option<Cookie>) {
    let token = checks::random_value();
    let cookie = config.secrets().first().map(|secret| {
        let secure = config.use_secure_cookies();
        Cookie::new(
            CookieName::CsrfToken.browser_name(secure),
            format!("{token}|{}", digest(&token, secret)),
            CookieOptions::defaults(secure),
        )
    });
    (token, cookie)
}

/// Extract the token from a request cookie if its digest checks out under
/// any configured secret.
#[must_use]
pub fn read(cookies: &RequestCookies, config: &AuthConfig) -> Option<String> {
    let name = CookieName::CsrfToken.browser_name(config.use_secure_cookies());
    let raw = cookies.get(&name)?;
    let (token, hash) = raw.split_once('|')?;
    config
        .secrets()
        .iter()
        .any(|secret| digest(token, secret) == hash)
        .then(|| token.to_string())
}

/// Return the current token, minting a cookie only when the request did not
/// carry a valid one.
#[must_use]
pub fn ensure(cookies: &RequestCookies, config: &AuthConfig) -> (String, Option<Cookie>) {
    match read(cookies, config) {
        Some(token) => (token, None),
        None => issue(config),
    }
}

/// Validate a token echoed in a POST body against the cookie.
///
/// # Errors
/// [`ProtocolError::InvalidCsrf`] when the cookie is absent, unverifiable,
/// or does not match the submitted token.
pub fn verify_submission(
    cookies: &RequestCookies,
    submitted: Option<&str>,
    config: &AuthConfig,
) -> Result<(), ProtocolError> {
    let expected = read(cookies, config).ok_or(ProtocolError::InvalidCsrf)?;
    match submitted {
        Some(token) if token == expected => Ok(()),
        _ => Err(ProtocolError::InvalidCsrf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn config() -> AuthConfig {
        #[allow(clippy::unwrap_used)]
        let base_url = Url::parse("http://localhost:3000").unwrap();
        AuthConfig::new(base_url, vec![SecretString::from("secret".to_string())])
    }

    fn with_cookie(cookie: &Cookie) -> RequestCookies {
        RequestCookies::from_pairs(&[(&cookie.name, &cookie.value)])
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn issued_token_reads_back() {
        let config = config();
        let (token, cookie) = issue(&config);
        let cookies = with_cookie(&cookie.unwrap());
        assert_eq!(read(&cookies, &config), Some(token));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn forged_cookie_is_rejected() {
        let config = config();
        let cookies = RequestCookies::from_pairs(&[(
            "ensaluti.csrf-token",
            "attacker-token|attacker-hash",
        )]);
        assert_eq!(read(&cookies, &config), None);
        assert!(verify_submission(&cookies, Some("attacker-token"), &config).is_err());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn submission_must_match_cookie_token() {
        let config = config();
        let (token, cookie) = issue(&config);
        let cookies = with_cookie(&cookie.unwrap());

        assert!(verify_submission(&cookies, Some(&token), &config).is_ok());
        assert!(verify_submission(&cookies, Some("other"), &config).is_err());
        assert!(verify_submission(&cookies, None, &config).is_err());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn ensure_reuses_a_valid_cookie() {
        let config = config();
        let (token, cookie) = issue(&config);
        let cookies = with_cookie(&cookie.unwrap());

        let (same, minted) = ensure(&cookies, &config);
        assert_eq!(same, token);
        assert!(minted.is_none());

        let (fresh, minted) = ensure(&RequestCookies::default(), &config);
        assert_ne!(fresh, token);
        assert!(minted.is_some());
    }
}
