//! Cookie model shared by the codec, the check store, and the session engine.
//!
//! Handlers never build `Set-Cookie` strings by hand; every outgoing cookie
//! (including clears) is a [`Cookie`] value serialized in one place.

use axum::http::{
    header::{InvalidHeaderValue, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use std::collections::HashMap;

/// Prefix for every cookie the engine owns.
const COOKIE_BASE_NAME: &str = "ensaluti";

/// `SameSite` attribute values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
            Self::None => "None",
        }
    }
}

/// Attributes applied to an outgoing cookie.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CookieOptions {
    pub path: String,
    pub domain: Option<String>,
    pub same_site: SameSite,
    pub secure: bool,
    pub http_only: bool,
    /// Seconds until the browser drops the cookie. The authoritative expiry
    /// lives inside the encrypted token; this only keeps browsers tidy.
    pub max_age: Option<i64>,
}

impl CookieOptions {
    /// Defaults for engine cookies: `HttpOnly; SameSite=Lax; Path=/`,
    /// `Secure` when serving over HTTPS.
    #[must_use]
    pub fn defaults(secure: bool) -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            same_site: SameSite::Lax,
            secure,
            http_only: true,
            max_age: None,
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }
}

/// One outgoing cookie mutation: a value to set or a clear instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl Cookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    /// Instruction to delete a cookie: empty value, `Max-Age=0`.
    #[must_use]
    pub fn clearing(name: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            options: CookieOptions::defaults(secure).with_max_age(0),
        }
    }

    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.value.is_empty() && self.options.max_age == Some(0)
    }

    /// Render the `Set-Cookie` header value.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        out.push_str("; Path=");
        out.push_str(&self.options.path);
        if let Some(domain) = &self.options.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(max_age) = self.options.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        out.push_str("; SameSite=");
        out.push_str(self.options.same_site.as_str());
        if self.options.http_only {
            out.push_str("; HttpOnly");
        }
        if self.options.secure {
            out.push_str("; Secure");
        }
        out
    }

    /// Append this cookie to a response header map.
    ///
    /// # Errors
    /// Returns an error if the serialized cookie is not a valid header value.
    pub fn append_to(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        headers.append(SET_COOKIE, HeaderValue::from_str(&self.serialize())?);
        Ok(())
    }
}

/// Cookies presented by the client, parsed once per request.
#[derive(Clone, Debug, Default)]
pub struct RequestCookies {
    values: HashMap<String, String>,
}

impl RequestCookies {
    /// Parse every `Cookie` header on the request. Malformed pairs are
    /// skipped rather than failing the request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = HashMap::new();
        for header in headers.get_all(axum::http::header::COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            for pair in raw.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                    continue;
                };
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { values }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

/// Logical cookie names, `__Secure-` prefixed when served over HTTPS.
///
/// The unprefixed name doubles as the codec salt, so a token minted for one
/// purpose never decrypts under another.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CookieName {
    SessionToken,
    CsrfToken,
    State,
    PkceCodeVerifier,
    Nonce,
    WebAuthnChallenge,
}

impl CookieName {
    /// Stable, scheme-independent name used as the key-derivation salt.
    #[must_use]
    pub fn salt(self) -> &'static str {
        match self {
            Self::SessionToken => "ensaluti.session-token",
            Self::CsrfToken => "ensaluti.csrf-token",
            Self::State => "ensaluti.state",
            Self::PkceCodeVerifier => "ensaluti.pkce.code_verifier",
            Self::Nonce => "ensaluti.nonce",
            Self::WebAuthnChallenge => "ensaluti.challenge",
        }
    }

    /// Name as sent to the browser.
    #[must_use]
    pub fn browser_name(self, secure: bool) -> String {
        if secure {
            format!("__Secure-{}", self.salt())
        } else {
            self.salt().to_string()
        }
    }
}

/// Sanity check used in tests and debug assertions.
#[must_use]
pub fn is_engine_cookie(name: &str) -> bool {
    name.trim_start_matches("__Secure-")
        .starts_with(COOKIE_BASE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_includes_attributes() {
        let cookie = Cookie::new(
            "ensaluti.session-token",
            "abc",
            CookieOptions::defaults(true).with_max_age(3600),
        );
        let rendered = cookie.serialize();
        assert!(rendered.starts_with("ensaluti.session-token=abc"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=3600"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
    }

    #[test]
    fn serialize_plain_http_omits_secure() {
        let cookie = Cookie::new("a", "b", CookieOptions::defaults(false));
        assert!(!cookie.serialize().contains("Secure"));
    }

    #[test]
    fn clearing_cookie_has_zero_max_age() {
        let cookie = Cookie::clearing("ensaluti.state", false);
        assert!(cookie.is_clear());
        assert!(cookie.serialize().contains("Max-Age=0"));
    }

    #[test]
    fn request_cookies_parse_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("a=1; b=2;malformed"),
        );
        let cookies = RequestCookies::from_headers(&headers);
        assert_eq!(cookies.get("a"), Some("1"));
        assert_eq!(cookies.get("b"), Some("2"));
        assert_eq!(cookies.get("malformed"), None);
    }

    #[test]
    fn browser_name_prefixes_only_over_https() {
        assert_eq!(
            CookieName::SessionToken.browser_name(true),
            "__Secure-ensaluti.session-token"
        );
        assert_eq!(
            CookieName::SessionToken.browser_name(false),
            "ensaluti.session-token"
        );
    }

    #[test]
    fn engine_cookie_detection_ignores_prefix() {
        assert!(is_engine_cookie("__Secure-ensaluti.state"));
        assert!(is_engine_cookie("ensaluti.nonce"));
        assert!(!is_engine_cookie("tracking_id"));
    }
}
