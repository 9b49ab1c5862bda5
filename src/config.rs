//! Engine configuration.
//!
//! The CLI populates this once at startup; the engine treats it as immutable
//! per request. Key material is an ordered list: first entry encrypts, every
//! entry is tried for decryption, which is how secrets rotate without
//! invalidating live sessions.

use secrecy::SecretString;
use std::str::FromStr;
use url::Url;

/// 30 days.
pub const DEFAULT_SESSION_MAX_AGE_SECONDS: i64 = 30 * 24 * 60 * 60;
/// 1 day.
pub const DEFAULT_SESSION_UPDATE_AGE_SECONDS: i64 = 24 * 60 * 60;

/// How sessions are persisted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionStrategy {
    /// The session is an encrypted token; no server-side record.
    Jwt,
    /// The cookie holds an opaque token; the storage adapter is
    /// authoritative.
    Database,
}

impl FromStr for SessionStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "jwt" => Ok(Self::Jwt),
            "database" => Ok(Self::Database),
            other => Err(format!("invalid session strategy: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: Url,
    base_path: String,
    secrets: Vec<SecretString>,
    strategy: SessionStrategy,
    session_max_age_seconds: i64,
    session_update_age_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: Url, secrets: Vec<SecretString>) -> Self {
        Self {
            base_url,
            base_path: "/auth".to_string(),
            secrets,
            strategy: SessionStrategy::Jwt,
            session_max_age_seconds: DEFAULT_SESSION_MAX_AGE_SECONDS,
            session_update_age_seconds: DEFAULT_SESSION_UPDATE_AGE_SECONDS,
        }
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        self.base_path = if base_path.starts_with('/') {
            base_path.trim_end_matches('/').to_string()
        } else {
            format!("/{}", base_path.trim_end_matches('/'))
        };
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: SessionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_session_max_age_seconds(mut self, seconds: i64) -> Self {
        self.session_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_update_age_seconds(mut self, seconds: i64) -> Self {
        self.session_update_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn secrets(&self) -> &[SecretString] {
        &self.secrets
    }

    #[must_use]
    pub fn strategy(&self) -> SessionStrategy {
        self.strategy
    }

    #[must_use]
    pub fn session_max_age_seconds(&self) -> i64 {
        self.session_max_age_seconds
    }

    #[must_use]
    pub fn session_update_age_seconds(&self) -> i64 {
        self.session_update_age_seconds
    }

    /// Cookies carry `Secure` and the `__Secure-` name prefix only when the
    /// public origin is HTTPS.
    #[must_use]
    pub fn use_secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    /// The redirect URI registered with providers for the callback action.
    #[must_use]
    pub fn redirect_uri(&self, provider_id: &str) -> String {
        let origin = self.base_url.as_str().trim_end_matches('/');
        format!("{origin}{}/callback/{provider_id}", self.base_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        #[allow(clippy::unwrap_used)]
        let base_url = Url::parse("https://app.example.com").unwrap();
        AuthConfig::new(base_url, vec![SecretString::from("secret".to_string())])
    }

    #[test]
    fn defaults_match_rolling_session_policy() {
        let config = config();
        assert_eq!(config.session_max_age_seconds(), 2_592_000);
        assert_eq!(config.session_update_age_seconds(), 86_400);
        assert_eq!(config.strategy(), SessionStrategy::Jwt);
        assert_eq!(config.base_path(), "/auth");
    }

    #[test]
    fn redirect_uri_joins_origin_base_path_and_provider() {
        assert_eq!(
            config().redirect_uri("acme"),
            "https://app.example.com/auth/callback/acme"
        );
    }

    #[test]
    fn base_path_is_normalized() {
        let config = config().with_base_path("api/auth/");
        assert_eq!(config.base_path(), "/api/auth");
    }

    #[test]
    fn secure_cookies_follow_scheme() {
        assert!(config().use_secure_cookies());
        #[allow(clippy::unwrap_used)]
        let plain = AuthConfig::new(
            Url::parse("http://localhost:3000").unwrap(),
            vec![SecretString::from("secret".to_string())],
        );
        assert!(!plain.use_secure_cookies());
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("JWT".parse::<SessionStrategy>(), Ok(SessionStrategy::Jwt));
        assert_eq!(
            "database".parse::<SessionStrategy>(),
            Ok(SessionStrategy::Database)
        );
        assert!("redis".parse::<SessionStrategy>().is_err());
    }
}
