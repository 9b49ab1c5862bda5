//! Serde-facing provider configuration and its normalization into
//! [`Provider`] records.
//!
//! This is the pre-core shaping step: defaults are applied and invariants
//! checked here, once, so the protocol engine only ever sees records it can
//! trust.

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

use super::{Provider, ProviderChecks, ProviderKind};

/// One provider entry as written in the providers file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: ProviderKind,
    #[serde(default)]
    pub issuer: Option<Url>,
    #[serde(default)]
    pub authorization_url: Option<Url>,
    #[serde(default)]
    pub authorization_params: BTreeMap<String, String>,
    #[serde(default)]
    pub token_url: Option<Url>,
    #[serde(default)]
    pub userinfo_url: Option<Url>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub checks: Option<ProviderChecks>,
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderConfig {
    /// Validate and shape this entry into a [`Provider`].
    ///
    /// # Errors
    /// Returns an error when the entry can neither be discovered (no issuer)
    /// nor statically resolved (missing endpoints).
    pub fn normalize(self) -> Result<Provider> {
        if self.issuer.is_none() && (self.authorization_url.is_none() || self.token_url.is_none()) {
            bail!(
                "provider {}: either `issuer` (for discovery) or both \
                 `authorization_url` and `token_url` are required",
                self.id
            );
        }
        if self.kind == ProviderKind::OAuth && self.issuer.is_none() && self.userinfo_url.is_none()
        {
            bail!(
                "provider {}: plain oauth providers need a `userinfo_url`",
                self.id
            );
        }

        let mut checks = self.checks.unwrap_or_default();
        if self.kind == ProviderKind::Oidc {
            // Nonce is how OIDC binds the ID token to this attempt.
            checks.nonce = true;
        }

        let mut provider = Provider::new(
            self.id,
            self.kind,
            self.client_id,
            SecretString::from(self.client_secret),
        )
        .with_checks(checks);

        if let Some(name) = self.name {
            provider.name = name;
        }
        if let Some(issuer) = self.issuer {
            provider = provider.with_issuer(issuer);
        }
        if let Some(url) = self.authorization_url {
            provider = provider.with_authorization_url(url);
        }
        if let Some(url) = self.token_url {
            provider = provider.with_token_url(url);
        }
        if let Some(url) = self.userinfo_url {
            provider = provider.with_userinfo_url(url);
        }
        if let Some(scope) = self.scope {
            provider = provider.with_scope(scope);
        }
        provider.authorization_params = self.authorization_params.into_iter().collect();

        Ok(provider)
    }
}

/// Load and normalize the providers file (a JSON array of entries).
///
/// # Errors
/// Returns an error when the file is unreadable, malformed, or any entry
/// fails normalization.
pub fn load_providers(path: &Path) -> Result<Vec<Provider>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read providers file {}", path.display()))?;
    let entries: Vec<ProviderConfig> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse providers file {}", path.display()))?;
    let mut providers = Vec::with_capacity(entries.len());
    for entry in entries {
        providers.push(entry.normalize()?);
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ProviderConfig {
        #[allow(clippy::unwrap_used)]
        serde_json::from_value(value).unwrap()
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn oidc_entry_with_issuer_normalizes_and_forces_nonce() {
        let provider = parse(json!({
            "id": "acme",
            "kind": "oidc",
            "issuer": "https://accounts.acme.test",
            "client_id": "client",
            "client_secret": "shhh"
        }))
        .normalize()
        .unwrap();

        assert_eq!(provider.id, "acme");
        assert!(provider.checks.nonce);
        assert!(provider.checks.state);
        assert_eq!(provider.scope, "openid profile email");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn static_oauth_entry_keeps_endpoints_and_params() {
        let provider = parse(json!({
            "id": "hub",
            "kind": "oauth",
            "authorization_url": "https://hub.test/oauth/authorize",
            "token_url": "https://hub.test/oauth/token",
            "userinfo_url": "https://hub.test/api/user",
            "authorization_params": {"prompt": "consent"},
            "scope": "read:user",
            "client_id": "client",
            "client_secret": "shhh"
        }))
        .normalize()
        .unwrap();

        assert_eq!(provider.scope, "read:user");
        assert!(!provider.checks.nonce);
        assert_eq!(
            provider.authorization_params,
            vec![("prompt".to_string(), "consent".to_string())]
        );
    }

    #[test]
    fn oauth_without_userinfo_or_issuer_is_rejected() {
        let result = parse(json!({
            "id": "bad",
            "kind": "oauth",
            "authorization_url": "https://bad.test/authorize",
            "token_url": "https://bad.test/token",
            "client_id": "client",
            "client_secret": "shhh"
        }))
        .normalize();
        assert!(result.is_err());
    }

    #[test]
    fn entry_without_issuer_or_endpoints_is_rejected() {
        let result = parse(json!({
            "id": "bad",
            "kind": "oidc",
            "client_id": "client",
            "client_secret": "shhh"
        }))
        .normalize();
        assert!(result.is_err());
    }
}
