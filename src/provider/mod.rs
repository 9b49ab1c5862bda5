//! Normalized provider capability records and the provider-agnostic domain
//! types the callback handler produces.
//!
//! The engine never merges defaults or applies per-provider quirks; it only
//! consumes records that are already fully shaped. The serde-facing
//! configuration form and its normalization live in [`config`], outside the
//! protocol core.

pub mod config;

use anyhow::Context;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// OAuth2 vs. OpenID Connect. Decides where the profile comes from: ID-token
/// claims for OIDC, the userinfo endpoint for plain OAuth2.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OAuth,
    Oidc,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OAuth => "oauth",
            Self::Oidc => "oidc",
        }
    }
}

/// Which per-attempt security checks the provider requires.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", default)]
pub struct ProviderChecks {
    pub state: bool,
    pub pkce: bool,
    pub nonce: bool,
}

impl Default for ProviderChecks {
    fn default() -> Self {
        // state + pkce is the safe baseline for code-flow providers.
        Self {
            state: true,
            pkce: true,
            nonce: false,
        }
    }
}

/// Raw token-endpoint response. Provider-specific fields ride along in
/// `extra` untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Provider-normalized user profile. `id` is the only mandatory field.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// The durable link between a user and a provider identity: created once per
/// successful OAuth linkage, persisted by the storage adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub provider: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub provider_account_id: String,
    #[serde(flatten)]
    pub tokens: TokenSet,
}

/// Maps the raw provider profile document into a [`Profile`].
pub type ProfileMapper = Arc<dyn Fn(&Value, &TokenSet) -> anyhow::Result<Profile> + Send + Sync>;

/// Default mapping for standard OIDC claims (`sub`, `name`, `email`,
/// `picture`).
///
/// # Errors
/// Returns an error when neither `sub` nor `id` is present.
pub fn standard_claims_profile(raw: &Value, _tokens: &TokenSet) -> anyhow::Result<Profile> {
    let id = raw
        .get("sub")
        .or_else(|| raw.get("id"))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .context("profile is missing both `sub` and `id`")?;

    let string = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(Profile {
        id,
        name: string("name"),
        email: string("email"),
        image: string("picture").or_else(|| string("avatar_url")),
    })
}

/// A fully normalized provider capability record.
#[derive(Clone)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub kind: ProviderKind,
    pub issuer: Option<Url>,
    pub authorization_url: Option<Url>,
    /// Extra query parameters appended to the authorization redirect.
    pub authorization_params: Vec<(String, String)>,
    pub token_url: Option<Url>,
    pub userinfo_url: Option<Url>,
    pub scope: String,
    pub checks: ProviderChecks,
    pub client_id: String,
    pub client_secret: SecretString,
    profile: ProfileMapper,
}

impl Provider {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: ProviderKind,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            issuer: None,
            authorization_url: None,
            authorization_params: Vec::new(),
            token_url: None,
            userinfo_url: None,
            scope: "openid profile email".to_string(),
            checks: ProviderChecks::default(),
            client_id: client_id.into(),
            client_secret,
            profile: Arc::new(standard_claims_profile),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: Url) -> Self {
        self.issuer = Some(issuer);
        self
    }

    #[must_use]
    pub fn with_authorization_url(mut self, url: Url) -> Self {
        self.authorization_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_checks(mut self, checks: ProviderChecks) -> Self {
        self.checks = checks;
        self
    }

    #[must_use]
    pub fn with_profile_mapper(mut self, mapper: ProfileMapper) -> Self {
        self.profile = mapper;
        self
    }

    /// Apply the provider's profile mapping to a raw profile document.
    ///
    /// # Errors
    /// Propagates the mapper's error, e.g. a missing id.
    pub fn map_profile(&self, raw: &Value, tokens: &TokenSet) -> anyhow::Result<Profile> {
        (self.profile)(raw, tokens)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("issuer", &self.issuer)
            .field("checks", &self.checks)
            .finish_non_exhaustive()
    }
}
