//! Authorization-server metadata: static synthesis or one-time OIDC
//! discovery.
//!
//! Discovery results are cached per issuer for the process lifetime.
//! Concurrent resolutions for the same issuer may race and fetch twice; the
//! well-known document is an idempotent GET, so the second result simply
//! overwrites the first.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

use crate::errors::ProtocolError;
use crate::provider::{Provider, ProviderKind};

pub const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

/// The subset of OIDC provider metadata the engine consumes. Immutable for
/// the duration of a callback.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    #[serde(default)]
    pub authorization_endpoint: Option<Url>,
    #[serde(default)]
    pub token_endpoint: Option<Url>,
    #[serde(default)]
    pub userinfo_endpoint: Option<Url>,
}

/// Process-lifetime read-through cache, keyed by issuer URL.
#[derive(Default)]
pub struct DiscoveryCache {
    entries: Mutex<HashMap<String, Arc<AuthorizationServerMetadata>>>,
}

impl DiscoveryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, issuer: &str) -> Option<Arc<AuthorizationServerMetadata>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(issuer).cloned())
    }

    fn insert(&self, issuer: String, metadata: Arc<AuthorizationServerMetadata>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(issuer, metadata);
        }
    }
}

/// Synthesize metadata from statically configured endpoints, when complete
/// enough for this provider kind.
///
/// Plain OAuth2 needs token + userinfo; OIDC takes its profile from the ID
/// token, so token alone suffices.
fn static_metadata(provider: &Provider) -> Option<AuthorizationServerMetadata> {
    let token_endpoint = provider.token_url.clone()?;
    if provider.kind == ProviderKind::OAuth && provider.userinfo_url.is_none() {
        return None;
    }
    Some(AuthorizationServerMetadata {
        issuer: provider
            .issuer
            .as_ref()
            .map(|issuer| issuer.as_str().trim_end_matches('/').to_string())
            .unwrap_or_default(),
        authorization_endpoint: provider.authorization_url.clone(),
        token_endpoint: Some(token_endpoint),
        userinfo_endpoint: provider.userinfo_url.clone(),
    })
}

fn well_known_url(issuer: &Url) -> Result<Url, ProtocolError> {
    let base = format!("{}/", issuer.as_str().trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join(WELL_KNOWN_PATH))
        .map_err(|err| ProtocolError::Discovery {
            issuer: issuer.to_string(),
            reason: err.to_string(),
        })
}

/// Resolve the metadata for a provider: static when fully configured,
/// otherwise one cached discovery fetch against the issuer.
///
/// # Errors
/// [`ProtocolError::Discovery`] when no issuer is configured or the
/// well-known document is unreachable, malformed, or for a different issuer.
pub async fn resolve(
    provider: &Provider,
    http: &reqwest::Client,
    cache: &DiscoveryCache,
) -> Result<Arc<AuthorizationServerMetadata>, ProtocolError> {
    if let Some(metadata) = static_metadata(provider) {
        return Ok(Arc::new(metadata));
    }

    let issuer = provider
        .issuer
        .as_ref()
        .ok_or_else(|| ProtocolError::Discovery {
            issuer: String::new(),
            reason: format!(
                "provider {} has neither static endpoints nor an issuer",
                provider.id
            ),
        })?;
    let issuer_key = issuer.as_str().trim_end_matches('/').to_string();

    if let Some(metadata) = cache.get(&issuer_key) {
        return Ok(metadata);
    }

    let url = well_known_url(issuer)?;
    let discovery_error = |reason: String| ProtocolError::Discovery {
        issuer: issuer_key.clone(),
        reason,
    };

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|err| discovery_error(err.to_string()))?;
    if !response.status().is_success() {
        return Err(discovery_error(format!(
            "well-known document returned {}",
            response.status()
        )));
    }
    let metadata: AuthorizationServerMetadata = response
        .json()
        .await
        .map_err(|err| discovery_error(format!("malformed well-known document: {err}")))?;

    if metadata.issuer.trim_end_matches('/') != issuer_key {
        return Err(discovery_error(format!(
            "document claims issuer {}, expected {}",
            metadata.issuer, issuer_key
        )));
    }

    let metadata = Arc::new(metadata);
    cache.insert(issuer_key, metadata.clone());
    Ok(metadata)
}
