//! Shared engine state: configuration, the immutable provider list, and the
//! external collaborators (adapter, hooks, outbound HTTP client).
//!
//! Built once at startup and handed to every request; there is no
//! process-wide provider registry.

use std::sync::Arc;

use crate::{
    adapter::Adapter,
    config::AuthConfig,
    errors::AuthError,
    hooks::{AuthHooks, DefaultHooks},
    oauth::discovery::DiscoveryCache,
    provider::Provider,
};

pub struct AuthState {
    config: AuthConfig,
    providers: Vec<Provider>,
    adapter: Option<Arc<dyn Adapter>>,
    hooks: Arc<dyn AuthHooks>,
    http: reqwest::Client,
    discovery: DiscoveryCache,
}

impl AuthState {
    /// # Errors
    /// Returns an error if the outbound HTTP client cannot be constructed.
    pub fn new(config: AuthConfig, providers: Vec<Provider>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;
        Ok(Self {
            config,
            providers,
            adapter: None,
            hooks: Arc::new(DefaultHooks),
            http,
            discovery: DiscoveryCache::new(),
        })
    }

    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn AuthHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|provider| provider.id == id)
    }

    #[must_use]
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    #[must_use]
    pub fn adapter(&self) -> Option<&Arc<dyn Adapter>> {
        self.adapter.as_ref()
    }

    /// The adapter, or a configuration error naming what needed it.
    ///
    /// # Errors
    /// [`AuthError::Configuration`] when no adapter is wired.
    pub fn require_adapter(&self, needed_for: &str) -> Result<&Arc<dyn Adapter>, AuthError> {
        self.adapter.as_ref().ok_or_else(|| {
            AuthError::Configuration(format!("{needed_for} requires a storage adapter"))
        })
    }

    #[must_use]
    pub fn hooks(&self) -> &Arc<dyn AuthHooks> {
        &self.hooks
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    #[must_use]
    pub fn discovery(&self) -> &DiscoveryCache {
        &self.discovery
    }
}
