//! Application hooks and events.
//!
//! Hooks shape what the engine stores and returns (`jwt`, `session`); events
//! are fire-and-forget notifications whose errors are logged, never
//! propagated. The defaults pass data through unchanged, so an application
//! only overrides what it cares about.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

use crate::adapter::AdapterUser;

/// Why a hook is being invoked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Trigger {
    SignIn,
    SignUp,
    Update,
}

impl Trigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "signIn",
            Self::SignUp => "signUp",
            Self::Update => "update",
        }
    }
}

/// Context for the `jwt` hook.
pub struct JwtContext<'a> {
    pub trigger: Option<Trigger>,
    /// Client-supplied data on `trigger == Update`.
    pub update: Option<&'a Value>,
}

/// Context for the `session` hook: the base body plus whichever source
/// backs it (token claims for the JWT strategy, adapter user for the
/// database strategy).
pub struct SessionContext<'a> {
    pub session: Value,
    pub token: Option<&'a Map<String, Value>>,
    pub user: Option<&'a AdapterUser>,
    pub new_session: Option<&'a Value>,
    pub trigger: Option<Trigger>,
}

#[async_trait]
pub trait AuthHooks: Send + Sync {
    /// Mutate the claim set before it is sealed into the session token.
    ///
    /// # Errors
    /// An error here is treated like a decode failure: the request yields no
    /// session.
    async fn jwt(
        &self,
        claims: Map<String, Value>,
        _ctx: JwtContext<'_>,
    ) -> anyhow::Result<Map<String, Value>> {
        Ok(claims)
    }

    /// Shape the response body for the `session` action.
    ///
    /// # Errors
    /// An error here yields no session for the request.
    async fn session(&self, ctx: SessionContext<'_>) -> anyhow::Result<Value> {
        Ok(ctx.session)
    }

    /// `session` event, fired after every successful session resolution.
    ///
    /// # Errors
    /// Errors are logged by the caller and never propagated.
    async fn session_event(&self, _session: &Value) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Pass-through hooks.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl AuthHooks for DefaultHooks {}

/// Fire the `session` event, logging instead of propagating failures.
pub async fn fire_session_event(hooks: &Arc<dyn AuthHooks>, session: &Value) {
    if let Err(err) = hooks.session_event(session).await {
        warn!(%err, "session event handler failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn default_hooks_pass_through() {
        let hooks = DefaultHooks;
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("u1"));

        let out = hooks
            .jwt(
                claims.clone(),
                JwtContext {
                    trigger: Some(Trigger::SignIn),
                    update: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(out, claims);

        let body = json!({"user": {"name": "Alice"}, "expires": "2030-01-01T00:00:00Z"});
        let out = hooks
            .session(SessionContext {
                session: body.clone(),
                token: Some(&claims),
                user: None,
                new_session: None,
                trigger: None,
            })
            .await
            .unwrap();
        assert_eq!(out, body);
    }

    #[tokio::test]
    async fn event_errors_are_swallowed() {
        struct Failing;
        #[async_trait]
        impl AuthHooks for Failing {
            async fn session_event(&self, _session: &Value) -> anyhow::Result<()> {
                anyhow::bail!("listener exploded")
            }
        }

        let hooks: Arc<dyn AuthHooks> = Arc::new(Failing);
        // Must not panic or propagate.
        fire_session_event(&hooks, &json!({})).await;
    }

    #[test]
    fn trigger_names_match_wire_format() {
        assert_eq!(Trigger::Update.as_str(), "update");
        assert_eq!(Trigger::SignIn.as_str(), "signIn");
    }
}
