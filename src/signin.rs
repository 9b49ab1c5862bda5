//! Completion of a sign-in after the callback state machine produced a
//! normalized `(profile, account)` pair: adapter linkage, then session
//! minting.

use tracing::info;

use crate::{
    adapter::AdapterUser,
    cookies::Cookie,
    errors::{AuthError, ProtocolError},
    hooks::Trigger,
    oauth::callback::CallbackOutcome,
    provider::{Account, Profile},
    session,
    state::AuthState,
};

/// Find or create the user this provider account belongs to.
///
/// Without an adapter (pure JWT deployments) the user is synthesized from
/// the profile and nothing is persisted.
///
/// # Errors
/// [`ProtocolError::AccountNotLinked`] when a user with the same email
/// exists but is linked to a different provider account; adapter failures
/// propagate.
pub async fn resolve_user(
    state: &AuthState,
    profile: &Profile,
    account: &Account,
) -> Result<(AdapterUser, Trigger), AuthError> {
    let Some(adapter) = state.adapter() else {
        return Ok((
            AdapterUser {
                id: profile.id.clone(),
                name: profile.name.clone(),
                email: profile.email.clone(),
                image: profile.image.clone(),
            },
            Trigger::SignIn,
        ));
    };

    if let Some(user) = adapter
        .get_user_by_account(&account.provider, &account.provider_account_id)
        .await
        .map_err(AuthError::Adapter)?
    {
        return Ok((user, Trigger::SignIn));
    }

    if let Some(email) = &profile.email {
        if adapter
            .get_user_by_email(email)
            .await
            .map_err(AuthError::Adapter)?
            .is_some()
        {
            return Err(ProtocolError::AccountNotLinked.into());
        }
    }

    let user = adapter
        .create_user(AdapterUser {
            id: String::new(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            image: profile.image.clone(),
        })
        .await
        .map_err(AuthError::Adapter)?;
    adapter
        .link_account(&user.id, account.clone())
        .await
        .map_err(AuthError::Adapter)?;

    info!(user = %user.id, provider = %account.provider, "new account linked");
    Ok((user, Trigger::SignUp))
}

/// Turn a completed callback into a signed-in browser: linkage, session
/// minting, and the merged Set-Cookie list (check clears first, then the
/// session cookies).
///
/// # Errors
/// Propagates linkage and minting failures.
pub async fn finish(
    state: &AuthState,
    outcome: CallbackOutcome,
) -> Result<Vec<Cookie>, AuthError> {
    let (user, trigger) = resolve_user(state, &outcome.profile, &outcome.account).await?;
    let mut cookies = outcome.cookies;
    cookies.extend(session::establish(state, &user, trigger).await?);
    Ok(cookies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{memory::MemoryAdapter, Adapter};
    use crate::config::AuthConfig;
    use crate::provider::TokenSet;
    use secrecy::SecretString;
    use std::sync::Arc;
    use url::Url;

    fn profile() -> Profile {
        Profile {
            id: "u1".to_string(),
            name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            image: None,
        }
    }

    fn account() -> Account {
        Account {
            provider: "acme".to_string(),
            provider_type: "oidc".to_string(),
            provider_account_id: "u1".to_string(),
            tokens: TokenSet::default(),
        }
    }

    #[allow(clippy::unwrap_used)]
    fn state_with(adapter: Option<Arc<dyn Adapter>>) -> AuthState {
        let config = AuthConfig::new(
            Url::parse("http://localhost:3000").unwrap(),
            vec![SecretString::from("secret".to_string())],
        );
        let state = AuthState::new(config, Vec::new()).unwrap();
        match adapter {
            Some(adapter) => state.with_adapter(adapter),
            None => state,
        }
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn first_sign_in_creates_and_links() {
        let adapter = Arc::new(MemoryAdapter::default());
        let state = state_with(Some(adapter.clone()));

        let (user, trigger) = resolve_user(&state, &profile(), &account()).await.unwrap();
        assert_eq!(trigger, Trigger::SignUp);
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));

        // Second sign-in finds the linked user.
        let (again, trigger) = resolve_user(&state, &profile(), &account()).await.unwrap();
        assert_eq!(trigger, Trigger::SignIn);
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn same_email_different_account_is_rejected() {
        let adapter = Arc::new(MemoryAdapter::default());
        let state = state_with(Some(adapter.clone()));
        resolve_user(&state, &profile(), &account()).await.unwrap();

        let mut other = account();
        other.provider = "other-idp".to_string();
        let err = resolve_user(&state, &profile(), &other).await.err();
        assert!(matches!(
            err,
            Some(AuthError::Protocol(ProtocolError::AccountNotLinked))
        ));
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn without_adapter_the_profile_is_the_user() {
        let state = state_with(None);
        let (user, trigger) = resolve_user(&state, &profile(), &account()).await.unwrap();
        assert_eq!(trigger, Trigger::SignIn);
        assert_eq!(user.id, "u1");
        assert_eq!(user.name.as_deref(), Some("Alice"));
    }
}
