//! Authorization-redirect construction for the sign-in initiation step.

use tracing::debug;
use url::Url;

use crate::{
    checks::{self, CheckKind},
    cookies::Cookie,
    errors::AuthError,
    oauth::discovery,
    provider::Provider,
    state::AuthState,
};

/// Where to send the user's browser, plus the sealed check cookies that
/// must ride along on the response.
pub struct AuthorizationRedirect {
    pub url: Url,
    pub cookies: Vec<Cookie>,
}

/// Build the authorization redirect for `provider`, minting one sealed
/// cookie per declared check.
///
/// # Errors
/// Discovery failures surface as protocol errors; a provider without a
/// resolvable authorization endpoint is a configuration error.
pub async fn start(
    state: &AuthState,
    provider: &Provider,
) -> Result<AuthorizationRedirect, AuthError> {
    let metadata = discovery::resolve(provider, state.http(), state.discovery()).await?;
    let endpoint = metadata.authorization_endpoint.as_ref().ok_or_else(|| {
        AuthError::Configuration(format!(
            "provider {} has no authorization endpoint",
            provider.id
        ))
    })?;

    let config = state.config();
    let mut url = endpoint.clone();
    let mut cookies = Vec::new();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", &provider.client_id);
        query.append_pair("redirect_uri", &config.redirect_uri(&provider.id));
        query.append_pair("scope", &provider.scope);
        for (key, value) in &provider.authorization_params {
            query.append_pair(key, value);
        }

        if provider.checks.state {
            let value = checks::random_value();
            // User binding is a WebAuthn-challenge concern; the state check
            // carries the random value alone.
            cookies.push(
                checks::create(CheckKind::State, &value, None, config)
                    .map_err(|err| AuthError::Configuration(err.to_string()))?,
            );
            query.append_pair("state", &value);
        }
        if provider.checks.pkce {
            let verifier = checks::pkce_code_verifier();
            cookies.push(
                checks::create(CheckKind::Pkce, &verifier, None, config)
                    .map_err(|err| AuthError::Configuration(err.to_string()))?,
            );
            query.append_pair("code_challenge", &checks::pkce_code_challenge(&verifier));
            query.append_pair("code_challenge_method", "S256");
        }
        if provider.checks.nonce {
            let value = checks::random_value();
            cookies.push(
                checks::create(CheckKind::Nonce, &value, None, config)
                    .map_err(|err| AuthError::Configuration(err.to_string()))?,
            );
            query.append_pair("nonce", &value);
        }
    }

    debug!(provider = %provider.id, %url, "authorization redirect built");

    Ok(AuthorizationRedirect { url, cookies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::provider::ProviderKind;
    use secrecy::SecretString;
    use std::collections::HashMap;

    #[allow(clippy::unwrap_used)]
    fn fixture() -> AuthState {
        let provider = Provider::new(
            "acme",
            ProviderKind::Oidc,
            "client-1",
            SecretString::from("shhh".to_string()),
        )
        .with_authorization_url(Url::parse("https://idp.example.com/authorize").unwrap())
        .with_token_url(Url::parse("https://idp.example.com/token").unwrap())
        .with_checks(crate::provider::ProviderChecks {
            state: true,
            pkce: true,
            nonce: true,
        });
        let config = AuthConfig::new(
            Url::parse("http://localhost:3000").unwrap(),
            vec![SecretString::from("secret".to_string())],
        );
        AuthState::new(config, vec![provider]).unwrap()
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn redirect_carries_every_declared_check() {
        let state = fixture();
        let provider = state.provider("acme").unwrap();
        let redirect = start(&state, provider).await.unwrap();

        let query: HashMap<String, String> = redirect
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(query.get("client_id").map(String::as_str), Some("client-1"));
        assert_eq!(
            query.get("redirect_uri").map(String::as_str),
            Some("http://localhost:3000/auth/callback/acme")
        );
        assert_eq!(
            query.get("code_challenge_method").map(String::as_str),
            Some("S256")
        );
        assert!(query.contains_key("state"));
        assert!(query.contains_key("code_challenge"));
        assert!(query.contains_key("nonce"));

        // One sealed cookie per check, none of them clears.
        assert_eq!(redirect.cookies.len(), 3);
        assert!(redirect.cookies.iter().all(|cookie| !cookie.is_clear()));
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn state_param_matches_sealed_cookie() {
        let state = fixture();
        let provider = state.provider("acme").unwrap();
        let redirect = start(&state, provider).await.unwrap();

        let param = redirect
            .url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        let state_cookie = redirect
            .cookies
            .iter()
            .find(|cookie| cookie.name.contains("state"))
            .unwrap();
        let request = crate::cookies::RequestCookies::from_pairs(&[(
            state_cookie.name.as_str(),
            state_cookie.value.as_str(),
        )]);
        let (stored, clears) =
            checks::consume(CheckKind::State, &request, state.config());
        let stored = stored.unwrap();
        assert_eq!(stored.value, param);
        // Only WebAuthn challenges bind a user id; the state check never does.
        assert!(stored.user_id.is_none());
        assert_eq!(clears.len(), 1);
    }
}
