//! OAuth/OIDC authorization-callback handler.
//!
//! One pass through the state machine per callback request:
//! provider error echo, security checks, metadata resolution, code
//! exchange, profile acquisition, normalization. Validation that needs no
//! network (error echo, state, PKCE presence) completes before the first
//! outbound call, so tampered or replayed callbacks are rejected cheaply.

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    checks::{self, CheckKind},
    codec,
    cookies::{Cookie, RequestCookies},
    errors::{AuthError, ProtocolError},
    oauth::{discovery, exchange, id_token},
    provider::{Account, Profile, Provider, ProviderKind, TokenSet},
    state::AuthState,
};

/// Query or form parameters the authorization server sent back.
#[derive(Clone, Debug, Default, serde::Deserialize, utoipa::ToSchema)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// A completed callback: the normalized pair plus the check-cookie clears
/// accumulated along the way. The caller persists the linkage and mints the
/// session.
pub struct CallbackOutcome {
    pub profile: Profile,
    pub account: Account,
    pub raw_profile: Value,
    pub cookies: Vec<Cookie>,
}

/// A failed callback still carries the clears for whatever checks were
/// consumed before the failure, so stale cookies heal on the next response.
pub struct CallbackFailure {
    pub error: AuthError,
    pub cookies: Vec<Cookie>,
}

struct ConsumedChecks {
    pkce_verifier: Option<String>,
    nonce: Option<String>,
    cookies: Vec<Cookie>,
}

/// Consume and validate every check the provider declares. Pure cookie
/// work; no network.
fn consume_checks(
    state: &AuthState,
    provider: &Provider,
    params: &CallbackParams,
    request_cookies: &RequestCookies,
) -> Result<ConsumedChecks, CallbackFailure> {
    let config = state.config();
    let mut cookies = Vec::new();
    let fail = |error: ProtocolError, cookies: Vec<Cookie>| CallbackFailure {
        error: error.into(),
        cookies,
    };

    if provider.checks.state {
        let (stored, clears) = checks::consume(CheckKind::State, request_cookies, config);
        cookies.extend(clears);
        let matches = match (&stored, &params.state) {
            (Some(stored), Some(param)) => stored.value == *param,
            _ => false,
        };
        if !matches {
            return Err(fail(ProtocolError::InvalidState, cookies));
        }
    }

    let pkce_verifier = if provider.checks.pkce {
        let (stored, clears) = checks::consume(CheckKind::Pkce, request_cookies, config);
        cookies.extend(clears);
        match stored {
            Some(check) => Some(check.value),
            // Required but gone: abort before any network call.
            None => {
                return Err(fail(
                    ProtocolError::MissingPkceVerifier(provider.id.clone()),
                    cookies,
                ));
            }
        }
    } else {
        None
    };

    let nonce = if provider.checks.nonce {
        let (stored, clears) = checks::consume(CheckKind::Nonce, request_cookies, config);
        cookies.extend(clears);
        match stored {
            Some(check) => Some(check.value),
            None => return Err(fail(ProtocolError::InvalidNonce, cookies)),
        }
    } else {
        None
    };

    Ok(ConsumedChecks {
        pkce_verifier,
        nonce,
        cookies,
    })
}

/// Fetch the raw profile document: validated ID-token claims for OIDC,
/// the userinfo endpoint for plain OAuth2.
async fn acquire_profile(
    state: &AuthState,
    provider: &Provider,
    metadata: &discovery::AuthorizationServerMetadata,
    tokens: &TokenSet,
    expected_nonce: Option<&str>,
) -> Result<Value, ProtocolError> {
    if provider.kind == ProviderKind::Oidc {
        let id_token = tokens.id_token.as_deref().ok_or_else(|| {
            ProtocolError::IdToken("provider did not return an id token".to_string())
        })?;
        let claims = id_token::decode_claims(id_token)?;
        id_token::validate_claims(
            &claims,
            &metadata.issuer,
            &provider.client_id,
            expected_nonce,
            codec::now_unix(),
        )?;
        return Ok(Value::Object(claims));
    }

    let endpoint = metadata.userinfo_endpoint.as_ref().ok_or_else(|| {
        ProtocolError::Userinfo("no userinfo endpoint resolved".to_string())
    })?;
    let access_token = tokens.access_token.as_deref().ok_or_else(|| {
        ProtocolError::Userinfo("provider did not return an access token".to_string())
    })?;

    let response = state
        .http()
        .get(endpoint.clone())
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|err| ProtocolError::Userinfo(err.to_string()))?;
    if !response.status().is_success() {
        return Err(ProtocolError::Userinfo(format!(
            "userinfo endpoint returned {}",
            response.status()
        )));
    }
    response
        .json::<Value>()
        .await
        .map_err(|err| ProtocolError::Userinfo(format!("malformed userinfo document: {err}")))
}

/// Drive one callback request to a normalized `(profile, account)` pair.
///
/// # Errors
/// [`CallbackFailure`] carrying the typed error and any accumulated
/// cookie-clear instructions. Never retried.
pub async fn run(
    state: &AuthState,
    provider: &Provider,
    params: &CallbackParams,
    request_cookies: &RequestCookies,
) -> Result<CallbackOutcome, CallbackFailure> {
    // Provider echoed an error back through the user's browser.
    if let Some(error) = &params.error {
        let mut message = error.clone();
        if let Some(description) = &params.error_description {
            message.push_str(": ");
            message.push_str(description);
        }
        return Err(CallbackFailure {
            error: ProtocolError::CallbackEcho(message).into(),
            cookies: Vec::new(),
        });
    }

    let consumed = consume_checks(state, provider, params, request_cookies)?;
    let ConsumedChecks {
        pkce_verifier,
        nonce,
        cookies,
    } = consumed;
    let fail = |error: AuthError| CallbackFailure {
        error,
        cookies: cookies.clone(),
    };

    let metadata = discovery::resolve(provider, state.http(), state.discovery())
        .await
        .map_err(|err| fail(err.into()))?;

    let code = params.code.as_deref().ok_or_else(|| {
        fail(ProtocolError::TokenExchange("callback carried no code".to_string()).into())
    })?;
    let redirect_uri = state.config().redirect_uri(&provider.id);
    let tokens = exchange::exchange_code(
        state.http(),
        &metadata,
        provider,
        &redirect_uri,
        code,
        pkce_verifier.as_deref(),
    )
    .await
    .map_err(|err| fail(err.into()))?;

    let raw_profile = acquire_profile(state, provider, &metadata, &tokens, nonce.as_deref())
        .await
        .map_err(|err| fail(err.into()))?;

    let profile = provider.map_profile(&raw_profile, &tokens).map_err(|err| {
        // The raw payload helps diagnose broken mappings; it is logged,
        // never persisted.
        debug!(provider = %provider.id, raw = %raw_profile, "profile mapping failed");
        fail(AuthError::Configuration(format!(
            "provider {} profile mapping failed: {err}",
            provider.id
        )))
    })?;

    let account = Account {
        provider: provider.id.clone(),
        provider_type: provider.kind.as_str().to_string(),
        provider_account_id: profile.id.clone(),
        tokens,
    };

    info!(provider = %provider.id, account = %account.provider_account_id, "callback completed");

    Ok(CallbackOutcome {
        profile,
        account,
        raw_profile,
        cookies,
    })
}
