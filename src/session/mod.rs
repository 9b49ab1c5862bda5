//! Session lifecycle: minting after a completed sign-in, and resolution of
//! the session cookie on every `session` request.
//!
//! Both strategies share one rolling-update rule: a session refreshed at
//! time `t` expires at `t + max_age`, and becomes due for refresh once
//! `update_age` of that window has elapsed. Resolution never fails a
//! request; anything wrong with the cookie or the stored row degrades to
//! "no session" with the cookie cleared.

pub mod database;
pub mod jwt;

use serde_json::{json, Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::error;

use crate::{
    adapter::{AdapterSession, AdapterUser},
    codec::{self, chunks},
    config::{AuthConfig, SessionStrategy},
    cookies::{Cookie, CookieName, CookieOptions, RequestCookies},
    errors::AuthError,
    hooks::{self, JwtContext, Trigger},
    state::AuthState,
};

/// What a `session` request yields: the response body (or `None` for "no
/// session") and the cookies to set on the response.
pub struct SessionOutcome {
    pub body: Option<Value>,
    pub cookies: Vec<Cookie>,
}

impl SessionOutcome {
    fn absent(cookies: Vec<Cookie>) -> Self {
        Self {
            body: None,
            cookies,
        }
    }
}

/// Unix second at which a session expiring at `expires` becomes due for a
/// rolling refresh.
#[must_use]
pub fn rolling_update_due_at(expires: i64, max_age: i64, update_age: i64) -> i64 {
    expires - max_age + update_age
}

fn rfc3339(unix: i64) -> String {
    OffsetDateTime::from_unix_timestamp(unix)
        .map(|t| {
            t.format(&Rfc3339)
                .unwrap_or_else(|_| t.unix_timestamp().to_string())
        })
        .unwrap_or_else(|_| unix.to_string())
}

/// Base response body for the `session` action. Only user-facing fields and
/// the expiry make it out; token internals never do.
pub(crate) fn session_body(
    name: Option<&str>,
    email: Option<&str>,
    image: Option<&str>,
    expires: i64,
) -> Value {
    let mut user = Map::new();
    user.insert("name".to_string(), name.map_or(Value::Null, Into::into));
    user.insert("email".to_string(), email.map_or(Value::Null, Into::into));
    user.insert("image".to_string(), image.map_or(Value::Null, Into::into));
    json!({ "user": user, "expires": rfc3339(expires) })
}

/// Set-Cookie instructions for a session token value, chunked if needed.
pub(crate) fn session_cookies(config: &AuthConfig, value: String) -> Vec<Cookie> {
    let secure = config.use_secure_cookies();
    let name = CookieName::SessionToken.browser_name(secure);
    let options =
        CookieOptions::defaults(secure).with_max_age(config.session_max_age_seconds());
    chunks::chunk(Cookie::new(name, value, options))
}

fn clear_session_cookie(config: &AuthConfig) -> Cookie {
    let secure = config.use_secure_cookies();
    Cookie::clearing(CookieName::SessionToken.browser_name(secure), secure)
}

/// Clears for a rejected session cookie: everything `dechunk` reported plus
/// the base name, without duplicating it.
fn clear_session_cookies(config: &AuthConfig, mut cookies: Vec<Cookie>) -> Vec<Cookie> {
    let base = clear_session_cookie(config);
    if cookies.iter().all(|cookie| cookie.name != base.name) {
        cookies.push(base);
    }
    cookies
}

/// Mint the session for `user` after a completed sign-in and return the
/// Set-Cookie instructions.
///
/// # Errors
/// Sealing failures and hook rejections are configuration errors; the
/// database strategy propagates adapter failures.
pub async fn establish(
    state: &AuthState,
    user: &AdapterUser,
    trigger: Trigger,
) -> Result<Vec<Cookie>, AuthError> {
    let config = state.config();
    match config.strategy() {
        SessionStrategy::Jwt => {
            let mut claims = Map::new();
            claims.insert("sub".to_string(), json!(user.id));
            if let Some(name) = &user.name {
                claims.insert("name".to_string(), json!(name));
            }
            if let Some(email) = &user.email {
                claims.insert("email".to_string(), json!(email));
            }
            if let Some(image) = &user.image {
                claims.insert("picture".to_string(), json!(image));
            }

            let claims = state
                .hooks()
                .jwt(
                    claims,
                    JwtContext {
                        trigger: Some(trigger),
                        update: None,
                    },
                )
                .await
                .map_err(|err| AuthError::Configuration(format!("jwt hook rejected sign-in: {err}")))?;

            let sealed = codec::encode(
                claims,
                config.secrets(),
                CookieName::SessionToken.salt(),
                config.session_max_age_seconds(),
            )
            .map_err(|err| AuthError::Configuration(err.to_string()))?;
            Ok(session_cookies(config, sealed))
        }
        SessionStrategy::Database => {
            let adapter = state.require_adapter("the database session strategy")?;
            let session = adapter
                .create_session(AdapterSession {
                    session_token: uuid::Uuid::new_v4().to_string(),
                    user_id: user.id.clone(),
                    expires: codec::now_unix() + config.session_max_age_seconds(),
                })
                .await
                .map_err(AuthError::Adapter)?;
            Ok(session_cookies(config, session.session_token))
        }
    }
}

/// Tear down the current session: the database strategy deletes the stored
/// row, both strategies clear the cookie, and the `session` event fires
/// with a null session.
pub async fn sign_out(state: &AuthState, request_cookies: &RequestCookies) -> Vec<Cookie> {
    let config = state.config();
    let name = CookieName::SessionToken.browser_name(config.use_secure_cookies());
    let (token, clears) =
        chunks::dechunk(request_cookies, &name, config.use_secure_cookies());

    if config.strategy() == SessionStrategy::Database {
        if let (Some(token), Some(adapter)) = (&token, state.adapter()) {
            if let Err(err) = adapter.delete_session(token).await {
                // The cookie is cleared regardless; the orphaned row ages out.
                error!(%err, "failed to delete session row on sign-out");
            }
        }
    }

    let cookies = clear_session_cookies(config, clears);
    hooks::fire_session_event(state.hooks(), &Value::Null).await;
    cookies
}

/// Resolve the session for one request: read the (possibly chunked) session
/// cookie and dispatch to the configured strategy.
///
/// `update` carries client-supplied data for the JWT `update` trigger.
pub async fn resolve(
    state: &AuthState,
    request_cookies: &RequestCookies,
    update: Option<&Value>,
) -> SessionOutcome {
    let config = state.config();
    let name = CookieName::SessionToken.browser_name(config.use_secure_cookies());
    let (token, clears) =
        chunks::dechunk(request_cookies, &name, config.use_secure_cookies());

    let Some(token) = token else {
        // Missing chunks still produce repair clears.
        return SessionOutcome::absent(clears);
    };

    match config.strategy() {
        SessionStrategy::Jwt => jwt::resolve(state, &token, clears, update).await,
        SessionStrategy::Database => {
            match database::resolve(state, &token, clears, update).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    // Storage trouble yields no session but does not log the
                    // user out; the cookie may still be valid later.
                    error!(%err, "session resolution failed");
                    SessionOutcome::absent(Vec::new())
                }
            }
        }
    }
}
