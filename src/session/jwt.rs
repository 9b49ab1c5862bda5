//! Stateless session strategy: the encrypted cookie *is* the session.
//!
//! Once the rolling window elapses, resolution re-seals the token with a
//! fresh expiry, so the session rolls forward as long as it keeps being
//! used. Nothing about a JWT session touches storage.

use serde_json::Value;
use tracing::debug;

use crate::{
    codec,
    cookies::{Cookie, CookieName},
    hooks::{self, JwtContext, SessionContext, Trigger},
    state::AuthState,
};

use super::{clear_session_cookies, session_body, session_cookies, SessionOutcome};

pub(super) async fn resolve(
    state: &AuthState,
    token: &str,
    clears: Vec<Cookie>,
    update: Option<&Value>,
) -> SessionOutcome {
    let config = state.config();
    let salt = CookieName::SessionToken.salt();

    // Expired, tampered, or foreign tokens all degrade the same way: no
    // session, every cookie that carried the token cleared so the browser
    // stops sending it.
    let Some(claims) = codec::decode(token, config.secrets(), salt) else {
        return SessionOutcome::absent(clear_session_cookies(config, clears));
    };

    let trigger = update.map(|_| Trigger::Update);
    let claims = match state
        .hooks()
        .jwt(claims, JwtContext { trigger, update })
        .await
    {
        Ok(claims) => claims,
        Err(err) => {
            debug!(%err, "jwt hook rejected the session");
            return SessionOutcome::absent(clear_session_cookies(config, clears));
        }
    };

    // Refresh only once update_age of the window has elapsed (or when the
    // hook may have changed the claims), so untouched sessions keep their
    // cookie byte-for-byte.
    let exp = claims.get("exp").and_then(Value::as_i64).unwrap_or(0);
    let due_at = super::rolling_update_due_at(
        exp,
        config.session_max_age_seconds(),
        config.session_update_age_seconds(),
    );
    let now = codec::now_unix();
    let mut fresh = Vec::new();
    let expires = if now >= due_at || update.is_some() {
        // Registered claims are re-injected on encode; carrying the old
        // ones forward would pin the original expiry.
        let mut rolled = claims.clone();
        for registered in ["iat", "exp", "jti"] {
            rolled.remove(registered);
        }
        let sealed = match codec::encode(
            rolled,
            config.secrets(),
            salt,
            config.session_max_age_seconds(),
        ) {
            Ok(sealed) => sealed,
            Err(err) => {
                debug!(%err, "session token re-seal failed");
                return SessionOutcome::absent(clear_session_cookies(config, clears));
            }
        };
        fresh = session_cookies(config, sealed);
        now + config.session_max_age_seconds()
    } else {
        exp
    };
    let string = |key: &str| claims.get(key).and_then(Value::as_str);
    let body = session_body(
        string("name"),
        string("email"),
        string("picture"),
        expires,
    );

    let body = match state
        .hooks()
        .session(SessionContext {
            session: body,
            token: Some(&claims),
            user: None,
            new_session: update,
            trigger,
        })
        .await
    {
        Ok(body) => body,
        Err(err) => {
            debug!(%err, "session hook rejected the session");
            return SessionOutcome::absent(clear_session_cookies(config, clears));
        }
    };

    hooks::fire_session_event(state.hooks(), &body).await;

    // Fresh: leave the presented cookies alone. Re-sealed: clear whatever
    // old chunk the new value no longer occupies, then set the new cookies.
    let cookies = if fresh.is_empty() {
        Vec::new()
    } else {
        let mut cookies: Vec<Cookie> = clears
            .into_iter()
            .filter(|stale| fresh.iter().all(|cookie| cookie.name != stale.name))
            .collect();
        cookies.extend(fresh);
        cookies
    };

    SessionOutcome {
        body: Some(body),
        cookies,
    }
}
