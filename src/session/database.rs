//! Adapter-backed session strategy: the cookie holds an opaque token and
//! the stored row is authoritative.

use serde_json::Value;
use tracing::debug;

use crate::{
    codec,
    cookies::Cookie,
    errors::AuthError,
    hooks::{self, SessionContext, Trigger},
    state::AuthState,
};

use super::{
    clear_session_cookies, rolling_update_due_at, session_body, session_cookies, SessionOutcome,
};

pub(super) async fn resolve(
    state: &AuthState,
    token: &str,
    clears: Vec<Cookie>,
    update: Option<&Value>,
) -> Result<SessionOutcome, AuthError> {
    let config = state.config();
    let adapter = state.require_adapter("the database session strategy")?;

    let Some((mut session, user)) = adapter
        .get_session_and_user(token)
        .await
        .map_err(AuthError::Adapter)?
    else {
        return Ok(SessionOutcome::absent(clear_session_cookies(config, clears)));
    };

    let now = codec::now_unix();
    if session.expires <= now {
        debug!(user = %session.user_id, "session row expired, deleting");
        adapter
            .delete_session(token)
            .await
            .map_err(AuthError::Adapter)?;
        return Ok(SessionOutcome::absent(clear_session_cookies(config, clears)));
    }

    // Rolling refresh: only write once update_age of the window has elapsed,
    // so hot sessions do not hammer storage.
    let due_at = rolling_update_due_at(
        session.expires,
        config.session_max_age_seconds(),
        config.session_update_age_seconds(),
    );
    let mut cookies = Vec::new();
    if now >= due_at {
        let refreshed = adapter
            .update_session(token, now + config.session_max_age_seconds())
            .await
            .map_err(AuthError::Adapter)?;
        if let Some(refreshed) = refreshed {
            session = refreshed;
        }
        // Re-emit the cookie so its Max-Age tracks the new expiry.
        cookies.extend(session_cookies(config, token.to_string()));
    }

    let body = session_body(
        user.name.as_deref(),
        user.email.as_deref(),
        user.image.as_deref(),
        session.expires,
    );
    let trigger = update.map(|_| Trigger::Update);
    let body = match state
        .hooks()
        .session(SessionContext {
            session: body,
            token: None,
            user: Some(&user),
            new_session: update,
            trigger,
        })
        .await
    {
        Ok(body) => body,
        Err(err) => {
            debug!(%err, "session hook rejected the session");
            return Ok(SessionOutcome::absent(clear_session_cookies(config, clears)));
        }
    };

    hooks::fire_session_event(state.hooks(), &body).await;

    Ok(SessionOutcome {
        body: Some(body),
        cookies,
    })
}
