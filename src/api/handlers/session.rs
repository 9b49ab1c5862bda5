use axum::{
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::Value;
use std::sync::Arc;

use crate::{cookies::RequestCookies, csrf, session, state::AuthState};

use super::apply_cookies;

/// Current session. `null` when there is none; broken cookies are cleared
/// on the way out.
#[utoipa::path(
    get,
    path = "/auth/session",
    tag = "ensaluti",
    responses(
        (status = 200, description = "Session body, or null when signed out")
    )
)]
pub async fn session(
    Extension(state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Response {
    let request_cookies = RequestCookies::from_headers(&headers);
    let outcome = session::resolve(&state, &request_cookies, None).await;

    let mut response_headers = HeaderMap::new();
    apply_cookies(&mut response_headers, &outcome.cookies);
    // Every session response carries a CSRF cookie for the next POST.
    let (_, minted) = csrf::ensure(&request_cookies, state.config());
    if let Some(cookie) = minted {
        apply_cookies(&mut response_headers, std::slice::from_ref(&cookie));
    }

    let body = outcome.body.unwrap_or(Value::Null);
    (response_headers, Json(body)).into_response()
}
