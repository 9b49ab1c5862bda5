use axum::{
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use std::sync::Arc;

use crate::{cookies::RequestCookies, csrf, state::AuthState};

use super::apply_cookies;

/// Double-submit CSRF token for the next POST request. Reuses a valid
/// cookie, mints one otherwise.
#[utoipa::path(
    get,
    path = "/auth/csrf",
    tag = "ensaluti",
    responses(
        (status = 200, description = "The CSRF token to echo in POST bodies")
    )
)]
pub async fn csrf(
    Extension(state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Response {
    let request_cookies = RequestCookies::from_headers(&headers);
    let (token, minted) = csrf::ensure(&request_cookies, state.config());

    let mut response_headers = HeaderMap::new();
    if let Some(cookie) = minted {
        apply_cookies(&mut response_headers, std::slice::from_ref(&cookie));
    }
    (response_headers, Json(json!({ "csrfToken": token }))).into_response()
}
