use axum::{http::HeaderMap, response::Response, Extension, Form};
use std::sync::Arc;

use crate::{cookies::RequestCookies, csrf, session, state::AuthState};

use super::{error_response, redirect, signin::SignInForm};

/// Tear down the current session and clear its cookie.
#[utoipa::path(
    post,
    path = "/auth/signout",
    tag = "ensaluti",
    responses(
        (status = 302, description = "Signed out; session cookie cleared"),
        (status = 400, description = "CSRF token missing or mismatched")
    )
)]
pub async fn signout(
    Extension(state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
    Form(form): Form<SignInForm>,
) -> Response {
    let request_cookies = RequestCookies::from_headers(&headers);
    if let Err(err) =
        csrf::verify_submission(&request_cookies, form.csrf_token.as_deref(), state.config())
    {
        return error_response(&err.into(), &[]);
    }

    let cookies = session::sign_out(&state, &request_cookies).await;
    redirect(state.config().base_url().as_str(), &cookies)
}
