use axum::{
    extract::Path,
    http::HeaderMap,
    response::Response,
    Extension, Form,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    cookies::RequestCookies,
    csrf,
    errors::AuthError,
    oauth::authorize,
    state::AuthState,
};

use super::{error_response, redirect};

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct SignInForm {
    pub csrf_token: Option<String>,
}

async fn start(state: &AuthState, provider_id: &str) -> Response {
    let Some(provider) = state.provider(provider_id) else {
        return error_response(&AuthError::UnknownProvider(provider_id.to_string()), &[]);
    };

    match authorize::start(state, provider).await {
        Ok(outcome) => redirect(outcome.url.as_str(), &outcome.cookies),
        Err(err) => error_response(&err, &[]),
    }
}

/// Begin a sign-in: 302 to the provider's authorization endpoint with the
/// check cookies set.
#[utoipa::path(
    get,
    path = "/auth/signin/{provider}",
    tag = "ensaluti",
    params(("provider" = String, Path, description = "Provider id")),
    responses(
        (status = 302, description = "Redirect to the authorization endpoint"),
        (status = 404, description = "Unknown provider")
    )
)]
pub async fn signin(
    Extension(state): Extension<Arc<AuthState>>,
    Path(provider_id): Path<String>,
) -> Response {
    start(&state, &provider_id).await
}

/// POST form of sign-in; requires a valid CSRF token.
#[utoipa::path(
    post,
    path = "/auth/signin/{provider}",
    tag = "ensaluti",
    params(("provider" = String, Path, description = "Provider id")),
    responses(
        (status = 302, description = "Redirect to the authorization endpoint"),
        (status = 400, description = "CSRF token missing or mismatched"),
        (status = 404, description = "Unknown provider")
    )
)]
pub async fn signin_post(
    Extension(state): Extension<Arc<AuthState>>,
    Path(provider_id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<SignInForm>,
) -> Response {
    let cookies = RequestCookies::from_headers(&headers);
    if let Err(err) =
        csrf::verify_submission(&cookies, form.csrf_token.as_deref(), state.config())
    {
        return error_response(&err.into(), &[]);
    }
    start(&state, &provider_id).await
}
