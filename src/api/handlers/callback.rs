use axum::{
    extract::{Path, Query},
    http::HeaderMap,
    response::Response,
    Extension, Form,
};
use std::sync::Arc;

use crate::{
    cookies::RequestCookies,
    errors::AuthError,
    oauth::callback::{self, CallbackParams},
    signin,
    state::AuthState,
};

use super::{error_response, redirect};

async fn handle(state: &AuthState, provider_id: &str, params: CallbackParams, headers: &HeaderMap) -> Response {
    let Some(provider) = state.provider(provider_id) else {
        return error_response(&AuthError::UnknownProvider(provider_id.to_string()), &[]);
    };
    let request_cookies = RequestCookies::from_headers(headers);

    let outcome = match callback::run(state, provider, &params, &request_cookies).await {
        Ok(outcome) => outcome,
        Err(failure) => return error_response(&failure.error, &failure.cookies),
    };

    match signin::finish(state, outcome).await {
        Ok(cookies) => redirect(state.config().base_url().as_str(), &cookies),
        Err(err) => error_response(&err, &[]),
    }
}

/// Authorization callback (query response mode).
#[utoipa::path(
    get,
    path = "/auth/callback/{provider}",
    tag = "ensaluti",
    params(("provider" = String, Path, description = "Provider id")),
    responses(
        (status = 302, description = "Signed in; session cookie set"),
        (status = 400, description = "The authorization attempt failed"),
        (status = 404, description = "Unknown provider")
    )
)]
pub async fn callback_get(
    Extension(state): Extension<Arc<AuthState>>,
    Path(provider_id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    handle(&state, &provider_id, params, &headers).await
}

/// Authorization callback (`form_post` response mode).
#[utoipa::path(
    post,
    path = "/auth/callback/{provider}",
    tag = "ensaluti",
    params(("provider" = String, Path, description = "Provider id")),
    responses(
        (status = 302, description = "Signed in; session cookie set"),
        (status = 400, description = "The authorization attempt failed"),
        (status = 404, description = "Unknown provider")
    )
)]
pub async fn callback_post(
    Extension(state): Extension<Arc<AuthState>>,
    Path(provider_id): Path<String>,
    headers: HeaderMap,
    Form(params): Form<CallbackParams>,
) -> Response {
    handle(&state, &provider_id, params, &headers).await
}
