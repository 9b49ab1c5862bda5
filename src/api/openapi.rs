use axum::response::Json;
use utoipa::OpenApi;

use super::handlers::{callback, csrf, health, session, signin, signout};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ensaluti",
        description = "OAuth2/OIDC sign-in and session engine",
        license(name = "BSD-3-Clause")
    ),
    paths(
        health::health,
        signin::signin,
        signin::signin_post,
        callback::callback_get,
        callback::callback_post,
        session::session,
        signout::signout,
        csrf::csrf,
    ),
    tags(
        (name = "ensaluti", description = "Sign-in and session lifecycle API")
    )
)]
pub struct ApiDoc;

/// Serve the generated document at `/openapi.json`.
pub async fn serve() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
