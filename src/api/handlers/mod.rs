pub mod callback;
pub mod csrf;
pub mod health;
pub mod session;
pub mod signin;
pub mod signout;

use axum::{
    http::{header::LOCATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::{
    cookies::{is_engine_cookie, Cookie},
    errors::AuthError,
};

/// Append Set-Cookie headers, dropping (and logging) any that cannot be
/// rendered as a header value.
pub(crate) fn apply_cookies(headers: &mut HeaderMap, cookies: &[Cookie]) {
    for cookie in cookies {
        // Handlers only ever emit cookies the engine owns.
        debug_assert!(is_engine_cookie(&cookie.name), "{}", cookie.name);
        if let Err(err) = cookie.append_to(headers) {
            error!(name = %cookie.name, %err, "failed to render Set-Cookie header");
        }
    }
}

/// 302 to `location` with the given cookies set.
pub(crate) fn redirect(location: &str, cookies: &[Cookie]) -> Response {
    let mut headers = HeaderMap::new();
    apply_cookies(&mut headers, cookies);
    match location.parse() {
        Ok(value) => {
            headers.insert(LOCATION, value);
            (StatusCode::FOUND, headers).into_response()
        }
        Err(err) => {
            error!(%location, %err, "failed to render redirect location");
            (StatusCode::INTERNAL_SERVER_ERROR, headers).into_response()
        }
    }
}

/// Map the engine error taxonomy onto HTTP. Internal detail stays in the
/// logs; the client sees the protocol message or a generic one.
pub(crate) fn error_response(err: &AuthError, cookies: &[Cookie]) -> Response {
    let mut headers = HeaderMap::new();
    apply_cookies(&mut headers, cookies);
    let (status, message) = match err {
        AuthError::UnknownProvider(id) => {
            (StatusCode::NOT_FOUND, format!("unknown provider: {id}"))
        }
        AuthError::Protocol(protocol) => (StatusCode::BAD_REQUEST, protocol.to_string()),
        AuthError::Configuration(detail) => {
            error!(%detail, "request failed on configuration");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server configuration error".to_string(),
            )
        }
        AuthError::Adapter(source) => {
            error!(err = %source, "storage adapter failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage failure".to_string(),
            )
        }
    };
    (status, headers, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProtocolError;

    #[test]
    fn protocol_errors_map_to_bad_request() {
        let response = error_response(&ProtocolError::InvalidState.into(), &[]);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn configuration_detail_never_reaches_the_client() {
        let err = AuthError::Configuration("secret internal detail".to_string());
        let response = error_response(&err, &[]);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn redirect_carries_location_and_cookies() {
        let cookie = Cookie::clearing("ensaluti.state", false);
        let response = redirect("http://localhost:3000/", std::slice::from_ref(&cookie));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers().get(LOCATION).is_some());
        assert!(response.headers().get("set-cookie").is_some());
    }
}
