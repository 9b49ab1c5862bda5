//! Authorization-code exchange against the token endpoint.
//!
//! Never retried: an authorization code is single-use, so a retry either
//! fails identically or trips the server's replay rejection.

use secrecy::ExposeSecret;

use crate::errors::ProtocolError;
use crate::oauth::discovery::AuthorizationServerMetadata;
use crate::provider::{Provider, TokenSet};

/// Cap on how much of an error response body ends up in logs and errors.
const ERROR_BODY_LIMIT: usize = 256;

fn truncate(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

/// POST the code (and PKCE verifier, if any) to the token endpoint.
///
/// # Errors
/// [`ProtocolError::TokenExchange`] on any transport failure, error status,
/// `www-authenticate` challenge, or malformed token document.
pub async fn exchange_code(
    http: &reqwest::Client,
    metadata: &AuthorizationServerMetadata,
    provider: &Provider,
    redirect_uri: &str,
    code: &str,
    code_verifier: Option<&str>,
) -> Result<TokenSet, ProtocolError> {
    let token_endpoint = metadata
        .token_endpoint
        .as_ref()
        .ok_or_else(|| ProtocolError::TokenExchange("no token endpoint resolved".to_string()))?;

    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", provider.client_id.as_str()),
    ];
    if let Some(verifier) = code_verifier {
        form.push(("code_verifier", verifier));
    }

    let response = http
        .post(token_endpoint.clone())
        .basic_auth(
            &provider.client_id,
            Some(provider.client_secret.expose_secret()),
        )
        .form(&form)
        .send()
        .await
        .map_err(|err| ProtocolError::TokenExchange(err.to_string()))?;

    if let Some(challenge) = response.headers().get("www-authenticate") {
        let challenge = challenge.to_str().unwrap_or("<non-ascii>").to_string();
        return Err(ProtocolError::TokenExchange(format!(
            "token endpoint challenged the client: {challenge}"
        )));
    }

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProtocolError::TokenExchange(format!(
            "token endpoint returned {status}: {}",
            truncate(&body)
        )));
    }

    response
        .json::<TokenSet>()
        .await
        .map_err(|err| ProtocolError::TokenExchange(format!("malformed token response: {err}")))
}
