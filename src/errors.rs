//! Error taxonomy for the sign-in and session engine.
//!
//! The split mirrors how failures are handled, not where they happen:
//! - [`ProtocolError`]: the authorization attempt is dead. Never retried,
//!   surfaced to the caller as a typed error.
//! - [`CodecError`]: a cookie did not decrypt or has expired. Degrades to
//!   "no session" / "check absent" and the offending cookie is cleared.
//! - [`AuthError`]: request-level wrapper adding configuration and adapter
//!   failures on top of the protocol ones.

use thiserror::Error;

/// Fatal outcomes of a single authorization attempt.
///
/// Anything here means the current callback cannot complete. The session (if
/// any) is untouched; the user can start a fresh sign-in.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The provider redirected back with an `error` parameter.
    #[error("provider returned an error on callback: {0}")]
    CallbackEcho(String),

    /// Callback `state` parameter does not match the stored check cookie.
    #[error("state parameter does not match the stored state cookie")]
    InvalidState,

    /// `nonce` claim in the ID token does not match the stored check cookie.
    #[error("nonce claim does not match the stored nonce cookie")]
    InvalidNonce,

    /// Provider requires PKCE but no code verifier cookie survived.
    #[error("pkce code verifier missing for provider {0}")]
    MissingPkceVerifier(String),

    /// Double-submit CSRF token missing or mismatched on a POST request.
    #[error("csrf token missing or mismatched")]
    InvalidCsrf,

    /// A user with the same email already exists but is not linked to this
    /// provider account. Auto-linking is unsafe without provider email
    /// verification, so the attempt is rejected.
    #[error("account not linked: a user with this email already exists")]
    AccountNotLinked,

    /// The `.well-known/openid-configuration` document was unreachable or
    /// malformed.
    #[error("discovery failed for issuer {issuer}: {reason}")]
    Discovery { issuer: String, reason: String },

    /// The token endpoint rejected the authorization-code exchange.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The userinfo endpoint failed or returned a malformed document.
    #[error("userinfo request failed: {0}")]
    Userinfo(String),

    /// The ID token failed claim validation (issuer, audience, expiry).
    #[error("id token rejected: {0}")]
    IdToken(String),
}

/// Failures of the cookie/token codec.
///
/// These never become request errors. Callers translate them into an absent
/// session or an absent security check and clear the bad cookie.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Embedded `exp` is in the past (beyond clock tolerance).
    #[error("token expired")]
    Expired,

    /// AEAD open failed: wrong key, tampered ciphertext, or wrong salt.
    #[error("token failed integrity check")]
    Integrity,

    /// Not a token we produced: bad base64, truncated, or invalid JSON.
    #[error("malformed token")]
    Format,
}

/// Request-level error for the HTTP handlers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The request cannot be served with the current configuration, e.g. the
    /// database strategy without an adapter, or a profile mapping without an
    /// id. Logged with context; the client only sees a generic message.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Propagated storage-adapter failure. The request yields no session.
    #[error("adapter failure")]
    Adapter(#[source] anyhow::Error),

    /// Callback or sign-in request for a provider id we do not know.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}
