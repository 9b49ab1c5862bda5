//! # Ensaluti (OAuth2/OIDC sign-in and session engine)
//!
//! `ensaluti` authenticates end users against third-party identity providers
//! via the OAuth2/OIDC authorization-code flow and issues application
//! sessions on top of the result.
//!
//! ## Callback handling
//!
//! Each provider declares which per-attempt checks it requires (`state`,
//! PKCE, `nonce`); the callback handler consumes the matching single-use
//! encrypted cookies, exchanges the code, validates ID-token claims (or
//! fetches userinfo for plain OAuth2), and normalizes the result into a
//! `(profile, account)` pair.
//!
//! ## Sessions
//!
//! Two interchangeable strategies share one rolling-expiration rule:
//!
//! - **jwt** — the session is an encrypted cookie; nothing server-side.
//! - **database** — an opaque token in the cookie, the storage [`adapter`]
//!   owns the record.
//!
//! Anything wrong with a session or check cookie degrades to "absent" and
//! the cookie is cleared on the next response; cookie trouble is never a
//! request error.

pub mod adapter;
pub mod api;
pub mod checks;
pub mod cli;
pub mod codec;
pub mod config;
pub mod cookies;
pub mod csrf;
pub mod errors;
pub mod hooks;
pub mod oauth;
pub mod provider;
pub mod session;
pub mod signin;
pub mod state;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
