//! OAuth2/OIDC protocol core: endpoint resolution, authorization redirects,
//! code exchange, ID-token validation, and the callback state machine.

pub mod authorize;
pub mod callback;
pub mod discovery;
pub mod exchange;
pub mod id_token;
