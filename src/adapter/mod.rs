//! Storage adapter contract.
//!
//! The engine owns no user or session tables; everything durable goes
//! through this trait. Absence is always `Ok(None)`, never an error: the
//! error channel is reserved for real storage failures, which the session
//! engine degrades to "no session" while logging.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::provider::Account;

/// A user as the adapter stores it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AdapterUser {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A database-strategy session row. `expires` is unix seconds.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AdapterSession {
    pub session_token: String,
    pub user_id: String,
    pub expires: i64,
}

/// One-shot token for email verification flows. `expires` is unix seconds.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: i64,
}

/// User/account/session/verification-token CRUD, implemented by external
/// storage backends.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn create_user(&self, user: AdapterUser) -> Result<AdapterUser>;
    async fn get_user(&self, id: &str) -> Result<Option<AdapterUser>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<AdapterUser>>;
    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<AdapterUser>>;
    async fn update_user(&self, user: AdapterUser) -> Result<AdapterUser>;
    async fn delete_user(&self, id: &str) -> Result<()>;

    async fn link_account(&self, user_id: &str, account: Account) -> Result<()>;
    async fn unlink_account(&self, provider: &str, provider_account_id: &str) -> Result<()>;

    async fn create_session(&self, session: AdapterSession) -> Result<AdapterSession>;
    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> Result<Option<(AdapterSession, AdapterUser)>>;
    /// Returns the refreshed session, or `None` when the token is unknown.
    async fn update_session(
        &self,
        session_token: &str,
        expires: i64,
    ) -> Result<Option<AdapterSession>>;
    async fn delete_session(&self, session_token: &str) -> Result<()>;

    async fn create_verification_token(&self, token: VerificationToken)
        -> Result<VerificationToken>;
    /// Read-once: a returned token is deleted in the same call.
    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>>;
}
