//! In-memory adapter for development and tests.
//!
//! Not for production: state lives in the process and is lost on restart.
//! It implements the full contract, including read-once verification tokens,
//! so the session engine behaves identically against it.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Adapter, AdapterSession, AdapterUser, VerificationToken};
use crate::provider::Account;

#[derive(Default)]
struct Inner {
    users: HashMap<String, AdapterUser>,
    /// (provider, provider_account_id) -> user id
    accounts: HashMap<(String, String), String>,
    sessions: HashMap<String, AdapterSession>,
    verification_tokens: HashMap<(String, String), VerificationToken>,
}

#[derive(Default)]
pub struct MemoryAdapter {
    inner: Mutex<Inner>,
}

impl MemoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn create_user(&self, mut user: AdapterUser) -> Result<AdapterUser> {
        if user.id.is_empty() {
            user.id = Uuid::new_v4().to_string();
        }
        let mut inner = self.inner.lock().await;
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<AdapterUser>> {
        Ok(self.inner.lock().await.users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<AdapterUser>> {
        Ok(self
            .inner
            .lock()
            .await
            .users
            .values()
            .find(|user| user.email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<AdapterUser>> {
        let inner = self.inner.lock().await;
        let key = (provider.to_string(), provider_account_id.to_string());
        Ok(inner
            .accounts
            .get(&key)
            .and_then(|user_id| inner.users.get(user_id))
            .cloned())
    }

    async fn update_user(&self, user: AdapterUser) -> Result<AdapterUser> {
        let mut inner = self.inner.lock().await;
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.users.remove(id);
        inner.accounts.retain(|_, user_id| user_id != id);
        inner.sessions.retain(|_, session| session.user_id != id);
        Ok(())
    }

    async fn link_account(&self, user_id: &str, account: Account) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.accounts.insert(
            (account.provider, account.provider_account_id),
            user_id.to_string(),
        );
        Ok(())
    }

    async fn unlink_account(&self, provider: &str, provider_account_id: &str) -> Result<()> {
        let key = (provider.to_string(), provider_account_id.to_string());
        self.inner.lock().await.accounts.remove(&key);
        Ok(())
    }

    async fn create_session(&self, session: AdapterSession) -> Result<AdapterSession> {
        let mut inner = self.inner.lock().await;
        inner
            .sessions
            .insert(session.session_token.clone(), session.clone());
        Ok(session)
    }

    async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> Result<Option<(AdapterSession, AdapterUser)>> {
        let inner = self.inner.lock().await;
        let Some(session) = inner.sessions.get(session_token) else {
            return Ok(None);
        };
        let Some(user) = inner.users.get(&session.user_id) else {
            return Ok(None);
        };
        Ok(Some((session.clone(), user.clone())))
    }

    async fn update_session(
        &self,
        session_token: &str,
        expires: i64,
    ) -> Result<Option<AdapterSession>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.sessions.get_mut(session_token).map(|session| {
            session.expires = expires;
            session.clone()
        }))
    }

    async fn delete_session(&self, session_token: &str) -> Result<()> {
        self.inner.lock().await.sessions.remove(session_token);
        Ok(())
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> Result<VerificationToken> {
        let mut inner = self.inner.lock().await;
        inner
            .verification_tokens
            .insert((token.identifier.clone(), token.token.clone()), token.clone());
        Ok(token)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>> {
        let key = (identifier.to_string(), token.to_string());
        Ok(self.inner.lock().await.verification_tokens.remove(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TokenSet;

    fn account(provider: &str, provider_account_id: &str) -> Account {
        Account {
            provider: provider.to_string(),
            provider_type: "oidc".to_string(),
            provider_account_id: provider_account_id.to_string(),
            tokens: TokenSet::default(),
        }
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn user_and_account_linkage_round_trips() {
        let adapter = MemoryAdapter::new();
        let user = adapter
            .create_user(AdapterUser {
                email: Some("alice@example.com".to_string()),
                ..AdapterUser::default()
            })
            .await
            .unwrap();
        assert!(!user.id.is_empty());

        adapter.link_account(&user.id, account("acme", "u1")).await.unwrap();
        let found = adapter.get_user_by_account("acme", "u1").await.unwrap();
        assert_eq!(found, Some(user.clone()));

        adapter.unlink_account("acme", "u1").await.unwrap();
        assert_eq!(adapter.get_user_by_account("acme", "u1").await.unwrap(), None);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn absent_lookups_are_none_not_errors() {
        let adapter = MemoryAdapter::new();
        assert_eq!(adapter.get_user("missing").await.unwrap(), None);
        assert_eq!(adapter.get_user_by_email("missing@example.com").await.unwrap(), None);
        assert!(adapter.get_session_and_user("missing").await.unwrap().is_none());
        assert_eq!(adapter.update_session("missing", 0).await.unwrap(), None);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn sessions_follow_their_user() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(AdapterUser::default()).await.unwrap();
        adapter
            .create_session(AdapterSession {
                session_token: "tok".to_string(),
                user_id: user.id.clone(),
                expires: 4_102_444_800,
            })
            .await
            .unwrap();

        let (session, found) = adapter.get_session_and_user("tok").await.unwrap().unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(found.id, user.id);

        adapter.delete_user(&user.id).await.unwrap();
        assert!(adapter.get_session_and_user("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn verification_tokens_are_read_once() {
        let adapter = MemoryAdapter::new();
        adapter
            .create_verification_token(VerificationToken {
                identifier: "alice@example.com".to_string(),
                token: "t-1".to_string(),
                expires: 4_102_444_800,
            })
            .await
            .unwrap();

        let first = adapter
            .use_verification_token("alice@example.com", "t-1")
            .await
            .unwrap();
        assert!(first.is_some());
        let second = adapter
            .use_verification_token("alice@example.com", "t-1")
            .await
            .unwrap();
        assert!(second.is_none());
    }
}
