//! the identity collaborator.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::entities::UserId;
use crate::repositories::{RepositoryError, Result};

#[async_trait]
pub trait AuthProvider {
    async fn current_user(&self) -> Option<UserId>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId>;
    /// creates the identity and signs it in.
    async fn create_user(&self, email: &str, password: &str) -> Result<UserId>;
    /// deletes the signed-in identity.
    async fn delete_current_user(&self) -> Result<()>;

    async fn sign_out(&self);
}

struct Account {
    id: UserId,
    password: String,
}

/// process-local accounts. for tests, and for running the client against a
/// store without an identity service in front of it.
#[derive(Default)]
pub struct InMemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<UserId>>,
}

impl InMemoryAuth {
    pub fn new() -> Self { Self::default() }

    /// starts out signed in as `id`, without an account behind it.
    pub fn signed_in(id: impl Into<UserId>) -> Self {
        Self {
            accounts: Mutex::default(),
            current: Mutex::new(Some(id.into())),
        }
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn current_user(&self) -> Option<UserId> { self.current.lock().await.clone() }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        let id = match self.accounts.lock().await.get(email) {
            Some(a) if a.password == password => a.id.clone(),
            _ => return Err(RepositoryError::Unauthenticated),
        };

        *self.current.lock().await = Some(id.clone());
        Ok(id)
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<UserId> {
        let mut accounts = self.accounts.lock().await;

        if accounts.contains_key(email) {
            return Err(RepositoryError::Internal(anyhow!(
                "email already in use: {}",
                email
            )));
        }

        let id = UserId(::uuid::Uuid::new_v4().simple().to_string());
        accounts.insert(email.to_string(), Account {
            id: id.clone(),
            password: password.to_string(),
        });
        drop(accounts);

        *self.current.lock().await = Some(id.clone());
        Ok(id)
    }

    async fn delete_current_user(&self) -> Result<()> {
        let id = self
            .current
            .lock()
            .await
            .clone()
            .ok_or(RepositoryError::Unauthenticated)?;

        self.accounts.lock().await.retain(|_, a| a.id != id);
        Ok(())
    }

    async fn sign_out(&self) { *self.current.lock().await = None; }
}
