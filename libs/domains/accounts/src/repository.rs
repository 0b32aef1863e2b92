use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AccountError, AccountResult};
use crate::models::{Account, AccountStatus, NewAccount, normalize_email};

/// Repository trait for Account persistence.
///
/// The store is the final arbiter of email uniqueness: `insert` and
/// `update_profile` must reject a second account with the same normalized
/// email even when the caller's own existence check raced.
///
/// Each write touches only its own columns and refreshes `updated_at`, so a
/// request holding an older copy of the record cannot undo another
/// request's change.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Get an account by normalized email
    async fn find_by_email(&self, email: &str) -> AccountResult<Option<Account>>;

    /// Get an account by ID
    async fn find_by_id(&self, id: Uuid) -> AccountResult<Option<Account>>;

    /// Persist a new account, assigning its ID and timestamps
    async fn insert(&self, account: NewAccount) -> AccountResult<Account>;

    /// Set whichever of `full_name` and `email` are given
    async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<String>,
        email: Option<String>,
    ) -> AccountResult<Account>;

    /// Replace the stored credential
    async fn set_password(&self, id: Uuid, password_hash: String) -> AccountResult<Account>;

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> AccountResult<Account>;

    /// Stamp a successful login
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AccountResult<Account>;
}

/// In-memory implementation of AccountRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_email(&self, email: &str) -> AccountResult<Option<Account>> {
        let key = normalize_email(email);
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == key).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AccountResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn insert(&self, account: NewAccount) -> AccountResult<Account> {
        let mut accounts = self.accounts.write().await;

        // Checked under the write lock, so two racing inserts cannot both pass
        let email = normalize_email(&account.email);
        if accounts.values().any(|a| a.email == email) {
            return Err(AccountError::DuplicateEmail(email));
        }

        let account = NewAccount { email, ..account }.into_account(Uuid::now_v7(), Utc::now());
        accounts.insert(account.id, account.clone());

        tracing::info!(account_id = %account.id, "Inserted account");
        Ok(account)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<String>,
        email: Option<String>,
    ) -> AccountResult<Account> {
        let mut accounts = self.accounts.write().await;

        let email = email.map(|e| normalize_email(&e));
        if let Some(email) = &email
            && accounts.values().any(|a| a.id != id && &a.email == email)
        {
            return Err(AccountError::DuplicateEmail(email.clone()));
        }

        let account = accounts.get_mut(&id).ok_or(AccountError::NotFound(id))?;
        if let Some(full_name) = full_name {
            account.full_name = full_name;
        }
        if let Some(email) = email {
            account.email = email;
        }
        account.updated_at = Utc::now();

        tracing::debug!(account_id = %id, "Updated profile");
        Ok(account.clone())
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> AccountResult<Account> {
        self.modify(id, |account| account.password_hash = password_hash).await
    }

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> AccountResult<Account> {
        self.modify(id, |account| account.status = status).await
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AccountResult<Account> {
        self.modify(id, |account| account.last_login = Some(at)).await
    }
}

impl InMemoryAccountRepository {
    /// Apply `change` to one stored account under the write lock
    async fn modify<F>(&self, id: Uuid, change: F) -> AccountResult<Account>
    where
        F: FnOnce(&mut Account) + Send,
    {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(AccountError::NotFound(id))?;

        change(account);
        account.updated_at = Utc::now();

        tracing::debug!(account_id = %id, "Updated account");
        Ok(account.clone())
    }
}
