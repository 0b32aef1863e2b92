//! Operator-only account provisioning, not reachable from any request path.

use crate::credentials::{CredentialStore, PasswordPolicy};
use crate::error::{AccountError, AccountResult};
use crate::models::{Account, AccountStatus, NewAccount, Role, normalize_email};
use crate::repository::AccountRepository;
use crate::service::validate_email_format;

/// Details for a new administrator
#[derive(Debug, Clone)]
pub struct AdminSpec {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// Create an active admin account directly through the store.
///
/// Refuses when the normalized email is already registered; the existing
/// account is left untouched.
pub async fn provision_admin<R: AccountRepository + ?Sized>(
    repository: &R,
    credentials: &CredentialStore,
    policy: &PasswordPolicy,
    spec: AdminSpec,
) -> AccountResult<Account> {
    let full_name = spec.full_name.trim();
    if full_name.is_empty() {
        return Err(AccountError::MissingField(vec!["full_name"]));
    }

    let email = normalize_email(&spec.email);
    validate_email_format(&email)?;

    if repository.find_by_email(&email).await?.is_some() {
        return Err(AccountError::DuplicateEmail(email));
    }

    policy.validate(&spec.password)?;

    let new_account = NewAccount {
        role: Role::Admin,
        status: AccountStatus::Active,
        ..NewAccount::user(email, credentials.hash(&spec.password)?, full_name.to_string())
    };
    let account = repository.insert(new_account).await?;

    tracing::info!(account_id = %account.id, email = %account.email, "Admin account provisioned");
    Ok(account)
}
