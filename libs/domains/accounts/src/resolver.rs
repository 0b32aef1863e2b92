//! Turns a presented bearer token into a live account record.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{AccountError, AccountResult};
use crate::models::Account;
use crate::repository::AccountRepository;
use crate::token::TokenService;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization` header value.
///
/// A missing header, a missing `Bearer ` prefix or an empty token are all
/// `Unauthenticated`.
pub fn bearer_token(header: Option<&str>) -> AccountResult<&str> {
    let header = header.ok_or(AccountError::Unauthenticated("missing authorization header"))?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AccountError::Unauthenticated("invalid authorization header"))?
        .trim();

    if token.is_empty() {
        return Err(AccountError::Unauthenticated("invalid authorization header"));
    }

    Ok(token)
}

/// Resolves tokens against the account store.
///
/// Claims only identify the subject; role and status always come from the
/// freshly loaded record.
pub struct IdentityResolver<R: AccountRepository> {
    repository: Arc<R>,
    tokens: TokenService,
}

impl<R: AccountRepository> Clone for IdentityResolver<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            tokens: self.tokens.clone(),
        }
    }
}

impl<R: AccountRepository> IdentityResolver<R> {
    pub fn new(repository: Arc<R>, tokens: TokenService) -> Self {
        Self { repository, tokens }
    }

    pub async fn resolve(&self, token: &str, now: DateTime<Utc>) -> AccountResult<Account> {
        let claims = self.tokens.verify(token, now)?;

        match self.repository.find_by_id(claims.sub).await? {
            Some(account) => Ok(account),
            None => {
                tracing::debug!(account_id = %claims.sub, "Token subject no longer exists");
                Err(AccountError::Unauthenticated("account not found"))
            }
        }
    }

    /// Parse the `Authorization` header value, then resolve its token
    pub async fn resolve_header(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> AccountResult<Account> {
        let token = bearer_token(header)?;
        self.resolve(token, now).await
    }
}
