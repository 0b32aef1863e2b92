//! Role and status gates evaluated before an operation runs.
//!
//! Operations declare an ordered list of [`Policy`] predicates; [`enforce`]
//! checks them in order and returns the first failure.

use uuid::Uuid;

use crate::error::{AccountError, AccountResult, ForbiddenReason};
use crate::models::Account;

/// A single predicate over the resolved caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// A caller identity was resolved
    Authenticated,
    /// The caller's account is active
    Active,
    /// The caller holds the admin role
    Admin,
    /// The caller is not the given target account
    NotSelf(Uuid),
}

impl Policy {
    fn check(&self, account: &Account) -> AccountResult<()> {
        match self {
            Policy::Authenticated => Ok(()),
            Policy::Active if !account.is_active() => {
                Err(AccountError::Forbidden(ForbiddenReason::Inactive))
            }
            Policy::Admin if !account.is_admin() => {
                Err(AccountError::Forbidden(ForbiddenReason::AdminRequired))
            }
            Policy::NotSelf(target) if account.id == *target => {
                Err(AccountError::Forbidden(ForbiddenReason::SelfAction))
            }
            _ => Ok(()),
        }
    }
}

/// Evaluate `policies` in order against the caller.
///
/// A missing identity fails every policy list with `Unauthenticated`.
pub fn enforce<'a>(identity: Option<&'a Account>, policies: &[Policy]) -> AccountResult<&'a Account> {
    let account = identity.ok_or(AccountError::Unauthenticated("authentication required"))?;

    for policy in policies {
        if let Err(e) = policy.check(account) {
            tracing::warn!(account_id = %account.id, policy = ?policy, "Policy denied");
            return Err(e);
        }
    }

    Ok(account)
}
