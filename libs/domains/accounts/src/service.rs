use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::credentials::{CredentialStore, PasswordPolicy};
use crate::error::{AccountError, AccountResult};
use crate::models::{
    Account, AccountResponse, AccountStatus, AuthSession, ChangePasswordRequest, LoginRequest,
    NewAccount, ProfilePatch, SignupRequest, StatusChange, normalize_email,
};
use crate::policy::{Policy, enforce};
use crate::repository::AccountRepository;
use crate::resolver::IdentityResolver;
use crate::token::TokenService;

/// Service layer for the account lifecycle
pub struct AccountService<R: AccountRepository> {
    repository: Arc<R>,
    credentials: CredentialStore,
    tokens: TokenService,
    password_policy: PasswordPolicy,
}

impl<R: AccountRepository> Clone for AccountService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            credentials: self.credentials.clone(),
            tokens: self.tokens.clone(),
            password_policy: self.password_policy.clone(),
        }
    }
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repository: R, credentials: CredentialStore, tokens: TokenService) -> Self {
        Self {
            repository: Arc::new(repository),
            credentials,
            tokens,
            password_policy: PasswordPolicy::default(),
        }
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    /// Identity resolver sharing this service's store and signing key
    pub fn resolver(&self) -> IdentityResolver<R> {
        IdentityResolver::new(Arc::clone(&self.repository), self.tokens.clone())
    }

    /// Register a new account and issue its first token.
    ///
    /// Checks run in order: missing fields, email format, duplicate email,
    /// password strength.
    pub async fn signup(&self, input: SignupRequest) -> AccountResult<AuthSession> {
        let mut missing = Vec::new();
        if input.email.trim().is_empty() {
            missing.push("email");
        }
        if input.password.trim().is_empty() {
            missing.push("password");
        }
        if input.full_name.trim().is_empty() {
            missing.push("full_name");
        }
        if !missing.is_empty() {
            return Err(AccountError::MissingField(missing));
        }

        let email = normalize_email(&input.email);
        validate_email_format(&email)?;

        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(AccountError::DuplicateEmail(email));
        }

        self.password_policy.validate(&input.password)?;

        let password_hash = self.credentials.hash(&input.password)?;
        let new_account = NewAccount::user(email, password_hash, input.full_name.trim().to_string());

        // The store re-checks uniqueness, so a racing signup still loses here
        let account = self.repository.insert(new_account).await?;
        let token = self
            .tokens
            .issue(account.id, &account.email, account.role, account.created_at)?;

        tracing::info!(account_id = %account.id, email = %account.email, "Account created");
        Ok(AuthSession { account, token })
    }

    /// Authenticate by email and password.
    ///
    /// Unknown email and wrong password fail identically. Inactive accounts
    /// may log in; protected operations reject them afterwards.
    pub async fn login(&self, input: LoginRequest) -> AccountResult<AuthSession> {
        let mut missing = Vec::new();
        if input.email.trim().is_empty() {
            missing.push("email");
        }
        if input.password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(AccountError::MissingField(missing));
        }

        let email = normalize_email(&input.email);

        let Some(account) = self.repository.find_by_email(&email).await? else {
            // Spend the same hashing cost as a real verification
            let _ = self.credentials.hash(&input.password);
            tracing::debug!("Login rejected");
            return Err(AccountError::InvalidCredentials);
        };

        if !self.credentials.verify(&input.password, &account.password_hash) {
            tracing::debug!(account_id = %account.id, "Login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        let now = Utc::now();
        let account = self.repository.record_login(account.id, now).await?;
        let token = self.tokens.issue(account.id, &account.email, account.role, now)?;

        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(AuthSession { account, token })
    }

    /// Caller's own record with timestamps, for any authenticated caller
    pub fn current_account(&self, caller: Option<&Account>) -> AccountResult<AccountResponse> {
        let account = enforce(caller, &[Policy::Authenticated])?;
        Ok(account.to_detailed_response())
    }

    /// Caller's profile with timestamps; the caller must be active
    pub fn profile(&self, caller: Option<&Account>) -> AccountResult<AccountResponse> {
        let account = enforce(caller, &[Policy::Authenticated, Policy::Active])?;
        Ok(account.to_detailed_response())
    }

    /// Apply a partial profile change in a single write.
    ///
    /// Only the patched columns are written; status and credentials come
    /// from the store, not from the caller's copy.
    pub async fn update_profile(
        &self,
        caller: Option<&Account>,
        patch: ProfilePatch,
    ) -> AccountResult<Account> {
        let caller = enforce(caller, &[Policy::Authenticated, Policy::Active])?;

        if patch.is_empty() {
            return Err(AccountError::NoFields);
        }

        let full_name = match patch.full_name {
            Some(full_name) => {
                let full_name = full_name.trim();
                if full_name.is_empty() {
                    return Err(AccountError::EmptyField("full_name"));
                }
                Some(full_name.to_string())
            }
            None => None,
        };

        let email = match patch.email {
            Some(email) => {
                let email = normalize_email(&email);
                validate_email_format(&email)?;

                if let Some(existing) = self.repository.find_by_email(&email).await?
                    && existing.id != caller.id
                {
                    return Err(AccountError::DuplicateEmail(email));
                }
                Some(email)
            }
            None => None,
        };

        let updated = self
            .repository
            .update_profile(caller.id, full_name, email)
            .await?;

        tracing::info!(account_id = %updated.id, "Profile updated");
        Ok(updated)
    }

    /// Replace the caller's password after checking the current one
    pub async fn change_password(
        &self,
        caller: Option<&Account>,
        input: ChangePasswordRequest,
    ) -> AccountResult<()> {
        let caller = enforce(caller, &[Policy::Authenticated, Policy::Active])?;

        // Verified before the strength check so a wrong password is never
        // reported as a weak one
        if !self.credentials.verify(&input.current_password, &caller.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        self.password_policy.validate(&input.new_password)?;

        let password_hash = self.credentials.hash(&input.new_password)?;
        self.repository.set_password(caller.id, password_hash).await?;

        tracing::info!(account_id = %caller.id, "Password changed");
        Ok(())
    }

    /// Admin transition of another account's status.
    ///
    /// Setting the status an account already has succeeds with
    /// `changed == false` and writes nothing.
    pub async fn set_status(
        &self,
        caller: Option<&Account>,
        target_id: Uuid,
        status: AccountStatus,
    ) -> AccountResult<StatusChange> {
        let mut policies = vec![Policy::Authenticated, Policy::Admin];
        if status == AccountStatus::Inactive {
            policies.push(Policy::NotSelf(target_id));
        }
        let admin = enforce(caller, &policies)?;

        let target = self
            .repository
            .find_by_id(target_id)
            .await?
            .ok_or(AccountError::NotFound(target_id))?;

        if target.status == status {
            tracing::info!(admin_id = %admin.id, account_id = %target.id, status = %status, "Status unchanged");
            return Ok(StatusChange {
                account: target,
                changed: false,
            });
        }

        let account = self.repository.set_status(target.id, status).await?;

        tracing::info!(admin_id = %admin.id, account_id = %account.id, status = %status, "Status changed");
        Ok(StatusChange {
            account,
            changed: true,
        })
    }
}

pub(crate) fn validate_email_format(email: &str) -> AccountResult<()> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(AccountError::InvalidFormat(email.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForbiddenReason;
    use crate::models::Role;
    use crate::repository::MockAccountRepository;
    use crate::token::TokenConfig;
    use argon2::Params;
    use chrono::Duration;

    fn credentials() -> CredentialStore {
        CredentialStore::with_params(Params::MIN_M_COST, 1, 1).unwrap()
    }

    fn tokens() -> TokenService {
        TokenService::new(
            &TokenConfig::new("service-test-secret-that-is-long-enough", Duration::hours(24))
                .unwrap(),
        )
    }

    fn service(repo: MockAccountRepository) -> AccountService<MockAccountRepository> {
        AccountService::new(repo, credentials(), tokens())
    }

    fn account_with(email: &str, password: &str, role: Role, status: AccountStatus) -> Account {
        NewAccount {
            role,
            status,
            ..NewAccount::user(
                email.to_string(),
                credentials().hash(password).unwrap(),
                "Test".to_string(),
            )
        }
        .into_account(Uuid::now_v7(), Utc::now())
    }

    fn signup_request(email: &str, password: &str, name: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_normalizes_and_persists() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email()
            .withf(|email| email == "ann@example.com")
            .returning(|_| Ok(None));
        repo.expect_insert()
            .withf(|new| {
                new.email == "ann@example.com"
                    && new.full_name == "Ann"
                    && new.password_hash.starts_with("$argon2id$")
                    && new.role == Role::User
                    && new.status == AccountStatus::Active
            })
            .times(1)
            .returning(|new| Ok(new.into_account(Uuid::now_v7(), Utc::now())));

        let session = service(repo)
            .signup(signup_request("  Ann@Example.com ", "Abcdef12", " Ann "))
            .await
            .unwrap();

        assert_eq!(session.account.email, "ann@example.com");
        assert_eq!(session.account.full_name, "Ann");
    }

    #[tokio::test]
    async fn test_signup_reports_all_missing_fields() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email().never();
        repo.expect_insert().never();

        let result = service(repo)
            .signup(signup_request("   ", "Abcdef12", ""))
            .await;

        match result {
            Err(AccountError::MissingField(fields)) => assert_eq!(fields, vec!["email", "full_name"]),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_signup_invalid_email() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email().never();

        let result = service(repo)
            .signup(signup_request("not-an-email", "Abcdef12", "Ann"))
            .await;
        assert!(matches!(result, Err(AccountError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_signup_duplicate_checked_before_strength() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email()
            .returning(|email| Ok(Some(account_with(email, "Abcdef12", Role::User, AccountStatus::Active))));
        repo.expect_insert().never();

        let result = service(repo)
            .signup(signup_request("ann@example.com", "weak", "Ann"))
            .await;
        assert!(matches!(result, Err(AccountError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_signup_weak_password() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_insert().never();

        let result = service(repo)
            .signup(signup_request("ann@example.com", "abcdefgh", "Ann"))
            .await;
        assert!(matches!(result, Err(AccountError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_signup_store_race_surfaces_duplicate() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_insert()
            .returning(|new| Err(AccountError::DuplicateEmail(new.email)));

        let result = service(repo)
            .signup(signup_request("ann@example.com", "Abcdef12", "Ann"))
            .await;
        assert!(matches!(result, Err(AccountError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_signup_store_failure() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Err(AccountError::StoreFailure("connection refused".into())));

        let result = service(repo)
            .signup(signup_request("ann@example.com", "Abcdef12", "Ann"))
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), "store_failure");
        assert_eq!(err.public_message(), "An internal error occurred");
    }

    #[tokio::test]
    async fn test_login_sets_last_login() {
        let stored = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let id = stored.id;
        let returned = stored.clone();

        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        repo.expect_record_login()
            .withf(move |account_id, _| *account_id == id)
            .times(1)
            .returning(move |_, at| {
                Ok(Account {
                    last_login: Some(at),
                    ..returned.clone()
                })
            });

        let service = service(repo);
        let session = service
            .login(LoginRequest {
                email: "ANN@example.com".into(),
                password: "Abcdef12".into(),
            })
            .await
            .unwrap();

        assert_eq!(session.account.id, id);
        assert!(session.account.last_login.is_some());
        let claims = tokens().verify(&session.token.token, Utc::now()).unwrap();
        assert_eq!(claims.sub, id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let stored = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);

        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email().returning(move |email| {
            Ok((email == "ann@example.com").then(|| stored.clone()))
        });
        repo.expect_record_login().never();

        let service = service(repo);
        let unknown = service
            .login(LoginRequest {
                email: "nobody@example.com".into(),
                password: "Abcdef12".into(),
            })
            .await
            .unwrap_err();
        let wrong = service
            .login(LoginRequest {
                email: "ann@example.com".into(),
                password: "Wrong123".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(unknown, AccountError::InvalidCredentials));
        assert!(matches!(wrong, AccountError::InvalidCredentials));
        assert_eq!(
            serde_json::to_value(unknown.to_body()).unwrap(),
            serde_json::to_value(wrong.to_body()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email().never();

        let result = service(repo).login(LoginRequest::default()).await;
        match result {
            Err(AccountError::MissingField(fields)) => assert_eq!(fields, vec!["email", "password"]),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inactive_account_can_login_but_not_use_profile() {
        let stored = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Inactive);
        let returned = stored.clone();

        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        repo.expect_record_login().returning(move |_, at| {
            Ok(Account {
                last_login: Some(at),
                ..returned.clone()
            })
        });

        let service = service(repo);
        let session = service
            .login(LoginRequest {
                email: "ann@example.com".into(),
                password: "Abcdef12".into(),
            })
            .await
            .unwrap();

        let result = service.profile(Some(&session.account));
        assert!(matches!(
            result,
            Err(AccountError::Forbidden(ForbiddenReason::Inactive))
        ));
        assert!(service.current_account(Some(&session.account)).is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_requires_fields() {
        let caller = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let mut repo = MockAccountRepository::new();
        repo.expect_update_profile().never();

        let result = service(repo)
            .update_profile(Some(&caller), ProfilePatch::default())
            .await;
        assert!(matches!(result, Err(AccountError::NoFields)));
    }

    #[tokio::test]
    async fn test_update_profile_is_all_or_nothing() {
        let caller = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email()
            .returning(|email| Ok(Some(account_with(email, "Other123", Role::User, AccountStatus::Active))));
        repo.expect_update_profile().never();

        let result = service(repo)
            .update_profile(
                Some(&caller),
                ProfilePatch {
                    full_name: Some("Renamed".into()),
                    email: Some("taken@example.com".into()),
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_blank_name() {
        let caller = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let mut repo = MockAccountRepository::new();
        repo.expect_update_profile().never();

        let result = service(repo)
            .update_profile(
                Some(&caller),
                ProfilePatch {
                    full_name: Some("   ".into()),
                    email: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::EmptyField("full_name"))));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_own_email() {
        let caller = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let own = caller.clone();
        let stored = caller.clone();
        let caller_id = caller.id;

        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(own.clone())));
        repo.expect_update_profile()
            .withf(move |id, name, email| {
                *id == caller_id
                    && name.as_deref() == Some("Ann B")
                    && email.as_deref() == Some("ann@example.com")
            })
            .times(1)
            .returning(move |_, name, email| {
                Ok(Account {
                    full_name: name.unwrap_or_default(),
                    email: email.unwrap_or_default(),
                    ..stored.clone()
                })
            });

        let updated = service(repo)
            .update_profile(
                Some(&caller),
                ProfilePatch {
                    full_name: Some("Ann B".into()),
                    email: Some("ANN@example.com".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Ann B");
    }

    #[tokio::test]
    async fn test_update_profile_writes_only_patched_columns() {
        let caller = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let stored = caller.clone();

        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_email().never();
        repo.expect_update_profile()
            .withf(|_, name, email| name.as_deref() == Some("Renamed") && email.is_none())
            .times(1)
            .returning(move |_, name, _| {
                Ok(Account {
                    full_name: name.unwrap_or_default(),
                    ..stored.clone()
                })
            });

        let updated = service(repo)
            .update_profile(
                Some(&caller),
                ProfilePatch {
                    full_name: Some("Renamed".into()),
                    email: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Renamed");
    }

    #[tokio::test]
    async fn test_change_password_checks_current_first() {
        let caller = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let mut repo = MockAccountRepository::new();
        repo.expect_set_password().never();

        let result = service(repo)
            .change_password(
                Some(&caller),
                ChangePasswordRequest {
                    current_password: "Wrong123".into(),
                    new_password: "weak".into(),
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_change_password_allows_reuse() {
        let caller = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let old_hash = caller.password_hash.clone();
        let stored = caller.clone();

        let mut repo = MockAccountRepository::new();
        repo.expect_set_password()
            .withf(move |_, hash| *hash != old_hash && hash.starts_with("$argon2id$"))
            .times(1)
            .returning(move |_, hash| {
                Ok(Account {
                    password_hash: hash,
                    ..stored.clone()
                })
            });

        let result = service(repo)
            .change_password(
                Some(&caller),
                ChangePasswordRequest {
                    current_password: "Abcdef12".into(),
                    new_password: "Abcdef12".into(),
                },
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_set_status_requires_admin_before_lookup() {
        let caller = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id().never();

        let result = service(repo)
            .set_status(Some(&caller), Uuid::now_v7(), AccountStatus::Inactive)
            .await;
        assert!(matches!(
            result,
            Err(AccountError::Forbidden(ForbiddenReason::AdminRequired))
        ));
    }

    #[tokio::test]
    async fn test_set_status_blocks_self_deactivation() {
        let admin = account_with("root@example.com", "Abcdef12", Role::Admin, AccountStatus::Active);
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id().never();
        repo.expect_set_status().never();

        let result = service(repo)
            .set_status(Some(&admin), admin.id, AccountStatus::Inactive)
            .await;
        assert!(matches!(
            result,
            Err(AccountError::Forbidden(ForbiddenReason::SelfAction))
        ));
    }

    #[tokio::test]
    async fn test_set_status_unknown_target() {
        let admin = account_with("root@example.com", "Abcdef12", Role::Admin, AccountStatus::Active);
        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let target = Uuid::now_v7();
        let result = service(repo)
            .set_status(Some(&admin), target, AccountStatus::Active)
            .await;
        assert!(matches!(result, Err(AccountError::NotFound(id)) if id == target));
    }

    #[tokio::test]
    async fn test_set_status_idempotent_without_write() {
        let admin = account_with("root@example.com", "Abcdef12", Role::Admin, AccountStatus::Active);
        let target = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let target_id = target.id;

        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        repo.expect_set_status().never();

        let change = service(repo)
            .set_status(Some(&admin), target_id, AccountStatus::Active)
            .await
            .unwrap();
        assert!(!change.changed);
        assert_eq!(change.message(), "Account is already active");
    }

    #[tokio::test]
    async fn test_set_status_deactivates() {
        let admin = account_with("root@example.com", "Abcdef12", Role::Admin, AccountStatus::Active);
        let target = account_with("ann@example.com", "Abcdef12", Role::User, AccountStatus::Active);
        let target_id = target.id;
        let stored = target.clone();

        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        repo.expect_set_status()
            .withf(move |id, status| *id == target_id && *status == AccountStatus::Inactive)
            .times(1)
            .returning(move |_, status| Ok(Account { status, ..stored.clone() }));

        let change = service(repo)
            .set_status(Some(&admin), target_id, AccountStatus::Inactive)
            .await
            .unwrap();
        assert!(change.changed);
        assert_eq!(change.message(), "Account deactivated successfully");
    }

    #[tokio::test]
    async fn test_admin_may_reactivate_self() {
        let admin = account_with("root@example.com", "Abcdef12", Role::Admin, AccountStatus::Active);
        let same = admin.clone();

        let mut repo = MockAccountRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(same.clone())));

        let change = service(repo)
            .set_status(Some(&admin), admin.id, AccountStatus::Active)
            .await
            .unwrap();
        assert!(!change.changed);
    }
}
