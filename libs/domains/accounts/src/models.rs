use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::IssuedToken;

/// Account roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Account status, flipped only by admin action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            _ => Err(format!("Unknown account status: {}", s)),
        }
    }
}

/// Account entity - matches SQL schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Unique identifier, assigned by the store
    pub id: Uuid,
    /// Normalized email (unique, case-insensitive)
    pub email: String,
    /// Argon2 PHC string, never serialized
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set only by a successful login
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Serialize with the base field set
    pub fn to_response(&self) -> AccountResponse {
        AccountResponse {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            status: self.status,
            timestamps: None,
        }
    }

    /// Serialize with timestamps included
    pub fn to_detailed_response(&self) -> AccountResponse {
        AccountResponse {
            timestamps: Some(AccountTimestamps {
                created_at: self.created_at,
                updated_at: self.updated_at,
                last_login: self.last_login,
            }),
            ..self.to_response()
        }
    }
}

/// Record handed to the store on signup; the store assigns id and timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub status: AccountStatus,
}

impl NewAccount {
    /// Build the record a fresh signup produces
    pub fn user(email: String, password_hash: String, full_name: String) -> Self {
        Self {
            email,
            password_hash,
            full_name,
            role: Role::User,
            status: AccountStatus::Active,
        }
    }

    /// Materialize into an account with the given id and creation time
    pub fn into_account(self, id: Uuid, now: DateTime<Utc>) -> Account {
        Account {
            id,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            role: self.role,
            status: self.status,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

/// Account response DTO (without password_hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(flatten)]
    pub timestamps: Option<AccountTimestamps>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTimestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// DTO for user signup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

/// DTO for user login
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Partial profile update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Account plus the token issued for it
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub account: Account,
    pub token: IssuedToken,
}

impl AuthSession {
    /// Signup response body: token plus base account fields
    pub fn signup_response(&self) -> AuthResponse {
        AuthResponse {
            token: self.token.token.clone(),
            user: self.account.to_response(),
        }
    }

    /// Login response body: token plus account fields with timestamps
    pub fn login_response(&self) -> AuthResponse {
        AuthResponse {
            token: self.token.token.clone(),
            user: self.account.to_detailed_response(),
        }
    }
}

/// Response after successful login/signup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AccountResponse,
}

/// Outcome of an admin status transition
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub account: Account,
    /// False when the account already had the requested status
    pub changed: bool,
}

impl StatusChange {
    pub fn message(&self) -> String {
        if self.changed {
            match self.account.status {
                AccountStatus::Active => "Account activated successfully".to_string(),
                AccountStatus::Inactive => "Account deactivated successfully".to_string(),
            }
        } else {
            format!("Account is already {}", self.account.status)
        }
    }
}

/// Lowercase and trim an email for lookups and uniqueness
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
