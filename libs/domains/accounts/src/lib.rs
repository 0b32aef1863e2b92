//! Accounts Domain
//!
//! Authentication and authorization core for user accounts.
//!
//! # Features
//!
//! - Signup, login, profile and password management
//! - Password hashing with Argon2id
//! - Signed, time-bounded bearer tokens (HS256)
//! - Ordered role/status policy gates
//! - Admin activation and deactivation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Resolver   │  ← Bearer header → live Account
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Policy    │  ← Ordered predicates, first failure wins
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Lifecycle transitions, credentials, tokens
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + in-memory / Postgres)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs, enums
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_accounts::{
//!     AccountService, CredentialStore, InMemoryAccountRepository, SignupRequest, TokenConfig,
//!     TokenService,
//! };
//! use core_config::FromEnv;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = TokenService::new(&TokenConfig::from_env()?);
//! let service = AccountService::new(InMemoryAccountRepository::new(), CredentialStore::new(), tokens);
//!
//! let session = service
//!     .signup(SignupRequest {
//!         email: "ann@example.com".into(),
//!         password: "Abcdef12".into(),
//!         full_name: "Ann".into(),
//!     })
//!     .await?;
//!
//! let header = format!("Bearer {}", session.token.token);
//! let caller = service.resolver().resolve_header(Some(&header), chrono::Utc::now()).await?;
//! let profile = service.profile(Some(&caller))?;
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod error;
pub mod models;
pub mod policy;
pub mod postgres;
pub mod provisioning;
pub mod repository;
pub mod resolver;
pub mod secret;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use credentials::{CredentialStore, PasswordPolicy};
pub use error::{AccountError, AccountResult, ErrorBody, ForbiddenReason, TokenError};
pub use models::{
    Account, AccountResponse, AccountStatus, AuthResponse, AuthSession, ChangePasswordRequest,
    LoginRequest, NewAccount, ProfilePatch, Role, SignupRequest, StatusChange,
};
pub use policy::{Policy, enforce};
pub use postgres::PostgresAccountRepository;
pub use provisioning::{AdminSpec, provision_admin};
pub use repository::{AccountRepository, InMemoryAccountRepository};
pub use resolver::{IdentityResolver, bearer_token};
pub use service::AccountService;
pub use token::{Claims, IssuedToken, TokenConfig, TokenService};
