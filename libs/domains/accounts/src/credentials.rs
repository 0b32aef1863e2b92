//! Password hashing, verification and strength policy.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AccountError, AccountResult};

/// Salted, adaptive one-way hashing of passwords (Argon2id, PHC string output)
#[derive(Clone, Default)]
pub struct CredentialStore {
    argon2: Argon2<'static>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit Argon2id cost parameters (memory KiB, iterations, lanes)
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> AccountResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| AccountError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> AccountResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!(error = %e, "Password hashing failed");
                AccountError::Internal(format!("Password hashing failed: {}", e))
            })
    }

    /// Check a plaintext password against a stored credential.
    ///
    /// Returns false for a mismatch and for a credential that does not parse.
    pub fn verify(&self, plaintext: &str, credential: &str) -> bool {
        let parsed = match PasswordHash::new(credential) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored credential is not a valid PHC string");
                return false;
            }
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Password strength rules applied on signup and password change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
        }
    }
}

impl PasswordPolicy {
    pub fn validate(&self, password: &str) -> AccountResult<()> {
        if password.chars().count() < self.min_length {
            return Err(AccountError::WeakPassword(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }

        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(AccountError::WeakPassword(
                "Password must contain at least one uppercase letter".to_string(),
            ));
        }

        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(AccountError::WeakPassword(
                "Password must contain at least one lowercase letter".to_string(),
            ));
        }

        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AccountError::WeakPassword(
                "Password must contain at least one digit".to_string(),
            ));
        }

        Ok(())
    }
}
