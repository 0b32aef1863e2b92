//! Signed, time-bounded bearer tokens (HS256 JWT).

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_config::{ConfigError, Environment, FromEnv, env_optional, env_parse_or};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AccountError, AccountResult, TokenError};
use crate::models::Role;
use crate::secret::{DEFAULT_SECRET_LENGTH, generate_secret};

/// Default token time-to-live in hours
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Shortest signing secret accepted from configuration
pub const MIN_SECRET_LENGTH: usize = 32;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // Subject (account ID)
    pub email: String, // Email at issue time
    pub role: Role,    // Role at issue time
    pub iat: i64,      // Issued at
    pub exp: i64,      // Expiration time
}

/// A freshly signed token and when it stops being valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token signing configuration.
///
/// Loaded from environment variables:
/// - `JWT_SECRET` - required when `APP_ENV=production`, at least 32 characters.
///   Outside production an unset secret is replaced by a random per-process one.
/// - `JWT_EXPIRATION_HOURS` - token lifetime, defaults to 24
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Result<Self, ConfigError> {
        let secret = secret.into();

        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::ParseError {
                key: "JWT_SECRET".to_string(),
                details: format!(
                    "must be at least {} characters for security (got {}). Generate one with: accounts-admin generate-secret",
                    MIN_SECRET_LENGTH,
                    secret.len()
                ),
            });
        }

        if ttl <= Duration::zero() {
            return Err(ConfigError::ParseError {
                key: "JWT_EXPIRATION_HOURS".to_string(),
                details: "must be a positive number of hours".to_string(),
            });
        }

        Ok(Self { secret, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Load for an explicit environment
    pub fn from_env_for(environment: Environment) -> Result<Self, ConfigError> {
        let hours: i64 = env_parse_or("JWT_EXPIRATION_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        let ttl = Duration::try_hours(hours).ok_or_else(|| ConfigError::ParseError {
            key: "JWT_EXPIRATION_HOURS".to_string(),
            details: format!("{} hours is out of range", hours),
        })?;

        let secret = match env_optional("JWT_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()));
            }
            None => {
                tracing::warn!(
                    "JWT_SECRET is not set; using a random secret for this process. Tokens will not survive a restart"
                );
                generate_secret(DEFAULT_SECRET_LENGTH).map_err(|e| ConfigError::ParseError {
                    key: "JWT_SECRET".to_string(),
                    details: e.to_string(),
                })?
            }
        };

        Self::new(secret, ttl)
    }
}

impl FromEnv for TokenConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_for(Environment::from_env())
    }
}

/// Issues and verifies bearer tokens with a process-wide signing key
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        tracing::info!(ttl_hours = config.ttl.num_hours(), "Token service initialized");
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: config.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for the account, valid until `now + ttl`
    pub fn issue(
        &self,
        account_id: Uuid,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> AccountResult<IssuedToken> {
        // Claims carry whole seconds
        let iat = now.timestamp();
        let exp = iat + self.ttl.num_seconds();
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AccountError::Internal("Token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: account_id,
            email: email.to_string(),
            role,
            iat,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to sign token");
                AccountError::Internal(format!("Failed to sign token: {}", e))
            })?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature and expiry against the supplied clock.
    ///
    /// Expiry is evaluated here rather than by the JWT library so `now` is
    /// the only time source.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                TokenError::Malformed
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            tracing::debug!(account_id = %claims.sub, "Token expired");
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}
