use crate::{env_parse_or, env_required, ConfigError, FromEnv};

/// Database configuration for the accounts store
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            max_connections: 10,
        }
    }
}

impl FromEnv for DatabaseConfig {
    /// Requires DATABASE_URL to be set (no default).
    /// DATABASE_MAX_CONNECTIONS defaults to 10.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
        })
    }
}
