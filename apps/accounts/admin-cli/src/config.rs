//! Configuration for the admin CLI

use core_config::database::DatabaseConfig;
use core_config::{ConfigError, Environment, FromEnv, env_required};
use sea_orm::ConnectOptions;

/// Environment variable holding the password for `create-admin`
pub const ADMIN_PASSWORD_VAR: &str = "ACCOUNTS_ADMIN_PASSWORD";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database: DatabaseConfig,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            database: DatabaseConfig::from_env()?,
        })
    }
}

impl Config {
    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.database.url.clone());
        options
            .max_connections(self.database.max_connections)
            .sqlx_logging(false);
        options
    }
}

/// Read the admin password from the environment, never from argv
pub fn admin_password() -> Result<String, ConfigError> {
    env_required(ADMIN_PASSWORD_VAR)
}
