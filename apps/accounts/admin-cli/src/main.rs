//! Accounts Admin CLI
//!
//! Operator tooling that sits outside the request path: generating signing
//! secrets and provisioning administrator accounts.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_accounts::secret::{DEFAULT_SECRET_LENGTH, generate_secret};
use domain_accounts::{
    AccountError, AdminSpec, CredentialStore, PasswordPolicy, PostgresAccountRepository,
    provision_admin,
};
use eyre::{Result, WrapErr};
use tracing::info;

mod config;

use config::{ADMIN_PASSWORD_VAR, Config, admin_password};

#[derive(Parser)]
#[command(name = "accounts-admin")]
#[command(about = "Operator tooling for the accounts service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print high-entropy secrets suitable for JWT_SECRET
    GenerateSecret {
        /// Characters per secret (minimum 32)
        #[arg(short, long, default_value_t = DEFAULT_SECRET_LENGTH)]
        length: usize,

        /// Number of secrets to print
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },

    /// Create an active admin account (password read from ACCOUNTS_ADMIN_PASSWORD)
    CreateAdmin {
        #[arg(short, long)]
        email: String,

        #[arg(short = 'n', long)]
        full_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();

    match cli.command {
        Commands::GenerateSecret { length, count } => {
            for _ in 0..count {
                println!("{}", generate_secret(length)?);
            }
            eprintln!("Store these securely and use a different secret per environment.");
        }

        Commands::CreateAdmin { email, full_name } => {
            let config = Config::from_env()?;
            let password = admin_password()
                .wrap_err_with(|| format!("{} must hold the new admin's password", ADMIN_PASSWORD_VAR))?;

            info!("Connecting to database...");
            let db = sea_orm::Database::connect(config.connect_options())
                .await
                .wrap_err("Database connection failed")?;
            let repository = PostgresAccountRepository::new(db);

            let spec = AdminSpec {
                email,
                full_name,
                password,
            };

            match provision_admin(
                &repository,
                &CredentialStore::new(),
                &PasswordPolicy::default(),
                spec,
            )
            .await
            {
                Ok(admin) => {
                    println!("Admin account created");
                    println!("  id:     {}", admin.id);
                    println!("  email:  {}", admin.email);
                    println!("  role:   {}", admin.role);
                    println!("  status: {}", admin.status);
                }
                Err(AccountError::DuplicateEmail(email)) => {
                    eyre::bail!("An account with email '{}' already exists; nothing changed", email);
                }
                Err(e) => return Err(e).wrap_err("Failed to provision admin"),
            }
        }
    }

    Ok(())
}
