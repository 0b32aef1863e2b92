use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DbBackend, DbErr, FromQueryResult, SqlErr, Statement};
use uuid::Uuid;

use crate::error::{AccountError, AccountResult};
use crate::models::{Account, AccountStatus, NewAccount, normalize_email};
use crate::repository::AccountRepository;

const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, full_name, role, status, created_at, updated_at, last_login";

/// PostgreSQL implementation of AccountRepository using SeaORM.
///
/// Relies on the unique index on `lower(email)` from
/// `manifests/migrations/accounts`. Every write is a single statement that
/// sets only its own columns.
#[derive(Clone)]
pub struct PostgresAccountRepository {
    db: sea_orm::DatabaseConnection,
}

impl PostgresAccountRepository {
    pub fn new(db: sea_orm::DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Helper struct for deserializing account rows from the database
#[derive(Debug, FromQueryResult)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    full_name: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AccountError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(AccountError::StoreFailure)?;
        let status = row.status.parse().map_err(AccountError::StoreFailure)?;

        Ok(Account {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            role,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login: row.last_login,
        })
    }
}

/// Map a write error; a unique index violation on an email write becomes
/// DuplicateEmail
fn map_write_err(err: DbErr, email: Option<&str>) -> AccountError {
    match (err.sql_err(), email) {
        (Some(SqlErr::UniqueConstraintViolation(_)), Some(email)) => {
            AccountError::DuplicateEmail(email.to_string())
        }
        _ => {
            tracing::error!(error = %err, "Account write failed");
            AccountError::StoreFailure(format!("Database error: {}", err))
        }
    }
}

impl PostgresAccountRepository {
    async fn fetch_one(&self, stmt: Statement) -> AccountResult<Option<Account>> {
        let row = AccountRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Account query failed");
                AccountError::StoreFailure(format!("Database error: {}", e))
            })?;

        row.map(Account::try_from).transpose()
    }

    /// Run a single-row `UPDATE ... RETURNING`; no row means the account is gone
    async fn update_one(
        &self,
        id: Uuid,
        set: &str,
        values: Vec<sea_orm::Value>,
        email: Option<&str>,
    ) -> AccountResult<Account> {
        let sql = format!(
            "UPDATE accounts SET {}, updated_at = $2 WHERE id = $1 RETURNING {}",
            set, ACCOUNT_COLUMNS
        );

        let mut params: Vec<sea_orm::Value> = vec![id.into(), Utc::now().into()];
        params.extend(values);
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, params);

        let row = AccountRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| map_write_err(e, email))?
            .ok_or(AccountError::NotFound(id))?;

        let account = Account::try_from(row)?;
        tracing::debug!(account_id = %account.id, "Updated account");
        Ok(account)
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_email(&self, email: &str) -> AccountResult<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE lower(email) = $1",
            ACCOUNT_COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [normalize_email(email).into()],
        );

        self.fetch_one(stmt).await
    }

    async fn find_by_id(&self, id: Uuid) -> AccountResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        self.fetch_one(stmt).await
    }

    async fn insert(&self, account: NewAccount) -> AccountResult<Account> {
        let sql = format!(
            r#"
            INSERT INTO accounts (id, email, password_hash, full_name, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let email = normalize_email(&account.email);
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                Uuid::now_v7().into(),
                email.clone().into(),
                account.password_hash.into(),
                account.full_name.into(),
                account.role.to_string().into(),
                account.status.to_string().into(),
                Utc::now().into(),
            ],
        );

        let row = AccountRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| map_write_err(e, Some(&email)))?
            .ok_or_else(|| AccountError::StoreFailure("Insert returned no row".to_string()))?;

        let account = Account::try_from(row)?;
        tracing::info!(account_id = %account.id, "Inserted account");
        Ok(account)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<String>,
        email: Option<String>,
    ) -> AccountResult<Account> {
        let email = email.map(|e| normalize_email(&e));

        self.update_one(
            id,
            "full_name = COALESCE($3, full_name), email = COALESCE($4, email)",
            vec![full_name.into(), email.clone().into()],
            email.as_deref(),
        )
        .await
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> AccountResult<Account> {
        self.update_one(id, "password_hash = $3", vec![password_hash.into()], None).await
    }

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> AccountResult<Account> {
        self.update_one(id, "status = $3", vec![status.to_string().into()], None).await
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AccountResult<Account> {
        self.update_one(id, "last_login = $3", vec![at.into()], None).await
    }
}
