//! # Account Repository
//!
//! SQLite storage for user accounts. The `users` table carries hard
//! uniqueness constraints on both identifier columns, which settle any race
//! the allocator's existence checks cannot see.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use common::config::DatabaseConfig;
use common::error::PersistenceError;
use common::persistence::{
    check_sqlite_health, connect_with_retry, establish_sqlite_pool, map_sqlx_error,
};
use common::user_identity::{IdentifierPair, IdentityLookup, NumericId, UUID_STRING_LENGTH};

use crate::accounts::model::{Account, NewAccount};

/// Storage operations the account service needs beyond identifier lookup
#[async_trait]
pub trait AccountStore: IdentityLookup {
    /// Insert a validated account under an allocated identifier pair
    ///
    /// A uniqueness failure is reported as
    /// [`PersistenceError::ConstraintViolation`] naming the column.
    async fn insert_account(
        &self,
        identifiers: &IdentifierPair,
        account: &NewAccount,
    ) -> Result<Account, PersistenceError>;

    async fn find_by_numeric_id(&self, id: NumericId) -> Result<Option<Account>, PersistenceError>;

    async fn find_by_uuid(&self, uuid: &Uuid) -> Result<Option<Account>, PersistenceError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, PersistenceError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, PersistenceError>;

    /// Every account, oldest first
    async fn list(&self) -> Result<Vec<Account>, PersistenceError>;

    /// Overwrite the profile fields of the account with `id`
    ///
    /// `user_id` and `uuid_string` are never written. An unknown id is
    /// [`PersistenceError::NotFound`]; a taken username or email is a
    /// [`PersistenceError::ConstraintViolation`].
    async fn update_account(
        &self,
        id: NumericId,
        profile: &NewAccount,
    ) -> Result<Account, PersistenceError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, PersistenceError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, PersistenceError>;

    /// Returns whether a row was removed
    async fn delete_by_numeric_id(&self, id: NumericId) -> Result<bool, PersistenceError>;

    /// Returns whether a row was removed
    async fn delete_by_uuid(&self, uuid: &Uuid) -> Result<bool, PersistenceError>;

    async fn count(&self) -> Result<u64, PersistenceError>;
}

/// Extra connection attempts before startup gives up
const CONNECT_RETRIES: u32 = 3;

const SELECT_ACCOUNT: &str = "SELECT user_id, uuid_string, username, email, goal_type, \
     initial_avatar_type, created_at, updated_at FROM users";

#[derive(Debug, FromRow)]
struct AccountRow {
    user_id: i64,
    uuid_string: String,
    username: String,
    email: String,
    goal_type: Option<String>,
    initial_avatar_type: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = PersistenceError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let numeric_id =
            NumericId::try_from(row.user_id).map_err(|e| PersistenceError::DataCorruption {
                location: format!("users.user_id = {}", row.user_id),
                details: e.to_string(),
            })?;
        let uuid = parse_stored_uuid(&row.uuid_string)?;

        Ok(Account {
            identifiers: IdentifierPair::from_parts(uuid, numeric_id),
            username: row.username,
            email: row.email,
            goal_type: row.goal_type,
            initial_avatar_type: row.initial_avatar_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_stored_uuid(text: &str) -> Result<Uuid, PersistenceError> {
    Uuid::parse_str(text).map_err(|e| PersistenceError::DataCorruption {
        location: format!("users.uuid_string = {text}"),
        details: e.to_string(),
    })
}

fn uuid_column(uuid: &Uuid) -> String {
    uuid.hyphenated().to_string()
}

/// SQLite-backed account store
#[derive(Debug, Clone)]
pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    /// Connect and, if configured, create the schema
    pub async fn new(config: &DatabaseConfig) -> Result<Self, PersistenceError> {
        info!("Creating account store client");

        let pool = connect_with_retry(
            || establish_sqlite_pool(config),
            CONNECT_RETRIES,
            Duration::from_millis(500),
        )
        .await?;
        check_sqlite_health(&pool).await?;

        let store = Self { pool };

        if config.run_migrations {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    /// Wrap an existing pool without touching the schema
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the users table and its indices
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        info!("Running account store migrations...");

        let create_users = format!(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                uuid_string TEXT NOT NULL UNIQUE CHECK (length(uuid_string) = {UUID_STRING_LENGTH}),
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                goal_type TEXT,
                initial_avatar_type TEXT,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            )
            "#
        );

        sqlx::query(&create_users)
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::MigrationFailed {
                details: format!("Failed to create users table: {e}"),
            })?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::MigrationFailed {
                details: format!("Failed to create users index: {e}"),
            })?;

        info!("Account store migrations completed");
        Ok(())
    }
}

#[async_trait]
impl IdentityLookup for SqliteAccountStore {
    async fn exists_by_numeric_id(&self, id: NumericId) -> Result<bool, PersistenceError> {
        let query = "SELECT COUNT(*) FROM users WHERE user_id = ?";
        let count: i64 = sqlx::query_scalar(query)
            .bind(id.as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;
        Ok(count > 0)
    }

    async fn exists_by_uuid(&self, uuid: &Uuid) -> Result<bool, PersistenceError> {
        let query = "SELECT COUNT(*) FROM users WHERE uuid_string = ?";
        let count: i64 = sqlx::query_scalar(query)
            .bind(uuid_column(uuid))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;
        Ok(count > 0)
    }

    async fn find_numeric_id_by_uuid(
        &self,
        uuid: &Uuid,
    ) -> Result<Option<NumericId>, PersistenceError> {
        let query = "SELECT user_id FROM users WHERE uuid_string = ?";
        let user_id: Option<i64> = sqlx::query_scalar(query)
            .bind(uuid_column(uuid))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;

        user_id
            .map(|value| {
                NumericId::try_from(value).map_err(|e| PersistenceError::DataCorruption {
                    location: format!("users.user_id = {value}"),
                    details: e.to_string(),
                })
            })
            .transpose()
    }

    async fn find_uuid_by_numeric_id(
        &self,
        id: NumericId,
    ) -> Result<Option<Uuid>, PersistenceError> {
        let query = "SELECT uuid_string FROM users WHERE user_id = ?";
        let uuid_string: Option<String> = sqlx::query_scalar(query)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;

        uuid_string.as_deref().map(parse_stored_uuid).transpose()
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn insert_account(
        &self,
        identifiers: &IdentifierPair,
        account: &NewAccount,
    ) -> Result<Account, PersistenceError> {
        let query = r#"
            INSERT INTO users (
                user_id, uuid_string, username, email, goal_type,
                initial_avatar_type, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();

        sqlx::query(query)
            .bind(identifiers.numeric_id().as_i64())
            .bind(identifiers.uuid_string())
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.goal_type)
            .bind(&account.initial_avatar_type)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("INSERT INTO users", e))?;

        debug!(
            "Inserted account {} for username {}",
            identifiers, account.username
        );

        Ok(Account {
            identifiers: *identifiers,
            username: account.username.clone(),
            email: account.email.clone(),
            goal_type: account.goal_type.clone(),
            initial_avatar_type: account.initial_avatar_type.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_numeric_id(&self, id: NumericId) -> Result<Option<Account>, PersistenceError> {
        let query = format!("{SELECT_ACCOUNT} WHERE user_id = ?");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(&query, e))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_uuid(&self, uuid: &Uuid) -> Result<Option<Account>, PersistenceError> {
        let query = format!("{SELECT_ACCOUNT} WHERE uuid_string = ?");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(uuid_column(uuid))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(&query, e))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, PersistenceError> {
        let query = format!("{SELECT_ACCOUNT} WHERE username = ?");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(&query, e))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, PersistenceError> {
        let query = format!("{SELECT_ACCOUNT} WHERE email = ?");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(&query, e))?;

        row.map(Account::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Account>, PersistenceError> {
        let query = format!("{SELECT_ACCOUNT} ORDER BY created_at, user_id");
        let rows = sqlx::query_as::<_, AccountRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(&query, e))?;

        rows.into_iter().map(Account::try_from).collect()
    }

    async fn update_account(
        &self,
        id: NumericId,
        profile: &NewAccount,
    ) -> Result<Account, PersistenceError> {
        let query = r#"
            UPDATE users
            SET username = ?, email = ?, goal_type = ?, initial_avatar_type = ?, updated_at = ?
            WHERE user_id = ?
        "#;

        let result = sqlx::query(query)
            .bind(&profile.username)
            .bind(&profile.email)
            .bind(&profile.goal_type)
            .bind(&profile.initial_avatar_type)
            .bind(Utc::now())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("UPDATE users", e))?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound {
                details: format!("users.user_id = {id}"),
            });
        }
        debug!("Updated profile of account {}", id);

        self.find_by_numeric_id(id)
            .await?
            .ok_or_else(|| PersistenceError::NotFound {
                details: format!("users.user_id = {id}"),
            })
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, PersistenceError> {
        let query = "SELECT COUNT(*) FROM users WHERE username = ?";
        let count: i64 = sqlx::query_scalar(query)
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;
        Ok(count > 0)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, PersistenceError> {
        let query = "SELECT COUNT(*) FROM users WHERE email = ?";
        let count: i64 = sqlx::query_scalar(query)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;
        Ok(count > 0)
    }

    async fn delete_by_numeric_id(&self, id: NumericId) -> Result<bool, PersistenceError> {
        let query = "DELETE FROM users WHERE user_id = ?";
        let result = sqlx::query(query)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_uuid(&self, uuid: &Uuid) -> Result<bool, PersistenceError> {
        let query = "DELETE FROM users WHERE uuid_string = ?";
        let result = sqlx::query(query)
            .bind(uuid_column(uuid))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, PersistenceError> {
        let query = "SELECT COUNT(*) FROM users";
        let count: i64 = sqlx::query_scalar(query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(query, e))?;
        Ok(count.max(0) as u64)
    }
}
