//! Opening the account database: pool setup, retrying connects, a health
//! check, and mapping sqlx errors onto [`PersistenceError`].

use std::time::Duration;
use tracing::warn;

use crate::error::PersistenceError;

#[cfg(feature = "sqlite")]
use crate::config::DatabaseConfig;
#[cfg(feature = "sqlite")]
use sqlx::SqlitePool;
#[cfg(feature = "sqlite")]
use tracing::info;

/// Prefix SQLite puts in front of the offending columns of a unique violation
#[cfg(feature = "sqlite")]
const SQLITE_UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";

/// Open a pool for `config.url`
///
/// In-memory databases are private to a single connection, so the pool is
/// pinned to one long-lived connection for those URLs.
#[cfg(feature = "sqlite")]
pub async fn establish_sqlite_pool(config: &DatabaseConfig) -> Result<SqlitePool, PersistenceError> {
    use sqlx::sqlite::SqlitePoolOptions;

    let options = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(config.idle_timeout())
    };

    let pool = options
        .acquire_timeout(config.connect_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| PersistenceError::ConnectionFailed {
            source: Box::new(e),
        })?;

    info!(
        "Opened SQLite pool for {} ({} connections max)",
        config.url,
        pool.options().get_max_connections()
    );

    Ok(pool)
}

/// Longest pause between two connection attempts
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Run `connect` until it succeeds, retrying up to `retries` more times
///
/// The pause starts at `first_delay` and doubles after each failure, capped
/// at one minute. The error of the final attempt is returned.
pub async fn connect_with_retry<F, Fut, T>(
    mut connect: F,
    retries: u32,
    first_delay: Duration,
) -> Result<T, PersistenceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, PersistenceError>>,
{
    let mut delay = first_delay;
    let mut attempt = 1;

    loop {
        match connect().await {
            Ok(connection) => return Ok(connection),
            Err(err) if attempt > retries => return Err(err),
            Err(err) => {
                warn!(
                    "Database connection attempt {} of {} failed ({}), next try in {:?}",
                    attempt,
                    retries + 1,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
                attempt += 1;
            }
        }
    }
}

/// Acquire a connection and run a trivial statement on it
#[cfg(feature = "sqlite")]
pub async fn check_sqlite_health(pool: &SqlitePool) -> Result<(), PersistenceError> {
    let mut connection = pool
        .acquire()
        .await
        .map_err(|e| PersistenceError::ConnectionFailed {
            source: Box::new(e),
        })?;

    sqlx::query("SELECT 1")
        .execute(&mut *connection)
        .await
        .map_err(|e| PersistenceError::query_failed("SELECT 1", e))?;

    Ok(())
}

/// Translate a driver error, surfacing unique violations as
/// [`PersistenceError::ConstraintViolation`] named after the offending column
#[cfg(feature = "sqlite")]
pub fn map_sqlx_error(query: &str, err: sqlx::Error) -> PersistenceError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();
        if db_err.is_unique_violation() || message.starts_with(SQLITE_UNIQUE_PREFIX) {
            let constraint = db_err
                .constraint()
                .map(str::to_string)
                .or_else(|| {
                    message
                        .strip_prefix(SQLITE_UNIQUE_PREFIX)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| message.to_string());
            return PersistenceError::ConstraintViolation { constraint };
        }
    }

    PersistenceError::query_failed(query, err)
}
