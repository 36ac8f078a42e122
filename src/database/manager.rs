use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config;

/// SQLSTATE for `invalid_text_representation` (e.g. malformed JSON for a jsonb column).
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";
/// SQLSTATE for `not_null_violation`.
const NOT_NULL_VIOLATION: &str = "23502";

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    /// Statement rejected because a value could not be parsed into its column type.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A column constraint (check / not-null) rejected the row.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(INVALID_TEXT_REPRESENTATION) => {
                    return DatabaseError::InvalidInput(db_err.message().to_string());
                }
                Some(UNIQUE_VIOLATION) => {
                    return DatabaseError::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or_default().to_string(),
                    };
                }
                Some(CHECK_VIOLATION) | Some(NOT_NULL_VIOLATION) => {
                    return DatabaseError::ConstraintViolation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        DatabaseError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationError(err.to_string())
    }
}

/// Process-wide owner of the connection pool. Every entity access module
/// goes through `DatabaseManager::pool()`.
pub struct DatabaseManager {
    pool: PgPool,
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

impl DatabaseManager {
    fn instance() -> Result<&'static DatabaseManager, DatabaseError> {
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        if let Some(manager) = INSTANCE.get() {
            return Ok(manager);
        }

        let pool = Self::build_pool()?;
        Ok(INSTANCE.get_or_init(|| DatabaseManager { pool }))
    }

    /// Connections are opened on first use, so the server can start and
    /// answer unauthenticated requests while the database is unreachable.
    fn build_pool() -> Result<PgPool, DatabaseError> {
        let db_config = &config::config().database;
        url::Url::parse(&db_config.url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(Duration::from_secs(db_config.connection_timeout))
            .connect_lazy(&db_config.url)?;

        info!(
            "Created database pool (max_connections={})",
            db_config.max_connections
        );
        Ok(pool)
    }

    /// Shared pool handle
    pub fn pool() -> Result<PgPool, DatabaseError> {
        Ok(Self::instance()?.pool.clone())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::pool()?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Apply embedded schema migrations
    pub async fn migrate() -> Result<(), DatabaseError> {
        let pool = Self::pool()?;
        MIGRATOR.run(&pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close() {
        if let Ok(manager) = Self::instance() {
            manager.pool.close().await;
            info!("Closed database pool");
        }
    }
}

/// Log a failed statement and hand the error back unchanged.
pub(crate) fn log_query_error(context: &str, err: sqlx::Error) -> DatabaseError {
    tracing::error!("Database query error ({}): {}", context, err);
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrelated_sqlx_errors_stay_opaque() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DatabaseError::Sqlx(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn migration_errors_are_typed() {
        let err: DatabaseError = sqlx::migrate::MigrateError::VersionMissing(3).into();
        assert!(matches!(err, DatabaseError::MigrationError(_)));
    }
}
