//! Errors raised by the catalog's PostgreSQL plumbing

use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The pool could not open a connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A bundled schema migration failed or diverged from the applied history
    #[error("Database migration error: {0}")]
    Migration(#[from] MigrateError),

    /// `DATABASE_*` settings are missing or malformed
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Whether retrying later could succeed without changing configuration.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Connection(_) | DatabaseError::Query(SqlxError::PoolTimedOut)
        )
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
