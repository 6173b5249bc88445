use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not configured")]
    NotConfigured,

    #[error("Not found: {0}")]
    NotFound(String),

    #[cfg(feature = "database-sqlite")]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[cfg(feature = "database-sqlite")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;
