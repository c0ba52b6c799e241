//! Error type for storage operations.

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid source name {0:?}: expected 1-48 characters of [a-z0-9_]")]
    InvalidSourceName(String),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
