use thiserror::Error;

use crate::models::UnknownVariant;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Query execution error: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Retry limit exceeded after {attempts} attempts")]
    RetryLimitExceeded { attempts: u8 },
}

impl From<UnknownVariant> for DatabaseError {
    fn from(err: UnknownVariant) -> Self {
        DatabaseError::InvalidData(err.to_string())
    }
}

impl DatabaseError {
    /// Check if this error is transient and the operation can be attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::QueryError(sqlx::Error::PoolTimedOut) => true,
            Self::QueryError(sqlx::Error::Io(_)) => true,
            Self::QueryError(e) => {
                if let Some(db_error) = e.as_database_error() {
                    matches!(db_error.code().as_deref(),
                        Some("40001") | // serialization_failure
                        Some("40P01")   // deadlock_detected
                    )
                } else {
                    false
                }
            }
            Self::ConnectionError(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
