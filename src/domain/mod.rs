// Domain layer - sharing workflow logic with no HTTP concerns
// Every operation takes the acting principal and the store explicitly

pub mod fingerprint;
pub mod shares;
pub mod status;
pub mod verification;

use crate::auth::AccessDenied;
use crate::db::DatabaseError;

// Domain error type - no HTTP concerns
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DatabaseError> for DomainError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(msg) => DomainError::NotFound(msg),
            DatabaseError::Conflict(msg) => DomainError::Conflict(msg),
            DatabaseError::InvalidData(msg) => DomainError::Internal(msg),
            _ => DomainError::Database(e.to_string()),
        }
    }
}

impl From<AccessDenied> for DomainError {
    fn from(e: AccessDenied) -> Self {
        DomainError::Forbidden(e.0)
    }
}

// Re-export commonly used types and functions
pub use shares::{create_share, get_share, update_share, ShareSettings};
pub use status::{get_status, query_by_criteria, record_status};
pub use verification::{verify_artifact, verify_by_token, verify_upload};
