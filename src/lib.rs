pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod models;

// Re-export commonly used types
pub use models::{
    CredentialType, Principal, Role, ShareRequest, ShareRequestRecord, ShareStatus,
    ShareStatusRecord, StatusCriteria, VerificationResult,
};

pub use db::{DatabaseError, MemoryShareStore, PgShareStore, ShareStore};

pub use domain::{DomainError, ShareSettings};

pub use config::AppConfig;
