use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// share_requests table
#[derive(Debug, Clone, FromRow)]
pub struct ShareRequestRow {
    pub id: i64,
    pub user_id: i64,
    pub credential_type: String,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub institution_id: Option<i64>,
    pub institution_name: Option<String>,
    pub issued_to: Option<String>,
    pub presigned_url: Option<String>,
    pub fingerprint: Option<String>,
    pub share_token: Uuid,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// share_status table
#[derive(Debug, Clone, FromRow)]
pub struct ShareStatusRow {
    pub id: i64,
    pub share_id: i64,
    pub status: String,
    pub detail: Option<String>,
    pub updated_at: DateTime<Utc>,
}
