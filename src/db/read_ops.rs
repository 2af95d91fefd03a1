use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::db::errors::{DatabaseError, Result};
use crate::models::{
    ShareRequestRecord, ShareRequestRow, ShareStatusRecord, ShareStatusRow, StatusCriteria,
};

const SHARE_COLUMNS: &str = r#"
    id,
    user_id,
    credential_type,
    recipient_name,
    recipient_email,
    institution_id,
    institution_name,
    issued_to,
    presigned_url,
    fingerprint,
    share_token,
    token_expires_at,
    created_at
"#;

/// Load a share by id
#[tracing::instrument(skip(pool))]
pub async fn load_share(pool: &PgPool, share_id: i64) -> Result<Option<ShareRequestRecord>> {
    debug!("Loading share {}", share_id);

    let row = sqlx::query_as::<_, ShareRequestRow>(&format!(
        "SELECT {SHARE_COLUMNS} FROM share_requests WHERE id = $1"
    ))
    .bind(share_id)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    row.map(ShareRequestRecord::try_from)
        .transpose()
        .map_err(DatabaseError::from)
}

/// Most recent share whose artifact fingerprint matches exactly
#[tracing::instrument(skip(pool, fingerprint))]
pub async fn load_share_by_fingerprint(
    pool: &PgPool,
    fingerprint: &str,
) -> Result<Option<ShareRequestRecord>> {
    let row = sqlx::query_as::<_, ShareRequestRow>(&format!(
        r#"
        SELECT {SHARE_COLUMNS}
        FROM share_requests
        WHERE fingerprint = $1
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(fingerprint)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    row.map(ShareRequestRecord::try_from)
        .transpose()
        .map_err(DatabaseError::from)
}

/// Share issued under a given token
#[tracing::instrument(skip(pool, token))]
pub async fn load_share_by_token(pool: &PgPool, token: Uuid) -> Result<Option<ShareRequestRecord>> {
    let row = sqlx::query_as::<_, ShareRequestRow>(&format!(
        "SELECT {SHARE_COLUMNS} FROM share_requests WHERE share_token = $1"
    ))
    .bind(token)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    row.map(ShareRequestRecord::try_from)
        .transpose()
        .map_err(DatabaseError::from)
}

/// Current status row of a share
#[tracing::instrument(skip(pool))]
pub async fn load_status(pool: &PgPool, share_id: i64) -> Result<Option<ShareStatusRecord>> {
    let row = sqlx::query_as::<_, ShareStatusRow>(
        r#"
        SELECT id, share_id, status, detail, updated_at
        FROM share_status
        WHERE share_id = $1
        "#,
    )
    .bind(share_id)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    row.map(ShareStatusRecord::try_from)
        .transpose()
        .map_err(DatabaseError::from)
}

/// Status rows matching the criteria, most recently updated first.
/// A NULL limit returns the whole matching set.
#[tracing::instrument(skip(pool))]
pub async fn query_statuses(
    pool: &PgPool,
    criteria: &StatusCriteria,
) -> Result<Vec<ShareStatusRecord>> {
    let rows = sqlx::query_as::<_, ShareStatusRow>(
        r#"
        SELECT s.id, s.share_id, s.status, s.detail, s.updated_at
        FROM share_status s
        JOIN share_requests r ON r.id = s.share_id
        WHERE ($1::BIGINT IS NULL OR r.institution_id = $1)
            AND ($2::TEXT IS NULL OR s.status = $2)
            AND ($3::TIMESTAMPTZ IS NULL OR s.updated_at >= $3)
            AND ($4::TIMESTAMPTZ IS NULL OR s.updated_at <= $4)
            AND ($5::BIGINT IS NULL OR r.user_id = $5)
        ORDER BY s.updated_at DESC, s.id DESC
        LIMIT $6
        "#,
    )
    .bind(criteria.institution_id)
    .bind(criteria.status.map(|s| s.as_str()))
    .bind(criteria.from)
    .bind(criteria.to)
    .bind(criteria.owner_id)
    .bind(criteria.limit.map(i64::from))
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    debug!("Found {} status rows", rows.len());

    rows.into_iter()
        .map(|row| ShareStatusRecord::try_from(row).map_err(DatabaseError::from))
        .collect()
}
