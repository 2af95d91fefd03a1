use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::db::errors::{DatabaseError, Result};
use crate::db::read_ops;
use crate::models::{
    NewShare, ShareRequestRecord, ShareRequestRow, ShareStatus, ShareStatusRecord,
    ShareStatusRow, ShareUpdate,
};

/// Insert a share row
pub async fn insert_share(
    tx: &mut Transaction<'_, Postgres>,
    share: &NewShare,
) -> Result<ShareRequestRecord> {
    debug!("Inserting {} share for user {}", share.credential_type, share.user_id);

    let row = sqlx::query_as::<_, ShareRequestRow>(
        r#"
        INSERT INTO share_requests (
            user_id, credential_type, recipient_name, recipient_email,
            institution_id, institution_name, issued_to, presigned_url,
            fingerprint, share_token, token_expires_at, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
        RETURNING
            id, user_id, credential_type, recipient_name, recipient_email,
            institution_id, institution_name, issued_to, presigned_url,
            fingerprint, share_token, token_expires_at, created_at
        "#,
    )
    .bind(share.user_id)
    .bind(share.credential_type.as_str())
    .bind(&share.recipient_name)
    .bind(&share.recipient_email)
    .bind(share.institution_id)
    .bind(&share.institution_name)
    .bind(&share.issued_to)
    .bind(&share.presigned_url)
    .bind(&share.fingerprint)
    .bind(share.share_token)
    .bind(share.token_expires_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(DatabaseError::QueryError)?;

    let record = ShareRequestRecord::try_from(row)?;
    info!(share_id = record.id, "Inserted share");
    Ok(record)
}

/// Create or overwrite the single status row of a share
pub async fn upsert_status(
    tx: &mut Transaction<'_, Postgres>,
    share_id: i64,
    status: ShareStatus,
    detail: Option<&str>,
) -> Result<ShareStatusRecord> {
    let row = sqlx::query_as::<_, ShareStatusRow>(
        r#"
        INSERT INTO share_status (share_id, status, detail, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (share_id)
        DO UPDATE SET
            status = EXCLUDED.status,
            detail = EXCLUDED.detail,
            updated_at = EXCLUDED.updated_at
        RETURNING id, share_id, status, detail, updated_at
        "#,
    )
    .bind(share_id)
    .bind(status.as_str())
    .bind(detail)
    .fetch_one(&mut **tx)
    .await
    .map_err(DatabaseError::QueryError)?;

    Ok(ShareStatusRecord::try_from(row)?)
}

/// Share row and its pending status, both or neither
#[tracing::instrument(skip(pool, share), fields(user_id = share.user_id))]
pub async fn create_share_with_status(
    pool: &PgPool,
    share: &NewShare,
) -> Result<(ShareRequestRecord, ShareStatusRecord)> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| DatabaseError::TransactionError(format!("Failed to start transaction: {}", e)))?;

    let record = insert_share(&mut tx, share).await?;
    let status = upsert_status(&mut tx, record.id, ShareStatus::Pending, None).await?;

    tx.commit()
        .await
        .map_err(|e| DatabaseError::TransactionError(format!("Failed to commit transaction: {}", e)))?;

    Ok((record, status))
}

/// Overwrite the delivery fields of a share
#[tracing::instrument(skip(pool, update), fields(share_id = update.id))]
pub async fn update_share(pool: &PgPool, update: &ShareUpdate) -> Result<ShareRequestRecord> {
    let row = sqlx::query_as::<_, ShareRequestRow>(
        r#"
        UPDATE share_requests
        SET recipient_name = $2,
            recipient_email = $3,
            presigned_url = $4
        WHERE id = $1
        RETURNING
            id, user_id, credential_type, recipient_name, recipient_email,
            institution_id, institution_name, issued_to, presigned_url,
            fingerprint, share_token, token_expires_at, created_at
        "#,
    )
    .bind(update.id)
    .bind(&update.recipient_name)
    .bind(&update.recipient_email)
    .bind(&update.presigned_url)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => DatabaseError::NotFound(format!("Share {} not found", update.id)),
        _ => DatabaseError::QueryError(e),
    })?;

    Ok(ShareRequestRecord::try_from(row)?)
}

/// Move a share to `next` only if its stored status allows it.
/// The guard sits in the UPDATE itself so concurrent writers cannot
/// interleave between check and write.
#[tracing::instrument(skip(pool, detail))]
pub async fn transition_status(
    pool: &PgPool,
    share_id: i64,
    next: ShareStatus,
    detail: Option<&str>,
) -> Result<ShareStatusRecord> {
    let allowed: Vec<&str> = ShareStatus::allowed_predecessors(next)
        .into_iter()
        .map(|status| status.as_str())
        .collect();

    let row = sqlx::query_as::<_, ShareStatusRow>(
        r#"
        UPDATE share_status
        SET status = $2,
            detail = $3,
            updated_at = NOW()
        WHERE share_id = $1
            AND status = ANY($4)
        RETURNING id, share_id, status, detail, updated_at
        "#,
    )
    .bind(share_id)
    .bind(next.as_str())
    .bind(detail)
    .bind(&allowed)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    if let Some(row) = row {
        return Ok(ShareStatusRecord::try_from(row)?);
    }

    // No row moved: either nothing to move or the current status forbids it
    match read_ops::load_status(pool, share_id).await? {
        Some(current) => Err(DatabaseError::Conflict(format!(
            "Share {} cannot move from {} to {}",
            share_id, current.status, next
        ))),
        None => Err(DatabaseError::NotFound(format!("Share {} not found", share_id))),
    }
}
