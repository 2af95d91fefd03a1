use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::connection::{health_check, with_retry};
use crate::db::errors::Result;
use crate::db::{read_ops, write_ops};
use crate::models::{
    NewShare, ShareRequestRecord, ShareStatus, ShareStatusRecord, ShareUpdate, StatusCriteria,
};

const READ_RETRIES: u8 = 3;

/// Persistence boundary of the sharing workflow.
///
/// Share rows and their single status row live behind this trait so the
/// domain layer never touches SQL directly.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Persist a share together with its initial `pending` status
    async fn create_share(&self, share: NewShare) -> Result<(ShareRequestRecord, ShareStatusRecord)>;

    async fn update_share(&self, update: ShareUpdate) -> Result<ShareRequestRecord>;

    async fn get_share(&self, share_id: i64) -> Result<Option<ShareRequestRecord>>;

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ShareRequestRecord>>;

    async fn find_by_token(&self, token: Uuid) -> Result<Option<ShareRequestRecord>>;

    async fn get_status(&self, share_id: i64) -> Result<Option<ShareStatusRecord>>;

    /// Move a share to `next` if its current status allows it.
    ///
    /// The check and the write are one atomic step per share; an illegal
    /// move fails with [`DatabaseError::Conflict`](crate::db::DatabaseError::Conflict)
    /// and leaves the stored status untouched.
    async fn transition_status(
        &self,
        share_id: i64,
        next: ShareStatus,
        detail: Option<String>,
    ) -> Result<ShareStatusRecord>;

    async fn query_statuses(&self, criteria: &StatusCriteria) -> Result<Vec<ShareStatusRecord>>;

    async fn health_check(&self) -> Result<()>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgShareStore {
    pool: PgPool,
}

impl PgShareStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareStore for PgShareStore {
    async fn create_share(&self, share: NewShare) -> Result<(ShareRequestRecord, ShareStatusRecord)> {
        write_ops::create_share_with_status(&self.pool, &share).await
    }

    async fn update_share(&self, update: ShareUpdate) -> Result<ShareRequestRecord> {
        write_ops::update_share(&self.pool, &update).await
    }

    async fn get_share(&self, share_id: i64) -> Result<Option<ShareRequestRecord>> {
        with_retry(READ_RETRIES, || read_ops::load_share(&self.pool, share_id)).await
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ShareRequestRecord>> {
        with_retry(READ_RETRIES, || {
            read_ops::load_share_by_fingerprint(&self.pool, fingerprint)
        })
        .await
    }

    async fn find_by_token(&self, token: Uuid) -> Result<Option<ShareRequestRecord>> {
        with_retry(READ_RETRIES, || read_ops::load_share_by_token(&self.pool, token)).await
    }

    async fn get_status(&self, share_id: i64) -> Result<Option<ShareStatusRecord>> {
        with_retry(READ_RETRIES, || read_ops::load_status(&self.pool, share_id)).await
    }

    async fn transition_status(
        &self,
        share_id: i64,
        next: ShareStatus,
        detail: Option<String>,
    ) -> Result<ShareStatusRecord> {
        write_ops::transition_status(&self.pool, share_id, next, detail.as_deref()).await
    }

    async fn query_statuses(&self, criteria: &StatusCriteria) -> Result<Vec<ShareStatusRecord>> {
        with_retry(READ_RETRIES, || read_ops::query_statuses(&self.pool, criteria)).await
    }

    async fn health_check(&self) -> Result<()> {
        health_check(&self.pool).await
    }
}
