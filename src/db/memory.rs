use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::errors::{DatabaseError, Result};
use crate::db::store::ShareStore;
use crate::models::{
    NewShare, ShareRequestRecord, ShareStatus, ShareStatusRecord, ShareUpdate, StatusCriteria,
};

#[derive(Default)]
struct MemoryState {
    shares: BTreeMap<i64, ShareRequestRecord>,
    /// Keyed by share id; one row per share
    statuses: HashMap<i64, ShareStatusRecord>,
    next_share_id: i64,
    next_status_id: i64,
}

impl MemoryState {
    fn allocate_share_id(&mut self) -> i64 {
        self.next_share_id += 1;
        self.next_share_id
    }

    fn allocate_status_id(&mut self) -> i64 {
        self.next_status_id += 1;
        self.next_status_id
    }
}

/// In-process store for tests and database-less local runs
#[derive(Default)]
pub struct MemoryShareStore {
    state: RwLock<MemoryState>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn create_share(&self, share: NewShare) -> Result<(ShareRequestRecord, ShareStatusRecord)> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let record = ShareRequestRecord {
            id: state.allocate_share_id(),
            user_id: share.user_id,
            credential_type: share.credential_type,
            recipient_name: share.recipient_name,
            recipient_email: share.recipient_email,
            institution_id: share.institution_id,
            institution_name: share.institution_name,
            issued_to: share.issued_to,
            presigned_url: share.presigned_url,
            fingerprint: share.fingerprint,
            share_token: share.share_token,
            token_expires_at: share.token_expires_at,
            created_at: now,
        };
        let status = ShareStatusRecord {
            id: state.allocate_status_id(),
            share_id: record.id,
            status: ShareStatus::Pending,
            updated_at: now,
            detail: None,
        };

        state.shares.insert(record.id, record.clone());
        state.statuses.insert(record.id, status.clone());
        Ok((record, status))
    }

    async fn update_share(&self, update: ShareUpdate) -> Result<ShareRequestRecord> {
        let mut state = self.state.write().await;
        let record = state
            .shares
            .get_mut(&update.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Share {} not found", update.id)))?;

        record.recipient_name = update.recipient_name;
        record.recipient_email = update.recipient_email;
        record.presigned_url = update.presigned_url;
        Ok(record.clone())
    }

    async fn get_share(&self, share_id: i64) -> Result<Option<ShareRequestRecord>> {
        Ok(self.state.read().await.shares.get(&share_id).cloned())
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ShareRequestRecord>> {
        let state = self.state.read().await;
        Ok(state
            .shares
            .values()
            .filter(|share| share.fingerprint.as_deref() == Some(fingerprint))
            .max_by_key(|share| (share.created_at, share.id))
            .cloned())
    }

    async fn find_by_token(&self, token: Uuid) -> Result<Option<ShareRequestRecord>> {
        let state = self.state.read().await;
        Ok(state
            .shares
            .values()
            .find(|share| share.share_token == token)
            .cloned())
    }

    async fn get_status(&self, share_id: i64) -> Result<Option<ShareStatusRecord>> {
        Ok(self.state.read().await.statuses.get(&share_id).cloned())
    }

    async fn transition_status(
        &self,
        share_id: i64,
        next: ShareStatus,
        detail: Option<String>,
    ) -> Result<ShareStatusRecord> {
        // Check and write under one guard
        let mut state = self.state.write().await;
        if !state.shares.contains_key(&share_id) {
            return Err(DatabaseError::NotFound(format!("Share {} not found", share_id)));
        }

        let id = match state.statuses.get(&share_id) {
            Some(existing) if !existing.status.can_transition_to(next) => {
                return Err(DatabaseError::Conflict(format!(
                    "Share {} cannot move from {} to {}",
                    share_id, existing.status, next
                )));
            }
            Some(existing) => existing.id,
            None => state.allocate_status_id(),
        };
        let record = ShareStatusRecord {
            id,
            share_id,
            status: next,
            updated_at: Utc::now(),
            detail,
        };
        state.statuses.insert(share_id, record.clone());
        Ok(record)
    }

    async fn query_statuses(&self, criteria: &StatusCriteria) -> Result<Vec<ShareStatusRecord>> {
        let state = self.state.read().await;

        let mut matches: Vec<ShareStatusRecord> = state
            .statuses
            .values()
            .filter(|status| {
                state.shares.get(&status.share_id).is_some_and(|share| {
                    criteria.matches(status, share.user_id, share.institution_id)
                })
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = criteria.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CredentialType;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn new_share(user_id: i64, institution_id: Option<i64>, fingerprint: Option<&str>) -> NewShare {
        NewShare {
            user_id,
            credential_type: CredentialType::Transcript,
            recipient_name: None,
            recipient_email: Some("registrar@example.edu".to_string()),
            institution_id,
            institution_name: None,
            issued_to: None,
            presigned_url: None,
            fingerprint: fingerprint.map(str::to_string),
            share_token: Uuid::new_v4(),
            token_expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_pending_status() {
        let store = MemoryShareStore::new();

        let (first, first_status) = store.create_share(new_share(42, None, None)).await.unwrap();
        let (second, _) = store.create_share(new_share(42, None, None)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first_status.share_id, first.id);
        assert_eq!(first_status.status, ShareStatus::Pending);
    }

    #[tokio::test]
    async fn test_transition_keeps_one_row_per_share() {
        let store = MemoryShareStore::new();
        let (share, pending) = store.create_share(new_share(42, None, None)).await.unwrap();

        let sent = store
            .transition_status(share.id, ShareStatus::Sent, Some("delivered".to_string()))
            .await
            .unwrap();

        assert_eq!(sent.id, pending.id);
        assert_eq!(store.get_status(share.id).await.unwrap(), Some(sent));
    }

    #[tokio::test]
    async fn test_transition_for_missing_share() {
        let store = MemoryShareStore::new();
        let err = store.transition_status(9, ShareStatus::Sent, None).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_illegal_transition_leaves_row_untouched() {
        let store = MemoryShareStore::new();
        let (share, _) = store.create_share(new_share(42, None, None)).await.unwrap();
        let failed = store
            .transition_status(share.id, ShareStatus::Failed, Some("bounced".to_string()))
            .await
            .unwrap();

        let err = store
            .transition_status(share.id, ShareStatus::Viewed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
        assert_eq!(store.get_status(share.id).await.unwrap(), Some(failed));
    }

    #[tokio::test]
    async fn test_concurrent_transitions_never_leave_failed() {
        let store = Arc::new(MemoryShareStore::new());
        let (share, _) = store.create_share(new_share(42, None, None)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            let next = if i == 16 { ShareStatus::Failed } else { ShareStatus::Viewed };
            handles.push(tokio::spawn(async move {
                store.transition_status(share.id, next, None).await
            }));
        }
        for handle in handles {
            let _ = handle.await.unwrap();
        }

        let current = store.get_status(share.id).await.unwrap().unwrap();
        assert_eq!(current.status, ShareStatus::Failed);
    }

    #[tokio::test]
    async fn test_query_orders_newest_first_and_limits() {
        let store = MemoryShareStore::new();
        for _ in 0..3 {
            store.create_share(new_share(42, Some(3), None)).await.unwrap();
        }
        store.create_share(new_share(7, Some(4), None)).await.unwrap();

        let all = store.query_statuses(&StatusCriteria::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|pair| {
            (pair[0].updated_at, pair[0].id) >= (pair[1].updated_at, pair[1].id)
        }));

        let criteria = StatusCriteria {
            institution_id: Some(3),
            limit: Some(2),
            ..Default::default()
        };
        let limited = store.query_statuses(&criteria).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert!(limited.iter().all(|status| status.share_id <= 3));
    }

    #[tokio::test]
    async fn test_find_by_fingerprint_prefers_latest_share() {
        let store = MemoryShareStore::new();
        store.create_share(new_share(42, None, Some("abc"))).await.unwrap();
        let (latest, _) = store.create_share(new_share(42, None, Some("abc"))).await.unwrap();

        let found = store.find_by_fingerprint("abc").await.unwrap().unwrap();
        assert_eq!(found.id, latest.id);
        assert!(store.find_by_fingerprint("abd").await.unwrap().is_none());
    }
}
