//! Third-party verification of shared credentials.
//!
//! A lookup never tells the caller why it failed: a miss, an expired token,
//! an unreadable upload and a store error all produce the same
//! [`VerificationResult::not_verified`].

use chrono::Utc;
use std::fmt::Display;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::fingerprint::compute_fingerprint;
use crate::db::{DatabaseError, ShareStore};
use crate::models::{ShareStatus, VerificationResult};

/// Verify an uploaded artifact whose read may have failed.
/// Read failures are logged and reported as not verified.
pub async fn verify_upload<E: Display>(
    store: &dyn ShareStore,
    upload: Result<Vec<u8>, E>,
) -> VerificationResult {
    match upload {
        Ok(bytes) => verify_artifact(store, &bytes).await,
        Err(e) => {
            warn!(error = %e, "Failed to read artifact for verification");
            VerificationResult::not_verified()
        }
    }
}

/// Match the artifact's fingerprint against stored shares
#[tracing::instrument(skip(store, bytes), fields(size = bytes.len()))]
pub async fn verify_artifact(store: &dyn ShareStore, bytes: &[u8]) -> VerificationResult {
    if bytes.is_empty() {
        debug!("Empty artifact submitted");
        return VerificationResult::not_verified();
    }

    let fingerprint = compute_fingerprint(bytes);
    match store.find_by_fingerprint(&fingerprint).await {
        Ok(Some(share)) => {
            info!(share_id = share.id, "Artifact verified");
            VerificationResult::from_share(&share)
        }
        Ok(None) => {
            info!("Artifact did not match any share");
            VerificationResult::not_verified()
        }
        Err(e) => {
            warn!(error = %e, "Fingerprint lookup failed");
            VerificationResult::not_verified()
        }
    }
}

/// Resolve a share token. A successful lookup marks the share as viewed
/// when its status still allows it.
#[tracing::instrument(skip(store, token))]
pub async fn verify_by_token(store: &dyn ShareStore, token: &str) -> VerificationResult {
    let Ok(token) = Uuid::parse_str(token.trim()) else {
        debug!("Malformed share token");
        return VerificationResult::not_verified();
    };

    let share = match store.find_by_token(token).await {
        Ok(Some(share)) if !share.token_expired_at(Utc::now()) => share,
        Ok(Some(share)) => {
            info!(share_id = share.id, "Share token expired");
            return VerificationResult::not_verified();
        }
        Ok(None) => {
            info!("Unknown share token");
            return VerificationResult::not_verified();
        }
        Err(e) => {
            warn!(error = %e, "Token lookup failed");
            return VerificationResult::not_verified();
        }
    };

    mark_viewed(store, share.id).await;
    info!(share_id = share.id, "Share token verified");
    VerificationResult::from_share(&share)
}

async fn mark_viewed(store: &dyn ShareStore, share_id: i64) {
    match store.get_status(share_id).await {
        Ok(Some(current)) if current.status == ShareStatus::Viewed => return,
        Ok(_) => {}
        Err(e) => {
            warn!(share_id, error = %e, "Could not load status after verification");
            return;
        }
    }

    // The store re-checks legality atomically; a failed share stays failed
    match store
        .transition_status(share_id, ShareStatus::Viewed, Some("verified by token".to_string()))
        .await
    {
        Ok(_) => {}
        Err(DatabaseError::Conflict(msg)) => debug!(share_id, "Share not marked viewed: {}", msg),
        Err(e) => warn!(share_id, error = %e, "Could not mark share as viewed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryShareStore;
    use crate::domain::shares::{create_share, ShareSettings};
    use crate::models::{CredentialType, NewShare, Principal, ShareRequest};
    use base64::{engine::general_purpose, Engine as _};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    const TRANSCRIPT: &[u8] = b"%PDF-1.7 official transcript of Jordan Student";

    async fn seed_transcript(store: &MemoryShareStore) -> crate::models::ShareRequestRecord {
        let request = ShareRequest {
            user_id: 42,
            credential_type: "transcript".to_string(),
            recipient_email: Some("a@b.com".to_string()),
            institution_name: Some("Example Community College".to_string()),
            issued_to: Some("Jordan Student".to_string()),
            artifact_base64: Some(general_purpose::STANDARD.encode(TRANSCRIPT)),
            ..Default::default()
        };
        let (share, _) = create_share(store, &ShareSettings::default(), &Principal::new(42), request)
            .await
            .unwrap();
        share
    }

    #[tokio::test]
    async fn test_matching_artifact_is_verified() {
        let store = MemoryShareStore::new();
        let share = seed_transcript(&store).await;

        let result = verify_artifact(&store, TRANSCRIPT).await;
        assert!(result.verified);
        assert_eq!(result.credential_type, Some(CredentialType::Transcript));
        assert_eq!(result.issuer.as_deref(), Some("Example Community College"));
        assert_eq!(result.recipient.as_deref(), Some("a@b.com"));
        assert_eq!(result.share_date, Some(share.created_at));

        // Same bytes, same answer
        assert_eq!(verify_artifact(&store, TRANSCRIPT).await, result);
    }

    #[tokio::test]
    async fn test_unrelated_artifact_is_not_verified() {
        let store = MemoryShareStore::new();
        seed_transcript(&store).await;

        let result = verify_artifact(&store, b"some other document").await;
        assert_eq!(result, VerificationResult::not_verified());
        assert_eq!(verify_artifact(&store, b"").await, VerificationResult::not_verified());
    }

    #[tokio::test]
    async fn test_read_failure_looks_like_a_miss() {
        let store = MemoryShareStore::new();
        seed_transcript(&store).await;

        let failed: Result<Vec<u8>, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream closed"));
        assert_eq!(verify_upload(&store, failed).await, VerificationResult::not_verified());

        let ok: Result<Vec<u8>, std::io::Error> = Ok(TRANSCRIPT.to_vec());
        assert!(verify_upload(&store, ok).await.verified);
    }

    #[tokio::test]
    async fn test_token_verification_marks_viewed() {
        let store = MemoryShareStore::new();
        let share = seed_transcript(&store).await;

        let result = verify_by_token(&store, &share.share_token.to_string()).await;
        assert!(result.verified);
        assert_eq!(result.issued_to.as_deref(), Some("Jordan Student"));

        let status = store.get_status(share.id).await.unwrap().unwrap();
        assert_eq!(status.status, ShareStatus::Viewed);

        assert_eq!(verify_by_token(&store, &share.share_token.to_string()).await, result);
    }

    #[tokio::test]
    async fn test_token_verification_leaves_failed_share_alone() {
        let store = MemoryShareStore::new();
        let share = seed_transcript(&store).await;
        store
            .transition_status(share.id, ShareStatus::Failed, None)
            .await
            .unwrap();

        assert!(verify_by_token(&store, &share.share_token.to_string()).await.verified);
        let status = store.get_status(share.id).await.unwrap().unwrap();
        assert_eq!(status.status, ShareStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_malformed_and_expired_tokens() {
        let store = MemoryShareStore::new();
        seed_transcript(&store).await;

        let (expired, _) = store
            .create_share(NewShare {
                user_id: 42,
                credential_type: CredentialType::Badge,
                recipient_name: Some("Recruiter".to_string()),
                recipient_email: None,
                institution_id: None,
                institution_name: None,
                issued_to: None,
                presigned_url: None,
                fingerprint: None,
                share_token: Uuid::new_v4(),
                token_expires_at: Some(Utc::now() - Duration::hours(1)),
            })
            .await
            .unwrap();

        for token in [
            Uuid::new_v4().to_string(),
            "not-a-token".to_string(),
            expired.share_token.to_string(),
        ] {
            assert_eq!(verify_by_token(&store, &token).await, VerificationResult::not_verified());
        }

        let status = store.get_status(expired.id).await.unwrap().unwrap();
        assert_eq!(status.status, ShareStatus::Pending);
    }

    /// Delays status reads so a concurrent writer can land in between
    struct SlowStatusReads(MemoryShareStore);

    #[async_trait::async_trait]
    impl ShareStore for SlowStatusReads {
        async fn create_share(
            &self,
            share: NewShare,
        ) -> crate::db::Result<(crate::models::ShareRequestRecord, crate::models::ShareStatusRecord)> {
            self.0.create_share(share).await
        }

        async fn update_share(
            &self,
            update: crate::models::ShareUpdate,
        ) -> crate::db::Result<crate::models::ShareRequestRecord> {
            self.0.update_share(update).await
        }

        async fn get_share(&self, share_id: i64) -> crate::db::Result<Option<crate::models::ShareRequestRecord>> {
            self.0.get_share(share_id).await
        }

        async fn find_by_fingerprint(
            &self,
            fingerprint: &str,
        ) -> crate::db::Result<Option<crate::models::ShareRequestRecord>> {
            self.0.find_by_fingerprint(fingerprint).await
        }

        async fn find_by_token(&self, token: Uuid) -> crate::db::Result<Option<crate::models::ShareRequestRecord>> {
            self.0.find_by_token(token).await
        }

        async fn get_status(&self, share_id: i64) -> crate::db::Result<Option<crate::models::ShareStatusRecord>> {
            let status = self.0.get_status(share_id).await;
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            status
        }

        async fn transition_status(
            &self,
            share_id: i64,
            next: ShareStatus,
            detail: Option<String>,
        ) -> crate::db::Result<crate::models::ShareStatusRecord> {
            self.0.transition_status(share_id, next, detail).await
        }

        async fn query_statuses(
            &self,
            criteria: &crate::models::StatusCriteria,
        ) -> crate::db::Result<Vec<crate::models::ShareStatusRecord>> {
            self.0.query_statuses(criteria).await
        }

        async fn health_check(&self) -> crate::db::Result<()> {
            self.0.health_check().await
        }
    }

    #[tokio::test]
    async fn test_failure_reported_during_token_verification_sticks() {
        let inner = MemoryShareStore::new();
        let share = seed_transcript(&inner).await;
        let store = SlowStatusReads(inner);
        let owner = Principal::new(42);
        let token = share.share_token.to_string();

        let failure = crate::models::StatusUpdateRequest {
            status: "failed".to_string(),
            detail: Some("bounced".to_string()),
        };
        // Verification reads `pending` first, then the failure lands before it writes
        let (verified, recorded) = tokio::join!(
            verify_by_token(&store, &token),
            crate::domain::record_status(&store, &owner, share.id, failure),
        );

        assert_eq!(recorded.unwrap().status, ShareStatus::Failed);
        assert!(verified.verified);
        let current = store.get_status(share.id).await.unwrap().unwrap();
        assert_eq!(current.status, ShareStatus::Failed);
        assert_eq!(current.detail.as_deref(), Some("bounced"));
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl ShareStore for FailingStore {
        async fn create_share(
            &self,
            _share: NewShare,
        ) -> crate::db::Result<(crate::models::ShareRequestRecord, crate::models::ShareStatusRecord)> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }

        async fn update_share(
            &self,
            _update: crate::models::ShareUpdate,
        ) -> crate::db::Result<crate::models::ShareRequestRecord> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }

        async fn get_share(&self, _share_id: i64) -> crate::db::Result<Option<crate::models::ShareRequestRecord>> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }

        async fn find_by_fingerprint(
            &self,
            _fingerprint: &str,
        ) -> crate::db::Result<Option<crate::models::ShareRequestRecord>> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }

        async fn find_by_token(&self, _token: Uuid) -> crate::db::Result<Option<crate::models::ShareRequestRecord>> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }

        async fn get_status(&self, _share_id: i64) -> crate::db::Result<Option<crate::models::ShareStatusRecord>> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }

        async fn transition_status(
            &self,
            _share_id: i64,
            _next: ShareStatus,
            _detail: Option<String>,
        ) -> crate::db::Result<crate::models::ShareStatusRecord> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }

        async fn query_statuses(
            &self,
            _criteria: &crate::models::StatusCriteria,
        ) -> crate::db::Result<Vec<crate::models::ShareStatusRecord>> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }

        async fn health_check(&self) -> crate::db::Result<()> {
            Err(DatabaseError::ConnectionError("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_absorbed() {
        assert_eq!(verify_artifact(&FailingStore, TRANSCRIPT).await, VerificationResult::not_verified());
        assert_eq!(
            verify_by_token(&FailingStore, &Uuid::new_v4().to_string()).await,
            VerificationResult::not_verified()
        );
    }
}
