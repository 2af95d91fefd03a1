use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use super::fingerprint::{compute_fingerprint, decode_artifact};
use super::DomainError;
use crate::auth::{authorize, Capability};
use crate::db::ShareStore;
use crate::models::{
    CredentialType, NewShare, Principal, ShareRequest, ShareRequestRecord, ShareStatusRecord,
    ShareUpdate,
};

/// Tunables for share creation
#[derive(Debug, Clone)]
pub struct ShareSettings {
    /// Lifetime of a share token; `None` means tokens never expire
    pub token_ttl: Option<Duration>,
    /// Largest accepted artifact, decoded
    pub max_artifact_bytes: usize,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            token_ttl: Some(Duration::days(30)),
            max_artifact_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Create a share and its `pending` status.
///
/// Identical payloads produce distinct shares: each submission is its own
/// record and no deduplication happens here.
#[tracing::instrument(skip(store, settings, request), fields(user_id = request.user_id))]
pub async fn create_share(
    store: &dyn ShareStore,
    settings: &ShareSettings,
    principal: &Principal,
    request: ShareRequest,
) -> Result<(ShareRequestRecord, ShareStatusRecord), DomainError> {
    if request.id.is_some() {
        return Err(DomainError::BadRequest(
            "id must not be set when creating a share".to_string(),
        ));
    }

    authorize(principal, request.user_id, Capability::OwnedByUser)?;

    let credential_type = parse_credential_type(&request.credential_type)?;
    let recipient_name = clean(request.recipient_name);
    let recipient_email = clean(request.recipient_email);
    validate_recipient(recipient_name.as_deref(), recipient_email.as_deref())?;

    if let Some(institution_id) = request.institution_id {
        if institution_id <= 0 {
            return Err(DomainError::BadRequest(format!(
                "Invalid institution id: {}",
                institution_id
            )));
        }
    }

    let fingerprint = match clean(request.artifact_base64) {
        Some(encoded) => Some(fingerprint_artifact(&encoded, settings.max_artifact_bytes)?),
        None => None,
    };

    let new_share = NewShare {
        user_id: request.user_id,
        credential_type,
        recipient_name,
        recipient_email,
        institution_id: request.institution_id,
        institution_name: clean(request.institution_name),
        issued_to: clean(request.issued_to),
        presigned_url: clean(request.presigned_url),
        fingerprint,
        share_token: Uuid::new_v4(),
        token_expires_at: settings.token_ttl.map(|ttl| Utc::now() + ttl),
    };

    let (share, status) = store.create_share(new_share).await?;
    info!(share_id = share.id, credential_type = %share.credential_type, "Share created");
    Ok((share, status))
}

/// Update the descriptive fields of an existing share. Only the owner may
/// update. Everything a verifier is shown (type, institution, issuer,
/// issued_to) is fixed at creation, as are the owner and the artifact.
#[tracing::instrument(skip(store, request), fields(share_id = ?request.id))]
pub async fn update_share(
    store: &dyn ShareStore,
    principal: &Principal,
    request: ShareRequest,
) -> Result<ShareRequestRecord, DomainError> {
    let share_id = request.id.ok_or_else(|| {
        DomainError::BadRequest("id is required when updating a share".to_string())
    })?;

    let existing = load_share(store, share_id).await?;

    authorize(principal, existing.user_id, Capability::OwnedByUser)?;

    if request.user_id != existing.user_id {
        return Err(DomainError::BadRequest("user_id cannot be changed".to_string()));
    }
    if parse_credential_type(&request.credential_type)? != existing.credential_type {
        return Err(DomainError::BadRequest("credential_type cannot be changed".to_string()));
    }
    if request.institution_id != existing.institution_id {
        return Err(DomainError::BadRequest("institution_id cannot be changed".to_string()));
    }
    if clean(request.institution_name) != existing.institution_name {
        return Err(DomainError::BadRequest("institution_name cannot be changed".to_string()));
    }
    if clean(request.issued_to) != existing.issued_to {
        return Err(DomainError::BadRequest("issued_to cannot be changed".to_string()));
    }
    if request.artifact_base64.is_some() {
        return Err(DomainError::BadRequest(
            "artifact cannot be replaced, create a new share instead".to_string(),
        ));
    }

    let recipient_name = clean(request.recipient_name);
    let recipient_email = clean(request.recipient_email);
    validate_recipient(recipient_name.as_deref(), recipient_email.as_deref())?;

    let updated = store
        .update_share(ShareUpdate {
            id: share_id,
            recipient_name,
            recipient_email,
            presigned_url: clean(request.presigned_url),
        })
        .await?;

    info!("Share updated");
    Ok(updated)
}

/// Read a share as its owner, support, or an admin of its institution
#[tracing::instrument(skip(store))]
pub async fn get_share(
    store: &dyn ShareStore,
    principal: &Principal,
    share_id: i64,
) -> Result<ShareRequestRecord, DomainError> {
    let share = load_share(store, share_id).await?;
    authorize(
        principal,
        share.user_id,
        Capability::OwnerOrStaff { institution_id: share.institution_id },
    )?;
    Ok(share)
}

pub(crate) async fn load_share(
    store: &dyn ShareStore,
    share_id: i64,
) -> Result<ShareRequestRecord, DomainError> {
    store
        .get_share(share_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Share {} not found", share_id)))
}

fn parse_credential_type(value: &str) -> Result<CredentialType, DomainError> {
    value
        .parse()
        .map_err(|e: crate::models::UnknownVariant| DomainError::BadRequest(e.to_string()))
}

fn fingerprint_artifact(encoded: &str, max_bytes: usize) -> Result<String, DomainError> {
    let bytes = decode_artifact(encoded)
        .map_err(|e| DomainError::BadRequest(format!("artifact_base64 is not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(DomainError::BadRequest("artifact must not be empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(DomainError::BadRequest(format!(
            "artifact exceeds {} bytes",
            max_bytes
        )));
    }

    Ok(compute_fingerprint(&bytes))
}

/// Trimmed value, `None` when blank
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_recipient(name: Option<&str>, email: Option<&str>) -> Result<(), DomainError> {
    if name.is_none() && email.is_none() {
        return Err(DomainError::BadRequest(
            "recipient_name or recipient_email is required".to_string(),
        ));
    }
    if let Some(email) = email {
        if !is_plausible_email(email) {
            return Err(DomainError::BadRequest(format!(
                "Invalid recipient email: {}",
                email
            )));
        }
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
