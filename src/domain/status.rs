use tracing::info;

use super::shares::{clean, load_share};
use super::DomainError;
use crate::auth::gate::{is_institution_admin_of, is_support};
use crate::auth::{authorize, Capability};
use crate::db::ShareStore;
use crate::models::{
    Principal, Role, ShareStatus, ShareStatusRecord, StatusCriteria, StatusUpdateRequest,
    UnknownVariant,
};

/// Record a new status for a share (delivery confirmation, failure, ...)
#[tracing::instrument(skip(store, update), fields(status = %update.status))]
pub async fn record_status(
    store: &dyn ShareStore,
    principal: &Principal,
    share_id: i64,
    update: StatusUpdateRequest,
) -> Result<ShareStatusRecord, DomainError> {
    let next: ShareStatus = update
        .status
        .parse()
        .map_err(|e: UnknownVariant| DomainError::BadRequest(e.to_string()))?;

    let share = load_share(store, share_id).await?;
    authorize(principal, share.user_id, Capability::OwnerOrSupport)?;

    let record = store
        .transition_status(share_id, next, clean(update.detail))
        .await?;
    info!(share_id, status = %record.status, "Share status recorded");
    Ok(record)
}

#[tracing::instrument(skip(store))]
pub async fn get_status(
    store: &dyn ShareStore,
    principal: &Principal,
    share_id: i64,
) -> Result<ShareStatusRecord, DomainError> {
    let share = load_share(store, share_id).await?;
    authorize(
        principal,
        share.user_id,
        Capability::OwnerOrStaff { institution_id: share.institution_id },
    )?;

    store
        .get_status(share_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("No status recorded for share {}", share_id)))
}

/// Status rows visible to the principal that match the criteria, most
/// recently updated first. Without a limit the whole matching set is returned.
#[tracing::instrument(skip(store))]
pub async fn query_by_criteria(
    store: &dyn ShareStore,
    principal: &Principal,
    criteria: StatusCriteria,
) -> Result<Vec<ShareStatusRecord>, DomainError> {
    if let (Some(from), Some(to)) = (criteria.from, criteria.to) {
        if from > to {
            return Err(DomainError::BadRequest("from must not be after to".to_string()));
        }
    }

    let criteria = scope_criteria(principal, criteria)?;
    let records = store.query_statuses(&criteria).await?;

    info!(count = records.len(), "Status query completed");
    Ok(records)
}

/// Narrow criteria to what the principal may see
fn scope_criteria(
    principal: &Principal,
    mut criteria: StatusCriteria,
) -> Result<StatusCriteria, DomainError> {
    criteria.owner_id = None;

    if is_support(principal) {
        return Ok(criteria);
    }

    if principal.has_role(Role::InstitutionAdmin) {
        let own = principal.institution_id.ok_or_else(|| {
            DomainError::Forbidden("Institution admin has no institution".to_string())
        })?;
        let requested = criteria.institution_id.unwrap_or(own);
        if !is_institution_admin_of(principal, requested) {
            return Err(DomainError::Forbidden(format!(
                "Not allowed to query institution {}",
                requested
            )));
        }
        criteria.institution_id = Some(requested);
        return Ok(criteria);
    }

    criteria.owner_id = Some(principal.user_id);
    Ok(criteria)
}
