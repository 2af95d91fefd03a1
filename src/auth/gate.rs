//! Ownership and role checks over an explicit [`Principal`].
//!
//! Every check is a pure predicate. A denial is an error the caller must
//! turn into a rejected request; nothing here filters data.

use thiserror::Error;

use crate::models::{Principal, Role};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AccessDenied(pub String);

/// What the acting principal must hold for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Only the resource owner
    OwnedByUser,
    /// The owner or a support user
    OwnerOrSupport,
    /// The owner, a support user, or an admin of the given institution
    OwnerOrStaff { institution_id: Option<i64> },
    /// Anyone affiliated with the institution, or support
    OwnedByInstitution(i64),
    Support,
    MarketingUser,
    Student,
}

pub fn authorize(
    principal: &Principal,
    resource_owner_id: i64,
    required: Capability,
) -> Result<(), AccessDenied> {
    let allowed = match required {
        Capability::OwnedByUser => owned_by_user_only(principal, resource_owner_id),
        Capability::OwnerOrSupport => {
            owned_by_user_only(principal, resource_owner_id) || is_support(principal)
        }
        Capability::OwnerOrStaff { institution_id } => {
            owned_by_user_only(principal, resource_owner_id)
                || is_support(principal)
                || institution_id.is_some_and(|id| is_institution_admin_of(principal, id))
        }
        Capability::OwnedByInstitution(institution_id) => {
            owned_by_institution(principal, institution_id)
        }
        Capability::Support => is_support(principal),
        Capability::MarketingUser => is_marketing_user(principal),
        Capability::Student => is_student(principal),
    };

    if allowed {
        Ok(())
    } else {
        tracing::debug!(
            user_id = principal.user_id,
            resource_owner_id,
            ?required,
            "Authorization denied"
        );
        Err(AccessDenied(format!(
            "User {} is not allowed to access this resource",
            principal.user_id
        )))
    }
}

pub fn owned_by_user_only(principal: &Principal, user_id: i64) -> bool {
    principal.user_id == user_id
}

pub fn owned_by_institution(principal: &Principal, institution_id: i64) -> bool {
    principal.institution_id == Some(institution_id) || is_support(principal)
}

pub fn is_support(principal: &Principal) -> bool {
    principal.has_role(Role::Support)
}

pub fn is_marketing_user(principal: &Principal) -> bool {
    principal.has_role(Role::Marketing)
}

pub fn is_student(principal: &Principal) -> bool {
    principal.has_role(Role::Student)
}

pub fn is_institution_admin_of(principal: &Principal, institution_id: i64) -> bool {
    principal.has_role(Role::InstitutionAdmin) && principal.institution_id == Some(institution_id)
}
