use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::share::{CredentialType, ShareRequestRecord};

/// Outcome of a verification lookup. Never persisted.
///
/// Optional fields always serialize (as `null` when empty) so a miss has the
/// same shape whatever caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub credential_type: Option<CredentialType>,
    pub issuer: Option<String>,
    pub recipient: Option<String>,
    pub issued_to: Option<String>,
    pub share_date: Option<DateTime<Utc>>,
}

impl VerificationResult {
    pub fn not_verified() -> Self {
        Self {
            verified: false,
            credential_type: None,
            issuer: None,
            recipient: None,
            issued_to: None,
            share_date: None,
        }
    }

    pub fn from_share(share: &ShareRequestRecord) -> Self {
        Self {
            verified: true,
            credential_type: Some(share.credential_type),
            issuer: share
                .institution_name
                .clone()
                .or_else(|| share.institution_id.map(|id| id.to_string())),
            recipient: share
                .recipient_name
                .clone()
                .or_else(|| share.recipient_email.clone()),
            issued_to: share.issued_to.clone(),
            share_date: Some(share.created_at),
        }
    }
}
