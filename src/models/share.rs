use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownVariant;

/// Category of a shareable credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    Badge,
    Transcript,
    HigherEd,
    HighSchool,
    Recommendation,
    Accomplishment,
    Sar,
    Resume,
    Certificate,
    DegreeVerification,
    OtherCredential,
    CommunityCollege,
}

impl CredentialType {
    pub const ALL: [CredentialType; 12] = [
        CredentialType::Badge,
        CredentialType::Transcript,
        CredentialType::HigherEd,
        CredentialType::HighSchool,
        CredentialType::Recommendation,
        CredentialType::Accomplishment,
        CredentialType::Sar,
        CredentialType::Resume,
        CredentialType::Certificate,
        CredentialType::DegreeVerification,
        CredentialType::OtherCredential,
        CredentialType::CommunityCollege,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::Badge => "badge",
            CredentialType::Transcript => "transcript",
            CredentialType::HigherEd => "higher_ed",
            CredentialType::HighSchool => "high_school",
            CredentialType::Recommendation => "recommendation",
            CredentialType::Accomplishment => "accomplishment",
            CredentialType::Sar => "sar",
            CredentialType::Resume => "resume",
            CredentialType::Certificate => "certificate",
            CredentialType::DegreeVerification => "degree_verification",
            CredentialType::OtherCredential => "other_credential",
            CredentialType::CommunityCollege => "community_college",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        CredentialType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownVariant::new("credential type", value))
    }
}

/// Share payload as submitted by clients on create and update.
///
/// `credential_type` stays a raw string here so an unknown kind is reported
/// as a bad request by validation instead of a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: i64,
    pub credential_type: String,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub institution_id: Option<i64>,
    #[serde(default)]
    pub institution_name: Option<String>,
    #[serde(default)]
    pub issued_to: Option<String>,
    #[serde(default)]
    pub presigned_url: Option<String>,
    /// Base64 encoded artifact; only its fingerprint is kept
    #[serde(default)]
    pub artifact_base64: Option<String>,
}

/// Stored share as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRequestRecord {
    pub id: i64,
    pub user_id: i64,
    pub credential_type: CredentialType,
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

impl ShareRequestRecord {
    /// Whether the share token can no longer be redeemed at `now`
    pub fn token_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Validated share ready to be persisted; the store assigns id and creation time
#[derive(Debug, Clone, PartialEq)]
pub struct NewShare {
    pub user_id: i64,
    pub credential_type: CredentialType,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub institution_id: Option<i64>,
    pub institution_name: Option<String>,
    pub issued_to: Option<String>,
    pub presigned_url: Option<String>,
    pub fingerprint: Option<String>,
    pub share_token: Uuid,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// The delivery fields an owner may change after creation
#[derive(Debug, Clone, PartialEq)]
pub struct ShareUpdate {
    pub id: i64,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub presigned_url: Option<String>,
}
