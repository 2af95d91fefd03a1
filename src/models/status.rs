use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownVariant;

/// Delivery lifecycle of a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    Pending,
    Sent,
    Viewed,
    Failed,
}

impl ShareStatus {
    pub const ALL: [ShareStatus; 4] = [
        ShareStatus::Pending,
        ShareStatus::Sent,
        ShareStatus::Viewed,
        ShareStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShareStatus::Pending => "pending",
            ShareStatus::Sent => "sent",
            ShareStatus::Viewed => "viewed",
            ShareStatus::Failed => "failed",
        }
    }

    /// Forward-only progression. `Failed` is reachable from every state and
    /// is left only by failing again.
    pub fn can_transition_to(self, next: ShareStatus) -> bool {
        match (self, next) {
            (_, ShareStatus::Failed) => true,
            (ShareStatus::Failed, _) => false,
            (current, next) => next.progress() >= current.progress(),
        }
    }

    /// Every current status from which `next` may be written
    pub fn allowed_predecessors(next: ShareStatus) -> Vec<ShareStatus> {
        ShareStatus::ALL
            .into_iter()
            .filter(|current| current.can_transition_to(next))
            .collect()
    }

    fn progress(self) -> u8 {
        match self {
            ShareStatus::Pending => 0,
            ShareStatus::Sent => 1,
            ShareStatus::Viewed => 2,
            ShareStatus::Failed => u8::MAX,
        }
    }
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ShareStatus::Pending),
            "sent" => Ok(ShareStatus::Sent),
            "viewed" => Ok(ShareStatus::Viewed),
            "failed" => Ok(ShareStatus::Failed),
            _ => Err(UnknownVariant::new("share status", value)),
        }
    }
}

/// Current status row of a share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareStatusRecord {
    pub id: i64,
    pub share_id: i64,
    pub status: ShareStatus,
    pub updated_at: DateTime<Utc>,
    pub detail: Option<String>,
}

/// Body of a status update (delivery confirmation, failure report, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Filters for status queries. Bounds on `updated_at` are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCriteria {
    #[serde(default)]
    pub institution_id: Option<i64>,
    #[serde(default)]
    pub status: Option<ShareStatus>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<u32>,
    /// Restricts results to one owner; set by the caller's scope, never by clients
    #[serde(skip)]
    pub owner_id: Option<i64>,
}

impl StatusCriteria {
    /// Whether a status of a share owned by `owner_id` in `institution_id` passes the filters
    pub fn matches(&self, record: &ShareStatusRecord, owner_id: i64, institution_id: Option<i64>) -> bool {
        self.institution_id.map_or(true, |wanted| institution_id == Some(wanted))
            && self.status.map_or(true, |wanted| record.status == wanted)
            && self.from.map_or(true, |from| record.updated_at >= from)
            && self.to.map_or(true, |to| record.updated_at <= to)
            && self.owner_id.map_or(true, |wanted| owner_id == wanted)
    }
}
