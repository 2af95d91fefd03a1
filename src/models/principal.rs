use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Support,
    Marketing,
    InstitutionAdmin,
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "support" => Ok(Role::Support),
            "marketing" => Ok(Role::Marketing),
            "institution_admin" => Ok(Role::InstitutionAdmin),
            _ => Err(UnknownVariant::new("role", value)),
        }
    }
}

/// The authenticated actor of one request.
///
/// Built from the bearer token by the api layer and passed explicitly into
/// every domain call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub roles: HashSet<Role>,
    pub institution_id: Option<i64>,
}

impl Principal {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            roles: HashSet::new(),
            institution_id: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn with_institution(mut self, institution_id: i64) -> Self {
        self.institution_id = Some(institution_id);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
