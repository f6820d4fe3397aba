//! User roles and per-section grants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::section::Section;

/// Access level of a signed-in user. Ordering is meaningful: each level
/// includes everything the levels below it may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registered but not yet approved. May read nothing and write nothing.
    Pending,
    /// Runs parade nights for granted sections.
    Officer,
    /// Leads a section. May manage roles, invites and reverts.
    Captain,
    /// Organisation administrator.
    Admin,
}

impl Role {
    pub fn can_edit_roster(&self) -> bool {
        *self >= Role::Officer
    }

    pub fn can_record_marks(&self) -> bool {
        *self >= Role::Officer
    }

    pub fn can_manage_roles(&self) -> bool {
        *self >= Role::Captain
    }

    pub fn can_manage_invites(&self) -> bool {
        *self >= Role::Captain
    }

    pub fn can_revert(&self) -> bool {
        *self >= Role::Captain
    }

    pub fn can_clear_logs(&self) -> bool {
        *self == Role::Admin
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Pending => "pending",
            Role::Officer => "officer",
            Role::Captain => "captain",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Role::Pending),
            "officer" => Ok(Role::Officer),
            "captain" => Ok(Role::Captain),
            "admin" => Ok(Role::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// A user's role assignment plus the sections it applies to. Keyed by email
/// in the role row store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub sections: Vec<Section>,
    pub updated_at: DateTime<Utc>,
}

impl UserRole {
    pub fn new(email: impl Into<String>, role: Role, sections: Vec<Section>) -> Self {
        Self {
            email: email.into(),
            role,
            sections,
            updated_at: Utc::now(),
        }
    }

    /// Whether this assignment grants access to the given section. Admins are
    /// granted every section regardless of the explicit list.
    pub fn grants(&self, section: Section) -> bool {
        self.role == Role::Admin || self.sections.contains(&section)
    }
}
