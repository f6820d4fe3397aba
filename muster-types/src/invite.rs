//! Invite codes for onboarding new users at a given role.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::Role;
use crate::section::Section;

/// A single-use invite code. Stored as a remote row keyed by `id`; the short
/// `code` is what gets handed to the invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCode {
    pub id: Uuid,
    pub code: String,
    pub role: Role,
    #[serde(default)]
    pub sections: Vec<Section>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
    #[serde(default)]
    pub revoked: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl InviteCode {
    /// Generates a fresh invite. The code is 8 uppercase hex characters,
    /// independent of the row id.
    pub fn generate(
        role: Role,
        sections: Vec<Section>,
        valid_for: TimeDelta,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let code = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Self {
            id: Uuid::new_v4(),
            code,
            role,
            sections,
            expires_at: now + valid_for,
            used_by: None,
            revoked: false,
            created_by: created_by.into(),
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn is_usable(&self) -> bool {
        !self.revoked && self.used_by.is_none() && !self.is_expired()
    }
}
