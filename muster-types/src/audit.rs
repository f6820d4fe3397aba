//! Immutable audit log entries and the inverse-state payloads that make
//! them revertible.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::invite::InviteCode;
use crate::member::{Member, MemberId};
use crate::roles::UserRole;
use crate::section::Section;

/// Every action type the audit trail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CreateMember,
    UpdateMember,
    UpdateMembers,
    DeleteMember,
    UpdateSettings,
    UpdateUserRole,
    DeleteUserRole,
    GenerateInvite,
    UpdateInvite,
    RevertAction,
    ClearLogs,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateMember => "create_member",
            AuditAction::UpdateMember => "update_member",
            AuditAction::UpdateMembers => "update_members",
            AuditAction::DeleteMember => "delete_member",
            AuditAction::UpdateSettings => "update_settings",
            AuditAction::UpdateUserRole => "update_user_role",
            AuditAction::DeleteUserRole => "delete_user_role",
            AuditAction::GenerateInvite => "generate_invite",
            AuditAction::UpdateInvite => "update_invite",
            AuditAction::RevertAction => "revert_action",
            AuditAction::ClearLogs => "clear_logs",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inverse state captured at write time. Whatever is needed to undo the
/// action later, snapshotted before the action applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RevertData {
    /// A member was created; undo by deleting it.
    CreatedMember { member_id: MemberId },
    /// A member was deleted; full snapshot so undo can recreate it.
    DeletedMember { member: Member },
    /// A member was updated; snapshot of the pre-update state.
    PriorMember { member: Member },
    /// A batch update; pre-update snapshots of every touched member.
    PriorMembers { members: Vec<Member> },
    /// Settings were changed; the prior settings blob.
    PriorSettings { settings: serde_json::Value },
    /// A role was changed or deleted; the prior assignment.
    PriorRole { user: UserRole },
    /// A role was assigned where none existed; undo by removing it.
    NewRole { email: String },
    /// An invite was generated; undo by revoking it.
    CreatedInvite { invite_id: Uuid },
    /// An invite was changed; the prior invite state.
    PriorInvite { invite: InviteCode },
}

/// One audit log entry. Entries are append-only: reverting an action appends
/// a new `RevertAction` entry pointing back at the original rather than
/// mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    /// `None` for organisation-wide actions (roles, invites).
    pub section: Option<Section>,
    pub actor_email: String,
    pub action: AuditAction,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_data: Option<RevertData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverted_log_id: Option<Uuid>,
}

impl AuditLog {
    pub fn new(
        action: AuditAction,
        section: Option<Section>,
        actor_email: impl Into<String>,
        description: impl Into<String>,
        revert_data: Option<RevertData>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            section,
            actor_email: actor_email.into(),
            action,
            description: description.into(),
            timestamp: Utc::now(),
            revert_data,
            reverted_log_id: None,
        }
    }

    /// Builds the `RevertAction` entry recording that `original` was undone.
    pub fn revert_of(
        original: &AuditLog,
        actor_email: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut log = Self::new(
            AuditAction::RevertAction,
            original.section,
            actor_email,
            description,
            None,
        );
        log.reverted_log_id = Some(original.id);
        log
    }

    pub fn is_revert(&self) -> bool {
        self.action == AuditAction::RevertAction
    }
}
