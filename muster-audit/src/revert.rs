//! Revert planning over the append-only audit trail.
//!
//! Everything here is a pure function: callers fetch the history, this
//! module decides what undoing an entry takes, and callers execute the
//! plan. An entry is revertible at most once. Reverting never mutates the
//! original entry; it appends a `RevertAction` entry that points back at it.

use muster_types::{AuditAction, AuditLog, InviteCode, Member, MemberId, RevertData, UserRole};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AuditError, AuditResult};

/// The writes that undo one audit entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RevertPlan {
    /// Undo a creation by deleting the member again.
    DeleteMember { member_id: MemberId },
    /// Put a deleted or updated member back from its snapshot.
    RestoreMember { member: Member },
    /// Put back every member a batch update touched.
    RestoreMembers { members: Vec<Member> },
    /// Put back the prior settings blob.
    RestoreSettings { settings: Value },
    /// Put back a prior role assignment.
    RestoreRole { user: UserRole },
    /// Remove a role that did not exist before the action.
    RemoveRole { email: String },
    /// Revoke a generated invite.
    RevokeInvite { invite_id: Uuid },
    /// Put back an invite's prior state.
    RestoreInvite { invite: InviteCode },
}

fn not_revertible(log: &AuditLog, reason: &str) -> AuditError {
    AuditError::NotRevertible {
        action: log.action,
        reason: reason.to_string(),
    }
}

/// Computes the plan that undoes `log`, or explains why none exists.
///
/// Only the action/data pairings written by the facade are revertible; a
/// mismatched pairing means the entry was corrupted somewhere and refusing
/// is safer than guessing.
pub fn revert_plan(log: &AuditLog) -> AuditResult<RevertPlan> {
    match log.action {
        AuditAction::RevertAction => {
            return Err(not_revertible(log, "a revert cannot itself be reverted"));
        }
        AuditAction::ClearLogs => {
            return Err(not_revertible(log, "cleared logs cannot be recovered"));
        }
        _ => {}
    }

    let Some(data) = &log.revert_data else {
        return Err(not_revertible(log, "no revert data was captured"));
    };

    match (log.action, data) {
        (AuditAction::CreateMember, RevertData::CreatedMember { member_id }) => {
            Ok(RevertPlan::DeleteMember {
                member_id: *member_id,
            })
        }
        (AuditAction::DeleteMember, RevertData::DeletedMember { member }) => {
            Ok(RevertPlan::RestoreMember {
                member: member.clone(),
            })
        }
        (AuditAction::UpdateMember, RevertData::PriorMember { member }) => {
            Ok(RevertPlan::RestoreMember {
                member: member.clone(),
            })
        }
        (AuditAction::UpdateMembers, RevertData::PriorMembers { members }) => {
            Ok(RevertPlan::RestoreMembers {
                members: members.clone(),
            })
        }
        (AuditAction::UpdateSettings, RevertData::PriorSettings { settings }) => {
            Ok(RevertPlan::RestoreSettings {
                settings: settings.clone(),
            })
        }
        (AuditAction::UpdateUserRole, RevertData::PriorRole { user }) => {
            Ok(RevertPlan::RestoreRole { user: user.clone() })
        }
        (AuditAction::UpdateUserRole, RevertData::NewRole { email }) => {
            Ok(RevertPlan::RemoveRole {
                email: email.clone(),
            })
        }
        (AuditAction::DeleteUserRole, RevertData::PriorRole { user }) => {
            Ok(RevertPlan::RestoreRole { user: user.clone() })
        }
        (AuditAction::GenerateInvite, RevertData::CreatedInvite { invite_id }) => {
            Ok(RevertPlan::RevokeInvite {
                invite_id: *invite_id,
            })
        }
        (AuditAction::UpdateInvite, RevertData::PriorInvite { invite }) => {
            Ok(RevertPlan::RestoreInvite {
                invite: invite.clone(),
            })
        }
        _ => Err(not_revertible(log, "revert data does not match the action")),
    }
}

/// Finds the `RevertAction` entry that undid `log_id`, if any.
pub fn find_revert(history: &[AuditLog], log_id: Uuid) -> Option<&AuditLog> {
    history
        .iter()
        .find(|entry| entry.action == AuditAction::RevertAction && entry.reverted_log_id == Some(log_id))
}

/// Whether `log_id` has already been undone somewhere in `history`.
pub fn has_been_reverted(history: &[AuditLog], log_id: Uuid) -> bool {
    find_revert(history, log_id).is_some()
}

/// Orders entries newest first, the way the history is displayed.
pub fn newest_first(mut history: Vec<AuditLog>) -> Vec<AuditLog> {
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    history
}

/// Enforces the at-most-once rule against `history`, then plans the revert.
pub fn ensure_revertible(history: &[AuditLog], target: &AuditLog) -> AuditResult<RevertPlan> {
    if has_been_reverted(history, target.id) {
        return Err(AuditError::AlreadyReverted(target.id));
    }
    revert_plan(target)
}
