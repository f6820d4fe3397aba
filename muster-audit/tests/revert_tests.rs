use chrono::TimeDelta;
use muster_audit::{
    ensure_revertible, find_revert, has_been_reverted, newest_first, revert_plan, AuditError,
    RevertPlan,
};
use muster_types::{
    AuditAction, AuditLog, InviteCode, Member, Role, RevertData, Section, UserRole,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn log(action: AuditAction, data: Option<RevertData>) -> AuditLog {
    AuditLog::new(
        action,
        Some(Section::Juniors),
        "captain@example.org",
        "history entry",
        data,
    )
}

fn robin() -> Member {
    Member::new(Section::Juniors, "Robin", 7, 2)
}

// ── plans per action ────────────────────────────────────────────────────

#[test]
fn creating_a_member_plans_a_delete() {
    let member = robin();
    let entry = log(
        AuditAction::CreateMember,
        Some(RevertData::CreatedMember { member_id: member.id }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::DeleteMember { member_id: member.id });
}

#[test]
fn deleting_a_member_plans_a_restore_of_the_snapshot() {
    let mut member = robin();
    member.is_leader = true;
    let entry = log(
        AuditAction::DeleteMember,
        Some(RevertData::DeletedMember { member: member.clone() }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RestoreMember { member });
}

#[test]
fn updating_a_member_plans_a_restore_of_the_prior_state() {
    let member = robin();
    let entry = log(
        AuditAction::UpdateMember,
        Some(RevertData::PriorMember { member: member.clone() }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RestoreMember { member });
}

#[test]
fn batch_updates_plan_a_restore_of_every_member() {
    let members = vec![robin(), Member::new(Section::Juniors, "Sam", 8, 1)];
    let entry = log(
        AuditAction::UpdateMembers,
        Some(RevertData::PriorMembers { members: members.clone() }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RestoreMembers { members });
}

#[test]
fn settings_changes_plan_a_restore_of_the_prior_blob() {
    let settings = json!({ "meeting_day": "friday", "term_start": "2026-01-12" });
    let entry = log(
        AuditAction::UpdateSettings,
        Some(RevertData::PriorSettings { settings: settings.clone() }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RestoreSettings { settings });
}

#[test]
fn role_changes_with_a_prior_assignment_plan_a_restore() {
    let user = UserRole::new("lt@example.org", Role::Officer, vec![Section::Juniors]);
    let entry = log(
        AuditAction::UpdateUserRole,
        Some(RevertData::PriorRole { user: user.clone() }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RestoreRole { user });
}

#[test]
fn first_role_assignments_plan_a_removal() {
    let entry = log(
        AuditAction::UpdateUserRole,
        Some(RevertData::NewRole { email: "new@example.org".into() }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RemoveRole { email: "new@example.org".into() });
}

#[test]
fn role_deletions_plan_a_restore() {
    let user = UserRole::new("lt@example.org", Role::Captain, vec![Section::Seniors]);
    let entry = log(
        AuditAction::DeleteUserRole,
        Some(RevertData::PriorRole { user: user.clone() }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RestoreRole { user });
}

#[test]
fn generated_invites_plan_a_revocation() {
    let invite = InviteCode::generate(
        Role::Officer,
        vec![Section::Juniors],
        TimeDelta::days(7),
        "captain@example.org",
    );
    let entry = log(
        AuditAction::GenerateInvite,
        Some(RevertData::CreatedInvite { invite_id: invite.id }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RevokeInvite { invite_id: invite.id });
}

#[test]
fn invite_changes_plan_a_restore_of_the_prior_invite() {
    let invite = InviteCode::generate(
        Role::Officer,
        vec![Section::Company],
        TimeDelta::days(7),
        "captain@example.org",
    );
    let entry = log(
        AuditAction::UpdateInvite,
        Some(RevertData::PriorInvite { invite: invite.clone() }),
    );

    let plan = revert_plan(&entry).unwrap();
    assert_eq!(plan, RevertPlan::RestoreInvite { invite });
}

// ── refusals ────────────────────────────────────────────────────────────

#[test]
fn a_revert_entry_is_not_revertible() {
    let original = log(AuditAction::DeleteMember, None);
    let revert = AuditLog::revert_of(&original, "captain@example.org", "Reverted the delete");

    let err = revert_plan(&revert).unwrap_err();
    assert!(matches!(
        err,
        AuditError::NotRevertible { action: AuditAction::RevertAction, .. }
    ));
}

#[test]
fn clearing_logs_is_not_revertible() {
    let entry = log(AuditAction::ClearLogs, None);

    let err = revert_plan(&entry).unwrap_err();
    assert!(matches!(
        err,
        AuditError::NotRevertible { action: AuditAction::ClearLogs, .. }
    ));
}

#[test]
fn missing_revert_data_is_not_revertible() {
    let entry = log(AuditAction::UpdateMember, None);

    let err = revert_plan(&entry).unwrap_err();
    match err {
        AuditError::NotRevertible { reason, .. } => {
            assert!(reason.contains("no revert data"), "unexpected reason: {reason}");
        }
        other => panic!("expected NotRevertible, got {other:?}"),
    }
}

#[test]
fn mismatched_revert_data_is_refused() {
    // A creation must carry CreatedMember, not a full snapshot
    let entry = log(
        AuditAction::CreateMember,
        Some(RevertData::DeletedMember { member: robin() }),
    );

    let err = revert_plan(&entry).unwrap_err();
    match err {
        AuditError::NotRevertible { reason, .. } => {
            assert!(reason.contains("does not match"), "unexpected reason: {reason}");
        }
        other => panic!("expected NotRevertible, got {other:?}"),
    }
}

// ── history rules ───────────────────────────────────────────────────────

#[test]
fn find_revert_locates_the_undo_entry() {
    let member = robin();
    let original = log(
        AuditAction::DeleteMember,
        Some(RevertData::DeletedMember { member }),
    );
    let revert = AuditLog::revert_of(&original, "captain@example.org", "Restored Robin");
    let history = vec![original.clone(), revert.clone()];

    let found = find_revert(&history, original.id).expect("revert entry should be found");
    assert_eq!(found.id, revert.id);
    assert_eq!(found.reverted_log_id, Some(original.id));
    assert!(has_been_reverted(&history, original.id));
}

#[test]
fn reverts_of_other_entries_do_not_count() {
    let a = log(AuditAction::DeleteMember, Some(RevertData::DeletedMember { member: robin() }));
    let b = log(AuditAction::DeleteMember, Some(RevertData::DeletedMember { member: robin() }));
    let revert_of_b = AuditLog::revert_of(&b, "captain@example.org", "Restored the other one");
    let history = vec![a.clone(), b, revert_of_b];

    assert!(!has_been_reverted(&history, a.id));
}

#[test]
fn ensure_revertible_plans_an_unreverted_entry() {
    let member = robin();
    let entry = log(
        AuditAction::DeleteMember,
        Some(RevertData::DeletedMember { member: member.clone() }),
    );
    let history = vec![entry.clone()];

    let plan = ensure_revertible(&history, &entry).unwrap();
    assert_eq!(plan, RevertPlan::RestoreMember { member });
}

#[test]
fn ensure_revertible_rejects_a_second_revert() {
    let entry = log(
        AuditAction::DeleteMember,
        Some(RevertData::DeletedMember { member: robin() }),
    );
    let revert = AuditLog::revert_of(&entry, "captain@example.org", "Restored Robin");
    let history = vec![entry.clone(), revert];

    let err = ensure_revertible(&history, &entry).unwrap_err();
    match err {
        AuditError::AlreadyReverted(id) => assert_eq!(id, entry.id),
        other => panic!("expected AlreadyReverted, got {other:?}"),
    }
}

#[test]
fn newest_first_orders_by_timestamp() {
    let mut oldest = log(AuditAction::CreateMember, None);
    oldest.timestamp -= TimeDelta::minutes(10);
    let mut middle = log(AuditAction::UpdateMember, None);
    middle.timestamp -= TimeDelta::minutes(5);
    let newest = log(AuditAction::DeleteMember, None);

    let ordered = newest_first(vec![oldest.clone(), newest.clone(), middle.clone()]);

    assert_eq!(
        ordered.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![newest.id, middle.id, oldest.id]
    );
}
