//! Facade tests for the audit history: fetching, custom entries, clearing,
//! and the append-only guarantee.

mod support;

use muster_data::DataError;
use muster_types::{AuditAction, AuditLog, Role, RowKind, Section, UserRole};
use pretty_assertions::assert_eq;
use support::{admin, captain, facade, new_member, officer};

#[tokio::test]
async fn section_history_includes_the_global_entries_newest_first() {
    let (facade, _remote, _settings, key) = facade();
    let officer = officer(&key);
    let captain = captain(&key);

    facade
        .create_member(Section::Juniors, new_member("Robin"), &officer)
        .await
        .unwrap();
    facade
        .update_user_role(
            UserRole::new("sam@example.org", Role::Officer, vec![Section::Juniors]),
            &captain,
        )
        .await
        .unwrap();

    let logs = facade
        .fetch_audit_logs(Some(Section::Juniors), &officer)
        .await
        .unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, AuditAction::UpdateUserRole);
    assert_eq!(logs[0].section, None);
    assert_eq!(logs[1].action, AuditAction::CreateMember);
    assert_eq!(logs[1].section, Some(Section::Juniors));

    // The global bucket alone has only the role change
    let global = facade.fetch_audit_logs(None, &officer).await.unwrap();
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].action, AuditAction::UpdateUserRole);
}

#[tokio::test]
async fn custom_entries_are_stamped_with_the_session_actor() {
    let (facade, _remote, _settings, key) = facade();
    let officer = officer(&key);

    let entry = AuditLog::new(
        AuditAction::UpdateSettings,
        Some(Section::Juniors),
        "spoofed@example.org",
        "Adjusted the parade night",
        None,
    );
    let stored = facade.create_audit_log(entry, &officer).await.unwrap();
    assert_eq!(stored.actor_email, "officer@example.org");

    let logs = facade
        .fetch_audit_logs(Some(Section::Juniors), &officer)
        .await
        .unwrap();
    assert_eq!(logs[0].actor_email, "officer@example.org");
}

#[tokio::test]
async fn reverting_leaves_the_original_entry_untouched() {
    let (facade, _remote, _settings, key) = facade();
    let officer = officer(&key);
    let captain = captain(&key);

    facade
        .create_member(Section::Juniors, new_member("Robin"), &officer)
        .await
        .unwrap();
    let original = facade
        .fetch_audit_logs(Some(Section::Juniors), &officer)
        .await
        .unwrap()
        .remove(0);

    let revert = facade
        .revert_log(original.id, Some(Section::Juniors), &captain)
        .await
        .unwrap();
    assert_eq!(revert.reverted_log_id, Some(original.id));

    let history = facade
        .fetch_audit_logs(Some(Section::Juniors), &officer)
        .await
        .unwrap();
    let kept = history.iter().find(|l| l.id == original.id).unwrap();
    assert_eq!(kept, &original, "the reverted entry must read exactly as before");
}

#[tokio::test]
async fn clearing_requires_the_admin_role() {
    let (facade, _remote, _settings, key) = facade();
    let officer = officer(&key);
    let captain = captain(&key);

    facade
        .create_member(Section::Juniors, new_member("Robin"), &officer)
        .await
        .unwrap();

    let err = facade
        .clear_audit_logs(Some(Section::Juniors), &captain)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Permission(_)));

    let logs = facade
        .fetch_audit_logs(Some(Section::Juniors), &officer)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1, "a denied clear must leave the history alone");
}

#[tokio::test]
async fn clearing_removes_the_bucket_and_records_the_count() {
    let (facade, remote, _settings, key) = facade();
    let officer = officer(&key);
    let admin = admin(&key);

    facade
        .create_member(Section::Juniors, new_member("Robin"), &officer)
        .await
        .unwrap();
    facade
        .create_member(Section::Juniors, new_member("Morgan"), &officer)
        .await
        .unwrap();

    let cleared = facade
        .clear_audit_logs(Some(Section::Juniors), &admin)
        .await
        .unwrap();
    assert_eq!(cleared, 2);

    let logs = facade
        .fetch_audit_logs(Some(Section::Juniors), &officer)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, AuditAction::ClearLogs);
    assert_eq!(logs[0].description, "Cleared 2 audit log entries");

    // The remote bucket holds only the clear entry now
    assert_eq!(remote.row_count(RowKind::AuditLogs, "juniors"), 1);
}

#[tokio::test]
async fn history_is_served_from_the_cache_offline() {
    let (facade, remote, _settings, key) = facade();
    let officer = officer(&key);

    facade
        .create_member(Section::Juniors, new_member("Robin"), &officer)
        .await
        .unwrap();

    remote.set_offline(true);
    let logs = facade
        .fetch_audit_logs(Some(Section::Juniors), &officer)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, AuditAction::CreateMember);
    assert!(!facade.status().await.online);
}
