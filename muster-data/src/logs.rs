//! Audit history and revert execution.

use futures::future::join_all;
use muster_audit::{ensure_revertible, newest_first, RevertPlan};
use muster_types::{
    section_key, AuditAction, AuditLog, RowKind, Section, GLOBAL_SECTION,
};
use serde_json::to_value;
use tracing::info;
use uuid::Uuid;

use crate::error::{DataError, DataResult};
use crate::facade::{require, require_grant, DataFacade};
use crate::session::Session;

impl DataFacade {
    /// Appends an audit entry. The actor is stamped from the session, never
    /// taken from the entry itself.
    pub async fn create_audit_log(
        &self,
        mut log: AuditLog,
        session: &Session,
    ) -> DataResult<AuditLog> {
        log.actor_email = session.email.clone();
        self.persist_log(&log, session).await?;
        Ok(log)
    }

    /// The audit history for a section plus the global entries, newest
    /// first. `None` fetches the global bucket alone.
    pub async fn fetch_audit_logs(
        &self,
        section: Option<Section>,
        session: &Session,
    ) -> DataResult<Vec<AuditLog>> {
        let mut logs: Vec<AuditLog> = self
            .fetch_bucket(RowKind::AuditLogs, section_key(section), session)
            .await?;
        if section.is_some() {
            logs.extend(
                self.fetch_bucket::<AuditLog>(RowKind::AuditLogs, GLOBAL_SECTION, session)
                    .await?,
            );
        }
        Ok(newest_first(logs))
    }

    /// Undoes a previously logged action.
    ///
    /// Checks the session's role, the at-most-once-revert rule and the
    /// entry's revert data before touching anything; if any of those fail,
    /// or the inverse writes themselves fail, no `RevertAction` entry is
    /// appended. On success the new entry points back at the original,
    /// which is never edited.
    pub async fn revert_log(
        &self,
        log_id: Uuid,
        section: Option<Section>,
        session: &Session,
    ) -> DataResult<AuditLog> {
        require(session.role.can_revert(), "reverting requires the captain role")?;
        if let Some(section) = section {
            require_grant(session, section)?;
        }

        let history = self.fetch_audit_logs(section, session).await?;
        let Some(target) = history.iter().find(|l| l.id == log_id) else {
            return Err(DataError::NotFound(format!("audit log {log_id}")));
        };
        let plan = ensure_revertible(&history, target)?;
        self.execute_plan(plan, target, session).await?;

        let revert = AuditLog::revert_of(
            target,
            session.email.clone(),
            format!("Reverted: {}", target.description),
        );
        self.persist_log(&revert, session).await?;
        info!("reverted audit entry {log_id} ({})", target.action);
        Ok(revert)
    }

    /// Admin only. Clears one section's history bucket (or the global bucket)
    /// and appends a `ClearLogs` entry recording how many were removed.
    /// Clearing is itself not revertible.
    pub async fn clear_audit_logs(
        &self,
        section: Option<Section>,
        session: &Session,
    ) -> DataResult<usize> {
        require(session.role.can_clear_logs(), "clearing the audit log requires the admin role")?;

        let key = section_key(section);
        let logs: Vec<AuditLog> = self.fetch_bucket(RowKind::AuditLogs, key, session).await?;
        let ids: Vec<String> = logs.iter().map(|l| l.id.to_string()).collect();

        self.store.remove_all(RowKind::AuditLogs, key)?;
        let deletes = ids
            .iter()
            .map(|id| self.submit_delete(RowKind::AuditLogs, key, id, session));
        for result in join_all(deletes).await {
            result?;
        }

        let entry = AuditLog::new(
            AuditAction::ClearLogs,
            section,
            session.email.clone(),
            format!("Cleared {} audit log entries", ids.len()),
            None,
        );
        self.persist_log(&entry, session).await?;
        info!("cleared {} audit entries from {key}", ids.len());
        Ok(ids.len())
    }

    /// Runs the inverse writes for one revert plan. No per-write audit
    /// entries are appended here; the single `RevertAction` entry the caller
    /// appends afterwards is the record.
    async fn execute_plan(
        &self,
        plan: RevertPlan,
        target: &AuditLog,
        session: &Session,
    ) -> DataResult<()> {
        match plan {
            RevertPlan::DeleteMember { member_id } => {
                let key = section_key(target.section);
                let id = member_id.to_string();
                self.store.remove(RowKind::Members, key, &id)?;
                self.submit_delete(RowKind::Members, key, &id, session).await?;
            }
            RevertPlan::RestoreMember { member } => {
                let key = member.section.as_str();
                let id = member.id.to_string();
                self.cache_put(&session.key, RowKind::Members, key, &id, &member)?;
                self.submit_upsert(RowKind::Members, key, &id, to_value(&member)?, session)
                    .await?;
            }
            RevertPlan::RestoreMembers { members } => {
                for member in &members {
                    self.cache_put(
                        &session.key,
                        RowKind::Members,
                        member.section.as_str(),
                        &member.id.to_string(),
                        member,
                    )?;
                }
                // A batch always covers a single section
                if let Some(first) = members.first() {
                    self.submit_members(first.section.as_str(), &members, session).await?;
                }
            }
            RevertPlan::RestoreSettings { settings } => {
                let key = section_key(target.section);
                self.cache_put(&session.key, RowKind::Settings, key, key, &settings)?;
                self.submit_upsert(RowKind::Settings, key, key, settings, session).await?;
            }
            RevertPlan::RestoreRole { user } => {
                let id = user.email.clone();
                self.cache_put(&session.key, RowKind::Roles, GLOBAL_SECTION, &id, &user)?;
                self.submit_upsert(RowKind::Roles, GLOBAL_SECTION, &id, to_value(&user)?, session)
                    .await?;
            }
            RevertPlan::RemoveRole { email } => {
                self.store.remove(RowKind::Roles, GLOBAL_SECTION, &email)?;
                self.submit_delete(RowKind::Roles, GLOBAL_SECTION, &email, session).await?;
            }
            RevertPlan::RevokeInvite { invite_id } => {
                let id = invite_id.to_string();
                let Some(mut invite) = self.lookup_invite(&id, session).await? else {
                    return Err(DataError::NotFound(format!("invite {invite_id}")));
                };
                invite.revoked = true;
                self.cache_put(&session.key, RowKind::Invites, GLOBAL_SECTION, &id, &invite)?;
                self.submit_upsert(RowKind::Invites, GLOBAL_SECTION, &id, to_value(&invite)?, session)
                    .await?;
            }
            RevertPlan::RestoreInvite { invite } => {
                let id = invite.id.to_string();
                self.cache_put(&session.key, RowKind::Invites, GLOBAL_SECTION, &id, &invite)?;
                self.submit_upsert(RowKind::Invites, GLOBAL_SECTION, &id, to_value(&invite)?, session)
                    .await?;
            }
        }
        Ok(())
    }
}
