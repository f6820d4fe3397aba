//! Role assignments and invite codes. Both are organisation-wide, so every
//! row lives in the global bucket and audit entries carry no section.

use chrono::TimeDelta;
use muster_sync::FailureKind;
use muster_types::{
    AuditAction, AuditLog, InviteCode, RevertData, Role, RowKind, Section, UserRole,
    GLOBAL_SECTION,
};
use serde_json::to_value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DataError, DataResult};
use crate::facade::{require, DataFacade};
use crate::session::Session;

impl DataFacade {
    /// Every role assignment in the organisation, ordered by email.
    pub async fn fetch_user_roles(&self, session: &Session) -> DataResult<Vec<UserRole>> {
        require(session.role.can_manage_roles(), "viewing roles requires the captain role")?;
        let mut roles: Vec<UserRole> = self
            .fetch_bucket(RowKind::Roles, GLOBAL_SECTION, session)
            .await?;
        roles.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(roles)
    }

    /// Assigns or changes a user's role. The audit entry captures the prior
    /// assignment when one existed, so reverting a first-time assignment
    /// removes the role entirely.
    pub async fn update_user_role(
        &self,
        user: UserRole,
        session: &Session,
    ) -> DataResult<UserRole> {
        require(session.role.can_manage_roles(), "changing roles requires the captain role")?;

        let prior = self.lookup_role(&user.email, session).await?;
        self.cache_put(&session.key, RowKind::Roles, GLOBAL_SECTION, &user.email, &user)?;
        self.submit_upsert(RowKind::Roles, GLOBAL_SECTION, &user.email, to_value(&user)?, session)
            .await?;

        let data = match prior {
            Some(prior) => RevertData::PriorRole { user: prior },
            None => RevertData::NewRole { email: user.email.clone() },
        };
        let log = AuditLog::new(
            AuditAction::UpdateUserRole,
            None,
            session.email.clone(),
            format!("Set {} to {}", user.email, user.role),
            Some(data),
        );
        self.persist_log(&log, session).await?;
        Ok(user)
    }

    /// Removes a user's role assignment.
    pub async fn delete_user_role(&self, email: &str, session: &Session) -> DataResult<()> {
        require(session.role.can_manage_roles(), "changing roles requires the captain role")?;

        let Some(prior) = self.lookup_role(email, session).await? else {
            return Err(DataError::NotFound(format!("role for {email}")));
        };
        self.store.remove(RowKind::Roles, GLOBAL_SECTION, email)?;
        self.submit_delete(RowKind::Roles, GLOBAL_SECTION, email, session).await?;

        let log = AuditLog::new(
            AuditAction::DeleteUserRole,
            None,
            session.email.clone(),
            format!("Removed role for {email}"),
            Some(RevertData::PriorRole { user: prior }),
        );
        self.persist_log(&log, session).await?;
        Ok(())
    }

    /// Every invite code, newest first.
    pub async fn fetch_invites(&self, session: &Session) -> DataResult<Vec<InviteCode>> {
        require(session.role.can_manage_invites(), "viewing invites requires the captain role")?;
        let mut invites: Vec<InviteCode> = self
            .fetch_bucket(RowKind::Invites, GLOBAL_SECTION, session)
            .await?;
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invites)
    }

    /// Creates an invite granting `role` over `sections` until it expires.
    pub async fn generate_invite(
        &self,
        role: Role,
        sections: Vec<Section>,
        valid_for: TimeDelta,
        session: &Session,
    ) -> DataResult<InviteCode> {
        require(
            session.role.can_manage_invites(),
            "generating invites requires the captain role",
        )?;

        let invite = InviteCode::generate(role, sections, valid_for, session.email.clone());
        let id = invite.id.to_string();
        self.cache_put(&session.key, RowKind::Invites, GLOBAL_SECTION, &id, &invite)?;
        self.submit_upsert(RowKind::Invites, GLOBAL_SECTION, &id, to_value(&invite)?, session)
            .await?;

        let log = AuditLog::new(
            AuditAction::GenerateInvite,
            None,
            session.email.clone(),
            format!("Generated invite {}", invite.code),
            Some(RevertData::CreatedInvite { invite_id: invite.id }),
        );
        self.persist_log(&log, session).await?;
        Ok(invite)
    }

    /// Edits an invite in place. Role, sections and expiry can change;
    /// redemption state cannot be edited back to unused this way.
    pub async fn update_invite(
        &self,
        invite: InviteCode,
        session: &Session,
    ) -> DataResult<InviteCode> {
        require(session.role.can_manage_invites(), "editing invites requires the captain role")?;

        let id = invite.id.to_string();
        let Some(prior) = self.lookup_invite(&id, session).await? else {
            return Err(DataError::NotFound(format!("invite {}", invite.id)));
        };
        self.cache_put(&session.key, RowKind::Invites, GLOBAL_SECTION, &id, &invite)?;
        self.submit_upsert(RowKind::Invites, GLOBAL_SECTION, &id, to_value(&invite)?, session)
            .await?;

        let log = AuditLog::new(
            AuditAction::UpdateInvite,
            None,
            session.email.clone(),
            format!("Updated invite {}", invite.code),
            Some(RevertData::PriorInvite { invite: prior }),
        );
        self.persist_log(&log, session).await?;
        Ok(invite)
    }

    /// Marks an invite revoked so it can no longer be redeemed.
    pub async fn revoke_invite(
        &self,
        invite_id: Uuid,
        session: &Session,
    ) -> DataResult<InviteCode> {
        require(session.role.can_manage_invites(), "revoking invites requires the captain role")?;

        let id = invite_id.to_string();
        let Some(mut invite) = self.lookup_invite(&id, session).await? else {
            return Err(DataError::NotFound(format!("invite {invite_id}")));
        };
        let prior = invite.clone();
        invite.revoked = true;
        self.cache_put(&session.key, RowKind::Invites, GLOBAL_SECTION, &id, &invite)?;
        self.submit_upsert(RowKind::Invites, GLOBAL_SECTION, &id, to_value(&invite)?, session)
            .await?;

        let log = AuditLog::new(
            AuditAction::UpdateInvite,
            None,
            session.email.clone(),
            format!("Revoked invite {}", invite.code),
            Some(RevertData::PriorInvite { invite: prior }),
        );
        self.persist_log(&log, session).await?;
        Ok(invite)
    }

    /// Redeems an invite code for the signed-in user, granting them the
    /// invite's role. No permission gate: the redeemer is typically still
    /// `Pending`.
    pub async fn redeem_invite(&self, code: &str, session: &Session) -> DataResult<UserRole> {
        let invites: Vec<InviteCode> = self
            .fetch_bucket(RowKind::Invites, GLOBAL_SECTION, session)
            .await?;
        let Some(mut invite) = invites.into_iter().find(|i| i.code == code) else {
            return Err(DataError::InvalidInvite(format!("code {code} not found")));
        };
        if invite.revoked {
            return Err(DataError::InvalidInvite("the code was revoked".into()));
        }
        if invite.used_by.is_some() {
            return Err(DataError::InvalidInvite("the code was already used".into()));
        }
        if invite.is_expired() {
            return Err(DataError::InvalidInvite("the code has expired".into()));
        }

        invite.used_by = Some(session.email.clone());
        let invite_row = invite.id.to_string();
        self.cache_put(&session.key, RowKind::Invites, GLOBAL_SECTION, &invite_row, &invite)?;
        self.submit_upsert(
            RowKind::Invites,
            GLOBAL_SECTION,
            &invite_row,
            to_value(&invite)?,
            session,
        )
        .await?;

        let user = UserRole::new(session.email.clone(), invite.role, invite.sections.clone());
        let data = match self.lookup_role(&user.email, session).await? {
            Some(prior) => RevertData::PriorRole { user: prior },
            None => RevertData::NewRole { email: user.email.clone() },
        };
        self.cache_put(&session.key, RowKind::Roles, GLOBAL_SECTION, &user.email, &user)?;
        self.submit_upsert(RowKind::Roles, GLOBAL_SECTION, &user.email, to_value(&user)?, session)
            .await?;

        let log = AuditLog::new(
            AuditAction::UpdateUserRole,
            None,
            session.email.clone(),
            format!("Redeemed invite {} as {}", invite.code, user.role),
            Some(data),
        );
        self.persist_log(&log, session).await?;
        Ok(user)
    }

    /// A single role row by email, preferring the cache, falling back to the
    /// remote when online.
    pub(crate) async fn lookup_role(
        &self,
        email: &str,
        session: &Session,
    ) -> DataResult<Option<UserRole>> {
        if let Some(blob) = self.store.get(RowKind::Roles, GLOBAL_SECTION, email)? {
            match self.decode::<UserRole>(&session.key, &blob) {
                Ok(user) => return Ok(Some(user)),
                Err(err) => warn!("cached role for {email} is unreadable: {err}"),
            }
        }
        if self.engine.is_online() {
            match self.remote.fetch_row(RowKind::Roles, GLOBAL_SECTION, email).await {
                Ok(Some(row)) => {
                    let user: UserRole = serde_json::from_value(row.payload)?;
                    self.cache_put(&session.key, RowKind::Roles, GLOBAL_SECTION, email, &user)?;
                    return Ok(Some(user));
                }
                Ok(None) => return Ok(None),
                Err(err) if self.engine.classify_read(&err) == FailureKind::Transient => {
                    debug!("remote role lookup failed, staying on cache: {err}");
                    self.engine.connectivity().set_online(false);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }

    /// A single invite row by id, same cache-then-remote order as
    /// [`DataFacade::lookup_role`].
    pub(crate) async fn lookup_invite(
        &self,
        id: &str,
        session: &Session,
    ) -> DataResult<Option<InviteCode>> {
        if let Some(blob) = self.store.get(RowKind::Invites, GLOBAL_SECTION, id)? {
            match self.decode::<InviteCode>(&session.key, &blob) {
                Ok(invite) => return Ok(Some(invite)),
                Err(err) => warn!("cached invite {id} is unreadable: {err}"),
            }
        }
        if self.engine.is_online() {
            match self.remote.fetch_row(RowKind::Invites, GLOBAL_SECTION, id).await {
                Ok(Some(row)) => {
                    let invite: InviteCode = serde_json::from_value(row.payload)?;
                    self.cache_put(&session.key, RowKind::Invites, GLOBAL_SECTION, id, &invite)?;
                    return Ok(Some(invite));
                }
                Ok(None) => return Ok(None),
                Err(err) if self.engine.classify_read(&err) == FailureKind::Transient => {
                    debug!("remote invite lookup failed, staying on cache: {err}");
                    self.engine.connectivity().set_online(false);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }
}
