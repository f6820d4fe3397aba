//! Member roster operations: fetch, create, update, delete, and the weekly
//! mark-recording flow.

use std::collections::HashSet;

use futures::future::join_all;
use muster_sync::{FailureKind, RemoteRow};
use muster_types::{
    AuditAction, AuditLog, Mark, Member, MemberId, NewMember, RevertData, RowKind, Section,
};
use tracing::{debug, warn};

use crate::error::{DataError, DataResult};
use crate::facade::{require, require_grant, DataFacade};
use crate::merge::merge_member;
use crate::session::Session;

/// One member's attendance input for a parade night.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkEntry {
    pub member_id: MemberId,
    pub present: bool,
    pub score: Option<i32>,
    pub uniform: Option<i32>,
    pub behaviour: Option<i32>,
}

impl MarkEntry {
    pub fn present(member_id: MemberId, score: i32) -> Self {
        Self {
            member_id,
            present: true,
            score: Some(score),
            uniform: None,
            behaviour: None,
        }
    }

    pub fn absent(member_id: MemberId) -> Self {
        Self {
            member_id,
            present: false,
            score: None,
            uniform: None,
            behaviour: None,
        }
    }
}

impl DataFacade {
    /// Fetches a section's roster, remote-first. A transient remote failure
    /// flips the engine offline and serves the cache instead; an unreadable
    /// cache falls back the other way, to a clean remote fetch.
    pub async fn fetch_members(
        &self,
        section: Section,
        session: &Session,
    ) -> DataResult<Vec<Member>> {
        if self.engine.is_online() {
            match self.remote.fetch_rows(RowKind::Members, section.as_str()).await {
                Ok(rows) => return self.refresh_member_cache(section, rows, session),
                Err(err) => match self.engine.classify_read(&err) {
                    FailureKind::Transient => {
                        debug!("remote fetch of members/{section} failed, serving cache: {err}");
                        self.engine.connectivity().set_online(false);
                    }
                    _ => return Err(err.into()),
                },
            }
        }
        self.cached_members(section, session).await
    }

    pub async fn create_member(
        &self,
        section: Section,
        new: NewMember,
        session: &Session,
    ) -> DataResult<Member> {
        require(session.role.can_edit_roster(), "editing the roster requires the officer role")?;
        require_grant(session, section)?;

        // The id is generated here, before any network call, so an offline
        // create replays under the same id
        let mut member = Member::new(section, new.name, new.year, new.squad);
        member.is_leader = new.is_leader;
        let id = member.id.to_string();

        self.cache_put(&session.key, RowKind::Members, section.as_str(), &id, &member)?;
        self.submit_upsert(
            RowKind::Members,
            section.as_str(),
            &id,
            serde_json::to_value(&member)?,
            session,
        )
        .await?;

        let log = AuditLog::new(
            AuditAction::CreateMember,
            Some(section),
            session.email.clone(),
            format!("Added {}", member.name),
            Some(RevertData::CreatedMember { member_id: member.id }),
        );
        self.persist_log(&log, session).await?;
        Ok(member)
    }

    pub async fn update_member(
        &self,
        section: Section,
        member: Member,
        session: &Session,
    ) -> DataResult<Member> {
        require(session.role.can_edit_roster(), "editing the roster requires the officer role")?;
        require_grant(session, section)?;

        let id = member.id.to_string();
        let Some(prior) = self.lookup_member(section, &id, session).await? else {
            return Err(DataError::NotFound(format!("member {id}")));
        };

        self.cache_put(&session.key, RowKind::Members, section.as_str(), &id, &member)?;
        self.submit_upsert(
            RowKind::Members,
            section.as_str(),
            &id,
            serde_json::to_value(&member)?,
            session,
        )
        .await?;

        let log = AuditLog::new(
            AuditAction::UpdateMember,
            Some(section),
            session.email.clone(),
            format!("Updated {}", member.name),
            Some(RevertData::PriorMember { member: prior }),
        );
        self.persist_log(&log, session).await?;
        Ok(member)
    }

    /// Batch update: one audit entry covering every member, then the remote
    /// writes fanned out together.
    pub async fn update_members(
        &self,
        section: Section,
        members: Vec<Member>,
        session: &Session,
    ) -> DataResult<usize> {
        require(session.role.can_edit_roster(), "editing the roster requires the officer role")?;
        require_grant(session, section)?;
        if members.is_empty() {
            return Ok(0);
        }

        let mut priors = Vec::with_capacity(members.len());
        for member in &members {
            if let Some(prior) = self.lookup_member(section, &member.id.to_string(), session).await? {
                priors.push(prior);
            }
        }
        for member in &members {
            self.cache_put(
                &session.key,
                RowKind::Members,
                section.as_str(),
                &member.id.to_string(),
                member,
            )?;
        }

        let log = AuditLog::new(
            AuditAction::UpdateMembers,
            Some(section),
            session.email.clone(),
            format!("Updated {} members", members.len()),
            Some(RevertData::PriorMembers { members: priors }),
        );
        self.persist_log(&log, session).await?;

        self.submit_members(section.as_str(), &members, session).await?;
        Ok(members.len())
    }

    pub async fn delete_member(
        &self,
        section: Section,
        id: MemberId,
        session: &Session,
    ) -> DataResult<()> {
        require(session.role.can_edit_roster(), "editing the roster requires the officer role")?;
        require_grant(session, section)?;

        let row_id = id.to_string();
        let Some(member) = self.lookup_member(section, &row_id, session).await? else {
            return Err(DataError::NotFound(format!("member {id}")));
        };

        self.store.remove(RowKind::Members, section.as_str(), &row_id)?;
        self.submit_delete(RowKind::Members, section.as_str(), &row_id, session).await?;

        let log = AuditLog::new(
            AuditAction::DeleteMember,
            Some(section),
            session.email.clone(),
            format!("Removed {}", member.name),
            Some(RevertData::DeletedMember { member }),
        );
        self.persist_log(&log, session).await?;
        Ok(())
    }

    /// Records one parade night's marks. Absent members get the absence
    /// sentinel; a present member with no score entered is skipped rather
    /// than defaulted to zero. Returns how many members were written.
    pub async fn record_marks(
        &self,
        section: Section,
        date: &str,
        entries: Vec<MarkEntry>,
        session: &Session,
    ) -> DataResult<usize> {
        require(session.role.can_record_marks(), "recording marks requires the officer role")?;
        require_grant(session, section)?;

        let mut priors = Vec::new();
        let mut updated = Vec::new();
        for entry in entries {
            let mark = if !entry.present {
                Mark::absent(date)
            } else if let Some(score) = entry.score {
                let mut mark = Mark::present(date, score);
                mark.uniform = entry.uniform;
                mark.behaviour = entry.behaviour;
                mark
            } else {
                continue;
            };

            let id = entry.member_id.to_string();
            let Some(member) = self.lookup_member(section, &id, session).await? else {
                warn!("skipping marks for unknown member {id}");
                continue;
            };
            priors.push(member.clone());
            let mut member = member;
            member.upsert_mark(mark);
            self.cache_put(&session.key, RowKind::Members, section.as_str(), &id, &member)?;
            updated.push(member);
        }
        if updated.is_empty() {
            return Ok(0);
        }

        let log = AuditLog::new(
            AuditAction::UpdateMembers,
            Some(section),
            session.email.clone(),
            format!("Recorded marks for {} members on {date}", updated.len()),
            Some(RevertData::PriorMembers { members: priors }),
        );
        self.persist_log(&log, session).await?;

        self.submit_members(section.as_str(), &updated, session).await?;
        Ok(updated.len())
    }

    /// Upserts a batch of members remotely, fanned out and joined so no two
    /// writes for the same member overlap.
    pub(crate) async fn submit_members(
        &self,
        section_key: &str,
        members: &[Member],
        session: &Session,
    ) -> DataResult<()> {
        let mut payloads = Vec::with_capacity(members.len());
        for member in members {
            payloads.push((member.id.to_string(), serde_json::to_value(member)?));
        }
        let writes = payloads.iter().map(|(id, payload)| {
            self.submit_upsert(RowKind::Members, section_key, id, payload.clone(), session)
        });
        for result in join_all(writes).await {
            result?;
        }
        Ok(())
    }

    /// The cached roster. If any row fails to decrypt the cache is treated
    /// as unusable and the roster is refetched from the remote.
    async fn cached_members(&self, section: Section, session: &Session) -> DataResult<Vec<Member>> {
        let rows = self.store.get_all(RowKind::Members, section.as_str())?;
        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            match self.decode::<Member>(&session.key, &row.blob) {
                Ok(member) => members.push(member),
                Err(err) => {
                    warn!("cached member {} is unreadable, refetching: {err}", row.id);
                    let rows = self.remote.fetch_rows(RowKind::Members, section.as_str()).await?;
                    return self.refresh_member_cache(section, rows, session);
                }
            }
        }
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    /// Merges fetched rows into the cache. Members with a queued local write
    /// keep their local marks on collision; cached members the remote no
    /// longer has are dropped unless a queued write explains them.
    fn refresh_member_cache(
        &self,
        section: Section,
        rows: Vec<RemoteRow>,
        session: &Session,
    ) -> DataResult<Vec<Member>> {
        let key = section.as_str();
        let pending = self.store.pending_row_ids(RowKind::Members)?;
        let mut remote_ids = HashSet::new();
        let mut members = Vec::with_capacity(rows.len());

        for row in rows {
            remote_ids.insert(row.id.clone());
            let remote: Member = serde_json::from_value(row.payload)?;
            let cached = self
                .store
                .get(RowKind::Members, key, &row.id)?
                .and_then(|blob| self.decode::<Member>(&session.key, &blob).ok());
            let has_pending = pending.contains(&row.id);
            if cached.is_none() && has_pending {
                // Deleted locally; the queued delete will catch the remote up
                continue;
            }
            let merged = match cached {
                Some(local) => merge_member(remote, &local, has_pending),
                None => remote,
            };
            self.cache_put(&session.key, RowKind::Members, key, &row.id, &merged)?;
            members.push(merged);
        }

        for cached in self.store.get_all(RowKind::Members, key)? {
            if remote_ids.contains(&cached.id) {
                continue;
            }
            if pending.contains(&cached.id) {
                if let Ok(member) = self.decode::<Member>(&session.key, &cached.blob) {
                    members.push(member);
                    continue;
                }
            }
            self.store.remove(RowKind::Members, key, &cached.id)?;
        }

        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    /// Looks a member up in the cache, then remotely if the cache cannot
    /// answer. `None` means the member does not exist anywhere reachable.
    pub(crate) async fn lookup_member(
        &self,
        section: Section,
        id: &str,
        session: &Session,
    ) -> DataResult<Option<Member>> {
        if let Some(blob) = self.store.get(RowKind::Members, section.as_str(), id)? {
            match self.decode::<Member>(&session.key, &blob) {
                Ok(member) => return Ok(Some(member)),
                Err(err) => warn!("cached member {id} is unreadable: {err}"),
            }
        }
        if self.engine.is_online() {
            match self.remote.fetch_row(RowKind::Members, section.as_str(), id).await {
                Ok(Some(row)) => return Ok(Some(serde_json::from_value(row.payload)?)),
                Ok(None) => return Ok(None),
                Err(err) => match self.engine.classify_read(&err) {
                    FailureKind::Transient => {
                        self.engine.connectivity().set_online(false);
                    }
                    _ => return Err(err.into()),
                },
            }
        }
        Ok(None)
    }
}
