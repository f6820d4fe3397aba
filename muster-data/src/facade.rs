//! The data access facade.
//!
//! `DataFacade` is the only surface the presentation layer calls. It owns the
//! composition of the local encrypted cache, the sync engine and the audit
//! rules: callers hand it a [`Session`] and a section, and it decides the
//! online/offline path, encrypts what lands in the cache, queues what cannot
//! reach the remote, and records every mutation in the audit trail.
//!
//! The facade is split across sibling modules by concern: member operations,
//! audit history and reverts, role/invite administration, and settings.

use std::collections::HashSet;
use std::sync::Arc;

use muster_crypto::{decrypt_string, encrypt_string, DerivedKey};
use muster_store::{CacheStore, ChangeNotifier, RefreshEvent};
use muster_sync::{
    FailureKind, RemoteRow, RemoteStore, SettingsStore, SubmitOutcome, SyncEngine, SyncReport,
    SyncStatus,
};
use muster_types::{AuditLog, PendingWrite, RowKind, Section};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{DataError, DataResult};
use crate::session::Session;

/// Permission gate. Privileged operations call this before touching any
/// state, so a denied call has no side effects at all.
pub(crate) fn require(allowed: bool, reason: &str) -> DataResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(DataError::Permission(reason.to_string()))
    }
}

/// Section gate for scoped mutations, checked alongside the role gate.
pub(crate) fn require_grant(session: &Session, section: Section) -> DataResult<()> {
    if session.grants(section) {
        Ok(())
    } else {
        Err(DataError::Permission(format!(
            "no grant for the {section} section"
        )))
    }
}

/// Composes the cache, crypto, sync and audit layers behind one API.
///
/// Cheap to clone; clones share the cache, the queue and the connectivity
/// state.
#[derive(Clone)]
pub struct DataFacade {
    pub(crate) store: CacheStore,
    pub(crate) remote: Arc<dyn RemoteStore>,
    pub(crate) engine: SyncEngine,
    pub(crate) settings: Arc<dyn SettingsStore>,
}

impl DataFacade {
    pub fn new(
        store: CacheStore,
        remote: Arc<dyn RemoteStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let engine = SyncEngine::new(store.clone(), remote.clone()).with_settings(settings.clone());
        Self {
            store,
            remote,
            engine,
            settings,
        }
    }

    /// The sync engine, for wiring up the background service loop.
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        self.store.notifier()
    }

    /// Subscribes to refresh events so long-lived views re-pull after any
    /// local mutation or completed sync.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.store.notifier().subscribe()
    }

    pub async fn status(&self) -> SyncStatus {
        self.engine.status().await
    }

    /// Replays the pending write queue now.
    pub async fn sync(&self, session: &Session) -> DataResult<SyncReport> {
        Ok(self.engine.sync_pending_writes(&session.key).await?)
    }

    // ── shared plumbing ─────────────────────────────────────────────────

    pub(crate) fn encode<T: Serialize>(&self, key: &DerivedKey, value: &T) -> DataResult<String> {
        let plain = serde_json::to_vec(value)?;
        Ok(encrypt_string(key, &plain)?)
    }

    pub(crate) fn decode<T: DeserializeOwned>(
        &self,
        key: &DerivedKey,
        blob: &str,
    ) -> DataResult<T> {
        let plain = decrypt_string(key, blob)?;
        Ok(serde_json::from_slice(&plain)?)
    }

    /// Encrypts `value` and upserts it into the cache.
    pub(crate) fn cache_put<T: Serialize>(
        &self,
        key: &DerivedKey,
        kind: RowKind,
        section_key: &str,
        id: &str,
        value: &T,
    ) -> DataResult<()> {
        let blob = self.encode(key, value)?;
        Ok(self.store.put(kind, section_key, id, &blob)?)
    }

    pub(crate) async fn submit_upsert(
        &self,
        kind: RowKind,
        section_key: &str,
        id: &str,
        payload: Value,
        session: &Session,
    ) -> DataResult<SubmitOutcome> {
        let write = PendingWrite::upsert(kind, section_key, id, payload);
        Ok(self.engine.submit_write(&write, &session.key).await?)
    }

    pub(crate) async fn submit_delete(
        &self,
        kind: RowKind,
        section_key: &str,
        id: &str,
        session: &Session,
    ) -> DataResult<SubmitOutcome> {
        let write = PendingWrite::delete(kind, section_key, id);
        Ok(self.engine.submit_write(&write, &session.key).await?)
    }

    /// Persists an audit entry locally and through the dual write path.
    /// Internal appends go through here; the public wrapper in the logs
    /// module re-stamps the actor first.
    pub(crate) async fn persist_log(&self, log: &AuditLog, session: &Session) -> DataResult<()> {
        let section_key = muster_types::section_key(log.section);
        let id = log.id.to_string();
        self.cache_put(&session.key, RowKind::AuditLogs, section_key, &id, log)?;
        self.submit_upsert(
            RowKind::AuditLogs,
            section_key,
            &id,
            serde_json::to_value(log)?,
            session,
        )
        .await?;
        Ok(())
    }

    /// Fetches one bucket of rows, remote-first with a cache fallback on a
    /// transient failure.
    pub(crate) async fn fetch_bucket<T>(
        &self,
        kind: RowKind,
        section_key: &str,
        session: &Session,
    ) -> DataResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        if self.engine.is_online() {
            match self.remote.fetch_rows(kind, section_key).await {
                Ok(rows) => return self.refresh_bucket(kind, section_key, rows, &session.key),
                Err(err) => match self.engine.classify_read(&err) {
                    FailureKind::Transient => {
                        debug!("remote fetch of {kind}/{section_key} failed, serving cache: {err}");
                        self.engine.connectivity().set_online(false);
                    }
                    _ => return Err(err.into()),
                },
            }
        }
        self.cached_bucket(kind, section_key, &session.key)
    }

    /// Writes fetched rows through the cache and returns the reconciled
    /// bucket. Rows with a queued local write keep their local state (the
    /// replay will deliver it); cached rows the remote no longer has are
    /// dropped unless a queued write explains them.
    pub(crate) fn refresh_bucket<T>(
        &self,
        kind: RowKind,
        section_key: &str,
        rows: Vec<RemoteRow>,
        key: &DerivedKey,
    ) -> DataResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let pending = self.store.pending_row_ids(kind)?;
        let mut out = Vec::with_capacity(rows.len());
        let mut remote_ids = HashSet::new();

        for row in rows {
            remote_ids.insert(row.id.clone());
            if pending.contains(&row.id) {
                match self.store.get(kind, section_key, &row.id)? {
                    Some(blob) => {
                        if let Ok(local) = self.decode::<T>(key, &blob) {
                            out.push(local);
                            continue;
                        }
                    }
                    // Deleted locally; the queued delete will catch the
                    // remote up
                    None => continue,
                }
            }
            let value: T = serde_json::from_value(row.payload)?;
            self.cache_put(key, kind, section_key, &row.id, &value)?;
            out.push(value);
        }

        for cached in self.store.get_all(kind, section_key)? {
            if remote_ids.contains(&cached.id) {
                continue;
            }
            if pending.contains(&cached.id) {
                if let Ok(value) = self.decode::<T>(key, &cached.blob) {
                    out.push(value);
                    continue;
                }
            }
            self.store.remove(kind, section_key, &cached.id)?;
        }
        Ok(out)
    }

    /// Decrypts a whole cached bucket. Unreadable rows are skipped with a
    /// warning; the next successful remote fetch re-encrypts them.
    pub(crate) fn cached_bucket<T: DeserializeOwned>(
        &self,
        kind: RowKind,
        section_key: &str,
        key: &DerivedKey,
    ) -> DataResult<Vec<T>> {
        let rows = self.store.get_all(kind, section_key)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match self.decode::<T>(key, &row.blob) {
                Ok(value) => out.push(value),
                Err(err) => {
                    warn!("cached {kind} row {} is unreadable: {err}", row.id);
                }
            }
        }
        Ok(out)
    }
}
