//! The sync engine: dual-path writes and queued-write replay.
//!
//! Every mutation goes through [`SyncEngine::submit_write`]. The caller has
//! already applied it to the local cache, so the engine only decides what
//! happens remotely: apply now, queue for later, or reject. Replay walks the
//! queue in enqueue order and leans on the remote's idempotent writes to
//! make repeated passes safe.

use std::sync::Arc;

use chrono::Utc;
use muster_crypto::{decrypt_string, encrypt_string, DerivedKey};
use muster_store::{CacheStore, QueuedWrite, RefreshTopic};
use muster_types::{PendingWrite, RowKind, WriteOp};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::classify::{FailureClassifier, FailureKind, HttpStatusClassifier};
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteResult, RemoteStore, SettingsStore};
use crate::status::{ConnectivityState, SyncStatus};

/// Where a submitted write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Applied remotely (or already there).
    Synced,
    /// Queued for replay; the remote has not seen it yet.
    Queued,
}

/// Result of one full replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Writes the remote accepted (including duplicates of earlier attempts).
    pub applied: usize,
    /// Writes the remote permanently rejected and replay dropped.
    pub discarded: usize,
}

#[derive(Default)]
struct EngineInner {
    last_sync_at: Option<chrono::DateTime<Utc>>,
    last_error: Option<String>,
}

/// Coordinates the local cache, the queue and the remote. Cheap to clone;
/// clones share all state.
#[derive(Clone)]
pub struct SyncEngine {
    store: CacheStore,
    remote: Arc<dyn RemoteStore>,
    settings: Option<Arc<dyn SettingsStore>>,
    classifier: Arc<dyn FailureClassifier>,
    connectivity: ConnectivityState,
    inner: Arc<RwLock<EngineInner>>,
}

impl SyncEngine {
    pub fn new(store: CacheStore, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            remote,
            settings: None,
            classifier: Arc::new(HttpStatusClassifier),
            connectivity: ConnectivityState::new(),
            inner: Arc::new(RwLock::new(EngineInner::default())),
        }
    }

    /// Routes queued settings writes through the settings collaborator
    /// instead of the row store.
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn connectivity(&self) -> &ConnectivityState {
        &self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn classify_read(&self, err: &crate::remote::RemoteError) -> FailureKind {
        self.classifier.classify_read(err)
    }

    pub fn pending_count(&self) -> SyncResult<usize> {
        Ok(self.store.pending_count()?)
    }

    pub async fn status(&self) -> SyncStatus {
        let inner = self.inner.read().await;
        SyncStatus {
            online: self.connectivity.is_online(),
            pending: self.store.pending_count().unwrap_or(0),
            last_sync_at: inner.last_sync_at,
            last_error: inner.last_error.clone(),
        }
    }

    /// Submits one write. Online: try the remote now; a transient failure
    /// flips the engine offline and queues the write instead, a permanent
    /// rejection surfaces as [`SyncError::Rejected`]. Offline: queue
    /// immediately.
    ///
    /// The caller has already applied the write locally, so `Queued` is a
    /// success from the user's point of view.
    pub async fn submit_write(
        &self,
        write: &PendingWrite,
        key: &DerivedKey,
    ) -> SyncResult<SubmitOutcome> {
        if !self.connectivity.is_online() {
            let seq = self.enqueue_encrypted(write, key)?;
            debug!("offline, queued {} {} as seq {seq}", write.op, write.row_id);
            return Ok(SubmitOutcome::Queued);
        }

        match self
            .apply_remote(write.op, write.kind, &write.section_key, &write.row_id, &write.payload)
            .await
        {
            Ok(()) => Ok(SubmitOutcome::Synced),
            Err(err) => match self.classifier.classify_write(write.op, &err) {
                FailureKind::AlreadyApplied => {
                    debug!("write {} already applied remotely", write.row_id);
                    Ok(SubmitOutcome::Synced)
                }
                FailureKind::Transient => {
                    warn!("remote unreachable, queueing write {}: {err}", write.row_id);
                    self.connectivity.set_online(false);
                    self.enqueue_encrypted(write, key)?;
                    Ok(SubmitOutcome::Queued)
                }
                FailureKind::Permanent => {
                    warn!("remote rejected write {}: {err}", write.row_id);
                    Err(SyncError::Rejected(err))
                }
            },
        }
    }

    /// Replays the queue in enqueue order.
    ///
    /// Permanently rejected writes, and writes whose queued payload can no
    /// longer be read, are discarded so one bad write cannot wedge everything
    /// behind it. A transient failure aborts the pass with the queue
    /// untouched; what already applied this pass is harmless to repeat next
    /// time. Only a pass that disposes of every write clears the queue, and
    /// only up to the highest sequence number this pass saw, so writes that
    /// land mid-replay survive for the next one.
    pub async fn sync_pending_writes(&self, key: &DerivedKey) -> SyncResult<SyncReport> {
        let queued = self.store.list_pending()?;
        let Some(last) = queued.last() else {
            return Ok(SyncReport::default());
        };
        let last_seq = last.seq;
        let total = queued.len();

        let mut applied = 0usize;
        let mut discarded = 0usize;
        let mut touched_logs = false;

        for (index, row) in queued.iter().enumerate() {
            let payload = match row.op {
                // A delete's intent lives in the plaintext columns
                WriteOp::Delete => Value::Null,
                WriteOp::Upsert => match self.decode_payload(row, key) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(
                            "discarding queued write seq {} with unreadable payload: {err}",
                            row.seq
                        );
                        discarded += 1;
                        continue;
                    }
                },
            };
            match self
                .apply_remote(row.op, row.kind, &row.section_key, &row.row_id, &payload)
                .await
            {
                Ok(()) => {
                    applied += 1;
                    touched_logs |= row.kind == RowKind::AuditLogs;
                }
                Err(err) => match self.classifier.classify_write(row.op, &err) {
                    FailureKind::AlreadyApplied => {
                        debug!("queued write seq {} already applied", row.seq);
                        applied += 1;
                        touched_logs |= row.kind == RowKind::AuditLogs;
                    }
                    FailureKind::Permanent => {
                        warn!(
                            "discarding queued write seq {} ({} {}): {err}",
                            row.seq, row.op, row.row_id
                        );
                        discarded += 1;
                    }
                    FailureKind::Transient => {
                        let remaining = total - index;
                        self.connectivity.set_online(false);
                        let mut inner = self.inner.write().await;
                        inner.last_error = Some(err.to_string());
                        warn!(
                            "replay stopped at seq {} ({remaining} writes still queued): {err}",
                            row.seq
                        );
                        return Err(SyncError::ReplayAborted {
                            replayed: index,
                            remaining,
                        });
                    }
                },
            }
        }

        self.store.clear_pending_through(last_seq)?;
        self.connectivity.set_online(true);
        {
            let mut inner = self.inner.write().await;
            inner.last_sync_at = Some(Utc::now());
            inner.last_error = None;
        }
        info!("replayed {applied} queued writes ({discarded} discarded)");

        self.store.notifier().publish(RefreshTopic::Data, None);
        if touched_logs {
            self.store.notifier().publish(RefreshTopic::Logs, None);
        }
        Ok(SyncReport { applied, discarded })
    }

    fn enqueue_encrypted(&self, write: &PendingWrite, key: &DerivedKey) -> SyncResult<i64> {
        let plain = serde_json::to_vec(&write.payload)?;
        let blob = encrypt_string(key, &plain)?;
        Ok(self
            .store
            .enqueue(write.op, write.kind, &write.section_key, &write.row_id, &blob)?)
    }

    fn decode_payload(&self, row: &QueuedWrite, key: &DerivedKey) -> SyncResult<Value> {
        let plain = decrypt_string(key, &row.payload)?;
        Ok(serde_json::from_slice(&plain)?)
    }

    async fn apply_remote(
        &self,
        op: WriteOp,
        kind: RowKind,
        section_key: &str,
        row_id: &str,
        payload: &Value,
    ) -> RemoteResult<()> {
        if kind == RowKind::Settings && op == WriteOp::Upsert {
            if let Some(settings) = &self.settings {
                return settings.set(section_key, payload).await;
            }
        }
        match op {
            WriteOp::Upsert => self.remote.upsert_row(kind, section_key, row_id, payload).await,
            WriteOp::Delete => self.remote.delete_row(kind, section_key, row_id).await,
        }
    }
}
