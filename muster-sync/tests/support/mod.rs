//! Shared test doubles for the sync engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use muster_sync::{RemoteError, RemoteResult, RemoteRow, RemoteStore, SettingsStore};
use muster_types::RowKind;
use serde_json::Value;

/// In-memory remote row store with scriptable failures.
#[derive(Default)]
pub struct MockRemote {
    rows: Mutex<HashMap<(RowKind, String, String), Value>>,
    /// Every call fails with a network error while set.
    offline: AtomicBool,
    /// Calls for these row ids fail with a network error.
    network_fail_ids: Mutex<HashSet<String>>,
    /// Upserts and deletes for these row ids fail with 422.
    reject_ids: Mutex<HashSet<String>>,
    /// Upserts for these row ids fail with 409.
    conflict_ids: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn fail_network(&self, id: &str) {
        self.network_fail_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn clear_network_failures(&self) {
        self.network_fail_ids.lock().unwrap().clear();
    }

    pub fn reject(&self, id: &str) {
        self.reject_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn conflict(&self, id: &str) {
        self.conflict_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn insert_row(&self, kind: RowKind, section_key: &str, id: &str, payload: Value) {
        self.rows
            .lock()
            .unwrap()
            .insert((kind, section_key.to_string(), id.to_string()), payload);
    }

    pub fn row(&self, kind: RowKind, section_key: &str, id: &str) -> Option<Value> {
        self.rows
            .lock()
            .unwrap()
            .get(&(kind, section_key.to_string(), id.to_string()))
            .cloned()
    }

    pub fn row_count(&self, kind: RowKind, section_key: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, s, _)| *k == kind && s == section_key)
            .count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn gate(&self, id: &str, op_is_upsert: bool) -> RemoteResult<()> {
        if self.offline.load(Ordering::Relaxed)
            || self.network_fail_ids.lock().unwrap().contains(id)
        {
            return Err(RemoteError::Network("connection refused".into()));
        }
        if self.reject_ids.lock().unwrap().contains(id) {
            return Err(RemoteError::Status {
                code: 422,
                message: "validation failed".into(),
            });
        }
        if op_is_upsert && self.conflict_ids.lock().unwrap().contains(id) {
            return Err(RemoteError::Status {
                code: 409,
                message: "row already exists".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn upsert_row(
        &self,
        kind: RowKind,
        section_key: &str,
        id: &str,
        payload: &Value,
    ) -> RemoteResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("upsert {kind}/{section_key}/{id}"));
        self.gate(id, true)?;
        self.insert_row(kind, section_key, id, payload.clone());
        Ok(())
    }

    async fn delete_row(&self, kind: RowKind, section_key: &str, id: &str) -> RemoteResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete {kind}/{section_key}/{id}"));
        self.gate(id, false)?;
        self.rows
            .lock()
            .unwrap()
            .remove(&(kind, section_key.to_string(), id.to_string()));
        Ok(())
    }

    async fn fetch_rows(&self, kind: RowKind, section_key: &str) -> RemoteResult<Vec<RemoteRow>> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("fetch {kind}/{section_key}"));
        if self.offline.load(Ordering::Relaxed) {
            return Err(RemoteError::Network("connection refused".into()));
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|((k, s, _), _)| *k == kind && s == section_key)
            .map(|((_, _, id), payload)| RemoteRow {
                id: id.clone(),
                section_key: section_key.to_string(),
                payload: payload.clone(),
            })
            .collect())
    }

    async fn fetch_row(
        &self,
        kind: RowKind,
        section_key: &str,
        id: &str,
    ) -> RemoteResult<Option<RemoteRow>> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(RemoteError::Network("connection refused".into()));
        }
        Ok(self.row(kind, section_key, id).map(|payload| RemoteRow {
            id: id.to_string(),
            section_key: section_key.to_string(),
            payload,
        }))
    }
}

/// In-memory settings collaborator.
#[derive(Default)]
pub struct MockSettings {
    blobs: Mutex<HashMap<String, Value>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn blob(&self, section_key: &str) -> Option<Value> {
        self.blobs.lock().unwrap().get(section_key).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsStore for MockSettings {
    async fn get(&self, section_key: &str) -> RemoteResult<Option<Value>> {
        self.calls.lock().unwrap().push(format!("get {section_key}"));
        if self.offline.load(Ordering::Relaxed) {
            return Err(RemoteError::Network("connection refused".into()));
        }
        Ok(self.blobs.lock().unwrap().get(section_key).cloned())
    }

    async fn set(&self, section_key: &str, blob: &Value) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(format!("set {section_key}"));
        if self.offline.load(Ordering::Relaxed) {
            return Err(RemoteError::Network("connection refused".into()));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(section_key.to_string(), blob.clone());
        Ok(())
    }
}
