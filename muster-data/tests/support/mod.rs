//! Shared test doubles and fixtures for the facade tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use muster_crypto::{generate_random_key, DerivedKey};
use muster_data::{DataFacade, Session};
use muster_store::CacheStore;
use muster_sync::{RemoteError, RemoteResult, RemoteRow, RemoteStore, SettingsStore};
use muster_types::{NewMember, Role, RowKind, Section};
use serde_json::Value;

/// Facade wired to in-memory doubles. Sessions built from the returned key
/// share the facade's cache.
pub fn facade() -> (DataFacade, Arc<MockRemote>, Arc<MockSettings>, DerivedKey) {
    let store = CacheStore::open_in_memory().unwrap();
    let remote = Arc::new(MockRemote::new());
    let settings = Arc::new(MockSettings::new());
    let facade = DataFacade::new(store, remote.clone(), settings.clone());
    (facade, remote, settings, generate_random_key())
}

pub fn officer(key: &DerivedKey) -> Session {
    Session::new(
        "officer@example.org",
        Role::Officer,
        vec![Section::Juniors],
        key.clone(),
    )
}

pub fn captain(key: &DerivedKey) -> Session {
    Session::new(
        "captain@example.org",
        Role::Captain,
        vec![Section::Juniors],
        key.clone(),
    )
}

pub fn admin(key: &DerivedKey) -> Session {
    Session::new("admin@example.org", Role::Admin, vec![], key.clone())
}

pub fn recruit(key: &DerivedKey) -> Session {
    Session::new("recruit@example.org", Role::Pending, vec![], key.clone())
}

pub fn new_member(name: &str) -> NewMember {
    NewMember {
        name: name.to_string(),
        year: 7,
        squad: 2,
        is_leader: false,
    }
}

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

    fn gate(&self, id: &str) -> RemoteResult<()> {
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
        self.gate(id)?;
        self.insert_row(kind, section_key, id, payload.clone());
        Ok(())
    }

    async fn delete_row(&self, kind: RowKind, section_key: &str, id: &str) -> RemoteResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete {kind}/{section_key}/{id}"));
        self.gate(id)?;
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

    pub fn seed(&self, section_key: &str, blob: Value) {
        self.blobs
            .lock()
            .unwrap()
            .insert(section_key.to_string(), blob);
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
