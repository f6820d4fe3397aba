//! Remote collaborator traits and the errors they surface.
//!
//! The remote row store holds opaque JSON rows addressed by
//! (kind, section, id). Its writes are idempotent: upserting the same row
//! twice converges, deleting an absent row is a no-op. That contract is what
//! makes queue replay safe to repeat.

use async_trait::async_trait;
use muster_types::RowKind;
use serde_json::Value;
use thiserror::Error;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered with a non-success status.
    #[error("remote returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One row as the remote returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRow {
    pub id: String,
    pub section_key: String,
    pub payload: Value,
}

/// The remote row store. Row ids are client-generated, so creates replay
/// idempotently.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upsert_row(
        &self,
        kind: RowKind,
        section_key: &str,
        id: &str,
        payload: &Value,
    ) -> RemoteResult<()>;

    async fn delete_row(&self, kind: RowKind, section_key: &str, id: &str) -> RemoteResult<()>;

    async fn fetch_rows(&self, kind: RowKind, section_key: &str) -> RemoteResult<Vec<RemoteRow>>;

    async fn fetch_row(
        &self,
        kind: RowKind,
        section_key: &str,
        id: &str,
    ) -> RemoteResult<Option<RemoteRow>>;
}

/// The per-section settings collaborator. A distinct backend from the row
/// store in production, but settings writes flow through the same queue, so
/// replay needs a handle to it.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, section_key: &str) -> RemoteResult<Option<Value>>;

    async fn set(&self, section_key: &str, blob: &Value) -> RemoteResult<()>;
}
