use muster_audit::AuditError;
use muster_crypto::CryptoError;
use muster_store::StoreError;
use muster_sync::{RemoteError, SyncError};
use thiserror::Error;

pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    /// The session's role does not allow the operation. Checked before any
    /// state is touched.
    #[error("permission denied: {0}")]
    Permission(String),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invite not usable: {0}")]
    InvalidInvite(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
