use muster_crypto::CryptoError;
use muster_store::StoreError;
use thiserror::Error;

use crate::remote::RemoteError;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A queued-write replay hit a transient failure and stopped. The queue
    /// keeps every write, applied prefix included; the next pass re-sends
    /// the prefix and the remote absorbs the duplicates.
    #[error("replay stopped after {replayed} writes, {remaining} still queued")]
    ReplayAborted { replayed: usize, remaining: usize },

    /// The remote permanently rejected a write submitted while online.
    #[error("write rejected by remote: {0}")]
    Rejected(RemoteError),

    #[error("sync service not running")]
    ServiceStopped,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
