//! Failure classification: which remote errors are worth retrying.

use muster_types::WriteOp;

use crate::remote::RemoteError;

/// What a failed remote call means for the write that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server never applied the write; retry later. Replay stops here
    /// and the queue keeps the write.
    Transient,
    /// The server understood the write and refused it. Retrying can never
    /// succeed; replay discards the write so it cannot poison the queue.
    Permanent,
    /// The write already landed in an earlier attempt (duplicate create).
    /// Success-equivalent.
    AlreadyApplied,
}

/// Maps remote errors to [`FailureKind`]. Injectable so a deployment behind
/// a gateway with vendor status conventions can override the defaults.
pub trait FailureClassifier: Send + Sync {
    /// Classifies a failed queued write during submit or replay.
    fn classify_write(&self, op: WriteOp, err: &RemoteError) -> FailureKind;

    /// Classifies a failed read for cache-fallback decisions.
    fn classify_read(&self, err: &RemoteError) -> FailureKind;
}

/// Default classification for a plain HTTP row store:
///
/// - network-level failures, 408, 429 and 5xx are transient
/// - 409 on an upsert means the row already exists (duplicate create);
///   treated as already applied
/// - any other 4xx is permanent
pub struct HttpStatusClassifier;

impl FailureClassifier for HttpStatusClassifier {
    fn classify_write(&self, op: WriteOp, err: &RemoteError) -> FailureKind {
        match err {
            RemoteError::Network(_) => FailureKind::Transient,
            RemoteError::Status { code, .. } => match *code {
                408 | 429 => FailureKind::Transient,
                409 if op == WriteOp::Upsert => FailureKind::AlreadyApplied,
                code if code >= 500 => FailureKind::Transient,
                _ => FailureKind::Permanent,
            },
            RemoteError::Serialization(_) => FailureKind::Permanent,
        }
    }

    fn classify_read(&self, err: &RemoteError) -> FailureKind {
        match err {
            RemoteError::Network(_) => FailureKind::Transient,
            RemoteError::Status { code, .. } => match *code {
                408 | 429 => FailureKind::Transient,
                code if code >= 500 => FailureKind::Transient,
                _ => FailureKind::Permanent,
            },
            RemoteError::Serialization(_) => FailureKind::Permanent,
        }
    }
}
