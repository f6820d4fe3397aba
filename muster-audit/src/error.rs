//! Audit error types.

use muster_types::AuditAction;
use thiserror::Error;
use uuid::Uuid;

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("cannot revert {action}: {reason}")]
    NotRevertible { action: AuditAction, reason: String },

    #[error("log entry {0} has already been reverted")]
    AlreadyReverted(Uuid),
}
