//! Audit trail rules for Muster.
//!
//! The audit trail is append-only. Each revertible entry carries an inverse
//! snapshot captured before the action applied, and this crate turns those
//! snapshots into [`RevertPlan`]s. It never performs I/O itself; the data
//! facade fetches history, asks this crate what a revert takes, executes
//! the plan through the sync engine, and appends the `RevertAction` entry.

mod error;
mod revert;

pub use error::{AuditError, AuditResult};
pub use revert::{
    ensure_revertible, find_revert, has_been_reverted, newest_first, revert_plan, RevertPlan,
};
