//! Shared domain types for Muster.
//!
//! Everything the other crates exchange lives here: sections and partition
//! keys, roster members with their mark history, audit log entries and their
//! revert payloads, the pending-write queue vocabulary, and user roles and
//! invite codes.
//!
//! These types are plain data. Persistence, encryption and sync behaviour
//! live in the crates that consume them.

mod audit;
mod invite;
mod member;
mod pending;
mod roles;
mod section;

pub use audit::{AuditAction, AuditLog, RevertData};
pub use invite::InviteCode;
pub use member::{Mark, Member, MemberId, NewMember};
pub use pending::{
    ParseRowKindError, ParseWriteOpError, PendingWrite, RowKind, WriteOp,
};
pub use roles::{ParseRoleError, Role, UserRole};
pub use section::{section_key, ParseSectionError, Section, GLOBAL_SECTION};
