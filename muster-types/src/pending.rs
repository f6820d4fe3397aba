//! Pending remote writes, queued while the device is offline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a queued write does to its remote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOp {
    Upsert,
    Delete,
}

impl WriteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOp::Upsert => "upsert",
            WriteOp::Delete => "delete",
        }
    }
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown write op: {0}")]
pub struct ParseWriteOpError(String);

impl FromStr for WriteOp {
    type Err = ParseWriteOpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upsert" => Ok(WriteOp::Upsert),
            "delete" => Ok(WriteOp::Delete),
            other => Err(ParseWriteOpError(other.to_string())),
        }
    }
}

/// Which family of rows a write targets. Doubles as the path segment on the
/// remote row store and the discriminator column in the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Members,
    AuditLogs,
    Settings,
    Roles,
    Invites,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Members => "members",
            RowKind::AuditLogs => "audit_logs",
            RowKind::Settings => "settings",
            RowKind::Roles => "roles",
            RowKind::Invites => "invites",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown row kind: {0}")]
pub struct ParseRowKindError(String);

impl FromStr for RowKind {
    type Err = ParseRowKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "members" => Ok(RowKind::Members),
            "audit_logs" => Ok(RowKind::AuditLogs),
            "settings" => Ok(RowKind::Settings),
            "roles" => Ok(RowKind::Roles),
            "invites" => Ok(RowKind::Invites),
            other => Err(ParseRowKindError(other.to_string())),
        }
    }
}

/// One remote write that has not reached the server yet. The payload is the
/// plaintext remote row; it is encrypted before it touches the queue table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub op: WriteOp,
    pub kind: RowKind,
    pub section_key: String,
    pub row_id: String,
    pub payload: serde_json::Value,
    pub queued_at: DateTime<Utc>,
}

impl PendingWrite {
    pub fn upsert(
        kind: RowKind,
        section_key: impl Into<String>,
        row_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            op: WriteOp::Upsert,
            kind,
            section_key: section_key.into(),
            row_id: row_id.into(),
            payload,
            queued_at: Utc::now(),
        }
    }

    pub fn delete(kind: RowKind, section_key: impl Into<String>, row_id: impl Into<String>) -> Self {
        Self {
            op: WriteOp::Delete,
            kind,
            section_key: section_key.into(),
            row_id: row_id.into(),
            payload: serde_json::Value::Null,
            queued_at: Utc::now(),
        }
    }
}
