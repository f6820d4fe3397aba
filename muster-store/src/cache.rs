//! Encrypted row cache plus the durable pending-write queue.
//!
//! Both tables live in one DuckDB database. Rows arrive already encrypted
//! (the `blob` and `payload` columns are opaque TEXT); only the addressing
//! columns are plaintext so lookups work without a key.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use duckdb::{params, Connection};
use muster_types::{RowKind, WriteOp};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::notify::{ChangeNotifier, RefreshTopic};

/// One cached row as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRow {
    pub id: String,
    pub blob: String,
    pub modified_at: i64,
}

/// One queued write as stored on disk. `payload` is the encrypted remote row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedWrite {
    pub seq: i64,
    pub op: WriteOp,
    pub kind: RowKind,
    pub section_key: String,
    pub row_id: String,
    pub payload: String,
    pub queued_at: i64,
}

/// Local cache and write queue backed by DuckDB.
#[derive(Clone)]
pub struct CacheStore {
    conn: Arc<Mutex<Connection>>,
    notifier: ChangeNotifier,
}

impl CacheStore {
    /// Opens or creates the cache database at the given path, recovering
    /// once from a stale WAL left by an unclean shutdown.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = open_database(path)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            notifier: ChangeNotifier::default(),
        })
    }

    /// Opens an in-memory cache (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            notifier: ChangeNotifier::default(),
        })
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    // ── Cache rows ──────────────────────────────────────────────────────

    /// Upserts a cached row and publishes a refresh for its section.
    pub fn put(&self, kind: RowKind, section_key: &str, id: &str, blob: &str) -> StoreResult<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                r#"
                INSERT OR REPLACE INTO cache_rows (row_kind, section_key, id, blob, modified_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    kind.as_str(),
                    section_key,
                    id,
                    blob,
                    Utc::now().timestamp_millis()
                ],
            )?;
        }
        self.notifier.publish(topic_for(kind), Some(section_key));
        Ok(())
    }

    pub fn get(&self, kind: RowKind, section_key: &str, id: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT blob FROM cache_rows WHERE row_kind = ? AND section_key = ? AND id = ?",
            params![kind.as_str(), section_key, id],
            |row| row.get(0),
        );
        match result {
            Ok(blob) => Ok(Some(blob)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All cached rows of one kind in one section, most recently written
    /// first.
    pub fn get_all(&self, kind: RowKind, section_key: &str) -> StoreResult<Vec<CachedRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, blob, modified_at FROM cache_rows \
             WHERE row_kind = ? AND section_key = ? ORDER BY modified_at DESC, id",
        )?;
        let rows = stmt
            .query_map(params![kind.as_str(), section_key], |row| {
                Ok(CachedRow {
                    id: row.get(0)?,
                    blob: row.get(1)?,
                    modified_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Removes one cached row. Removing an absent row is not an error.
    pub fn remove(&self, kind: RowKind, section_key: &str, id: &str) -> StoreResult<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM cache_rows WHERE row_kind = ? AND section_key = ? AND id = ?",
                params![kind.as_str(), section_key, id],
            )?;
        }
        self.notifier.publish(topic_for(kind), Some(section_key));
        Ok(())
    }

    /// Removes every cached row of one kind in one section, returning how
    /// many went away.
    pub fn remove_all(&self, kind: RowKind, section_key: &str) -> StoreResult<usize> {
        let removed = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM cache_rows WHERE row_kind = ? AND section_key = ?",
                params![kind.as_str(), section_key],
            )?
        };
        self.notifier.publish(topic_for(kind), Some(section_key));
        Ok(removed)
    }

    // ── Pending-write queue ─────────────────────────────────────────────

    /// Appends a write to the queue and returns its sequence number.
    /// Sequence numbers are strictly increasing; replay order is enqueue
    /// order.
    pub fn enqueue(
        &self,
        op: WriteOp,
        kind: RowKind,
        section_key: &str,
        row_id: &str,
        payload: &str,
    ) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM pending_writes",
            [],
            |row| row.get(0),
        )?;
        conn.execute(
            r#"
            INSERT INTO pending_writes (seq, op, row_kind, section_key, row_id, payload, queued_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                seq,
                op.as_str(),
                kind.as_str(),
                section_key,
                row_id,
                payload,
                Utc::now().timestamp_millis()
            ],
        )?;
        Ok(seq)
    }

    /// The whole queue in enqueue order.
    pub fn list_pending(&self) -> StoreResult<Vec<QueuedWrite>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT seq, op, row_kind, section_key, row_id, payload, queued_at \
             FROM pending_writes ORDER BY seq",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(seq, op, kind, section_key, row_id, payload, queued_at)| {
                Ok(QueuedWrite {
                    seq,
                    op: op
                        .parse()
                        .map_err(|_| StoreError::Corrupt(format!("bad write op: {op}")))?,
                    kind: kind
                        .parse()
                        .map_err(|_| StoreError::Corrupt(format!("bad row kind: {kind}")))?,
                    section_key,
                    row_id,
                    payload,
                    queued_at,
                })
            })
            .collect()
    }

    pub fn pending_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM pending_writes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Row ids of queued writes of one kind. Lets read paths tell "deleted
    /// remotely" apart from "created here, not yet synced".
    pub fn pending_row_ids(&self, kind: RowKind) -> StoreResult<HashSet<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT DISTINCT row_id FROM pending_writes WHERE row_kind = ?")?;
        let ids = stmt
            .query_map(params![kind.as_str()], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(ids)
    }

    /// Drops the whole queue.
    pub fn clear_pending(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM pending_writes", [])?;
        Ok(())
    }

    /// Drops every queued write with `seq <= max_seq`. Writes enqueued while
    /// a replay was in flight have higher sequence numbers and survive.
    pub fn clear_pending_through(&self, max_seq: i64) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM pending_writes WHERE seq <= ?",
            params![max_seq],
        )?;
        Ok(())
    }
}

fn topic_for(kind: RowKind) -> RefreshTopic {
    match kind {
        RowKind::AuditLogs => RefreshTopic::Logs,
        _ => RefreshTopic::Data,
    }
}

/// Opens the DuckDB file with resource limits suited to a device-local
/// cache. DuckDB defaults to most of system RAM and every core.
///
/// A crash can leave a `.wal` file DuckDB refuses to replay, which makes
/// the database unopenable. When the first open fails and such a file sits
/// next to the database, it is deleted and the open retried; with no WAL
/// present the original error comes back untouched.
fn open_database(path: &Path) -> StoreResult<Connection> {
    let conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(open_err) => {
            if remove_stale_wal(path) {
                Connection::open(path)?
            } else {
                return Err(open_err.into());
            }
        }
    };
    conn.execute_batch("PRAGMA memory_limit='256MB'; PRAGMA threads=2;")?;
    Ok(conn)
}

/// Deletes the database's WAL file if present. Returns whether a retry is
/// worth attempting.
fn remove_stale_wal(path: &Path) -> bool {
    let wal = match path.extension() {
        Some(ext) => path.with_extension(format!("{}.wal", ext.to_string_lossy())),
        None => path.with_extension("wal"),
    };
    if !wal.exists() {
        return false;
    }
    warn!("cache open failed, removing stale WAL: {}", wal.display());
    std::fs::remove_file(&wal).is_ok()
}

fn initialize_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS cache_rows (
            row_kind VARCHAR NOT NULL,
            section_key VARCHAR NOT NULL,
            id VARCHAR NOT NULL,
            blob TEXT NOT NULL,
            modified_at BIGINT NOT NULL,
            PRIMARY KEY (row_kind, section_key, id)
        );

        CREATE TABLE IF NOT EXISTS pending_writes (
            seq BIGINT PRIMARY KEY,
            op VARCHAR NOT NULL,
            row_kind VARCHAR NOT NULL,
            section_key VARCHAR NOT NULL,
            row_id VARCHAR NOT NULL,
            payload TEXT NOT NULL,
            queued_at BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pending_kind ON pending_writes(row_kind);
        "#,
    )?;
    Ok(())
}
