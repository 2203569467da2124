//! SQLite-backed append-only version log.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::types::{RecordId, TimestampMs, Version};

use super::{StoreError, StoreResult, VersionRecord, VersionState, VersionStore};

const RECORD_COLUMNS: &str = "id, namespace, version, started_at_ms, completed_at_ms";

/// SQLite implementation of [`crate::persist::VersionStore`].
pub struct SqliteVersionStore {
    conn: Connection,
}

impl SqliteVersionStore {
    /// Opens or creates a SQLite-backed version log at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite version log.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    fn query_one(&self, filter: &str, order: &str, namespace: &str) -> StoreResult<Option<VersionRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM version_log WHERE namespace = ?1 {filter} ORDER BY id {order} LIMIT 1"
        );
        let record = self
            .conn
            .query_row(&sql, params![namespace], read_record)
            .optional()?;
        Ok(record)
    }
}

impl VersionStore for SqliteVersionStore {
    fn state(&self, namespace: &str) -> StoreResult<VersionState> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM version_log WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )?;

        Ok(VersionState {
            count: count as u64,
            first: self.query_one("", "ASC", namespace)?,
            most_recent: self.query_one("", "DESC", namespace)?,
            latest_completed: self.query_one("AND completed_at_ms IS NOT NULL", "DESC", namespace)?,
        })
    }

    fn begin_step(&mut self, namespace: &str, version: Version, started_at_ms: TimestampMs) -> StoreResult<RecordId> {
        self.conn.execute(
            "INSERT INTO version_log(namespace, version, started_at_ms, completed_at_ms) VALUES (?1, ?2, ?3, NULL)",
            params![namespace, version as i64, started_at_ms as i64],
        )?;
        Ok(self.conn.last_insert_rowid() as RecordId)
    }

    fn complete_step(&mut self, namespace: &str, version: Version, completed_at_ms: TimestampMs) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE version_log SET completed_at_ms = ?3 WHERE id = (
                SELECT id FROM version_log
                WHERE namespace = ?1 AND version = ?2 AND completed_at_ms IS NULL
                ORDER BY id DESC LIMIT 1
            )",
            params![namespace, version as i64, completed_at_ms as i64],
        )?;
        if changed == 0 {
            return Err(StoreError::NoOpenRecord {
                namespace: namespace.to_string(),
                version,
            });
        }
        Ok(())
    }

    fn records(&self, namespace: &str) -> StoreResult<Vec<VersionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM version_log WHERE namespace = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![namespace], read_record)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<VersionRecord> {
    let id: i64 = row.get(0)?;
    let version: i64 = row.get(2)?;
    let started_at_ms: i64 = row.get(3)?;
    let completed_at_ms: Option<i64> = row.get(4)?;
    Ok(VersionRecord {
        id: id as RecordId,
        namespace: row.get(1)?,
        version: version as Version,
        started_at_ms: started_at_ms as TimestampMs,
        completed_at_ms: completed_at_ms.map(|v| v as TimestampMs),
    })
}
