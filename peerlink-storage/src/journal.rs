//! Journal of device removals awaiting dependent cleanup.

use crate::database::Database;
use crate::error::StorageResult;
use duckdb::{params, Connection};

/// Durable queue of device ids whose cascade has not completed cleanly.
#[derive(Clone)]
pub struct CascadeJournal {
    db: Database,
}

impl CascadeJournal {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn record(&self, device_id: &str, queued_at: i64) -> StorageResult<()> {
        let conn = self.db.lock()?;
        record_with(&conn, device_id, queued_at)
    }

    /// Removes the entry once cleanup has finished. Clearing an absent entry is a no-op.
    pub fn clear(&self, device_id: &str) -> StorageResult<()> {
        let conn = self.db.lock()?;
        conn.execute("DELETE FROM cascade_journal WHERE device_id = ?", params![device_id])?;
        Ok(())
    }

    /// Journaled device ids, oldest first.
    pub fn pending(&self) -> StorageResult<Vec<String>> {
        let conn = self.db.lock()?;
        let mut stmt =
            conn.prepare("SELECT device_id FROM cascade_journal ORDER BY queued_at, device_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

pub(crate) fn record_with(conn: &Connection, device_id: &str, queued_at: i64) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cascade_journal (device_id, queued_at) VALUES (?, ?)",
        params![device_id, queued_at],
    )?;
    Ok(())
}
