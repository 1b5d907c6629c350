//! Transfer groups and the assignee rows binding devices to them.

use crate::database::Database;
use crate::error::StorageResult;
use crate::models::{Assignee, TransferGroup};
use duckdb::params;

/// Owns the `transfer_groups` and `transfer_assignees` tables.
#[derive(Clone)]
pub struct TransferStore {
    db: Database,
}

impl TransferStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn save_group(&self, group: &TransferGroup) -> StorageResult<()> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO transfer_groups (id, date_created) VALUES (?, ?)",
            params![group.id, group.date_created],
        )?;
        Ok(())
    }

    pub fn get_group(&self, group_id: i64) -> StorageResult<Option<TransferGroup>> {
        let conn = self.db.lock()?;
        let result = conn.query_row(
            "SELECT id, date_created FROM transfer_groups WHERE id = ?",
            params![group_id],
            |row| Ok(TransferGroup::new(row.get(0)?, row.get(1)?)),
        );

        match result {
            Ok(group) => Ok(Some(group)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the group only if no assignee references it, as one statement.
    /// Returns whether a row was deleted.
    pub fn remove_group_if_orphaned(&self, group_id: i64) -> StorageResult<bool> {
        let conn = self.db.lock()?;
        let affected = conn.execute(
            "DELETE FROM transfer_groups WHERE id = ? \
             AND NOT EXISTS (SELECT 1 FROM transfer_assignees WHERE group_id = ?)",
            params![group_id, group_id],
        )?;
        Ok(affected > 0)
    }

    pub fn add_assignee(&self, assignee: &Assignee) -> StorageResult<()> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO transfer_assignees (group_id, device_id, connection_adapter) \
             VALUES (?, ?, ?)",
            params![
                assignee.group_id,
                assignee.device_id,
                assignee.connection_adapter.as_deref(),
            ],
        )?;
        Ok(())
    }

    pub fn assignees_for_device(&self, device_id: &str) -> StorageResult<Vec<Assignee>> {
        self.select_assignees("device_id = ?", &device_id)
    }

    pub fn assignees_for_group(&self, group_id: i64) -> StorageResult<Vec<Assignee>> {
        self.select_assignees("group_id = ?", &group_id)
    }

    pub fn count_assignees(&self, group_id: i64) -> StorageResult<usize> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transfer_assignees WHERE group_id = ?",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Deletes one assignee row. Returns whether it existed.
    pub fn remove_assignee(&self, assignee: &Assignee) -> StorageResult<bool> {
        let conn = self.db.lock()?;
        let affected = conn.execute(
            "DELETE FROM transfer_assignees WHERE group_id = ? AND device_id = ?",
            params![assignee.group_id, assignee.device_id],
        )?;
        Ok(affected > 0)
    }

    fn select_assignees(
        &self,
        predicate: &str,
        value: &dyn duckdb::ToSql,
    ) -> StorageResult<Vec<Assignee>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT group_id, device_id, connection_adapter FROM transfer_assignees \
             WHERE {predicate} ORDER BY group_id, device_id"
        ))?;
        let params: &[&dyn duckdb::ToSql] = &[value];
        let assignees = stmt
            .query_map(params, |row| {
                Ok(Assignee {
                    group_id: row.get(0)?,
                    device_id: row.get(1)?,
                    connection_adapter: row.get(2)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(assignees)
    }
}
