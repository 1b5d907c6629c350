//! Device records, keyed by the peer's stable identifier.

use crate::database::Database;
use crate::error::{StorageError, StorageResult};
use crate::journal;
use crate::models::{Device, DeviceType};
use duckdb::params;

const DEVICE_COLUMNS: &str = "id, nickname, brand, model, version_name, version_number, \
     last_usage_time, is_trusted, is_restricted, is_local_address, tmp_secure_key, device_type";

/// Owns the `devices` table.
#[derive(Clone)]
pub struct DeviceStore {
    db: Database,
}

impl DeviceStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts the device, or overwrites every field of the existing row.
    pub fn upsert(&self, device: &Device) -> StorageResult<()> {
        let conn = self.db.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO devices (
                id, nickname, brand, model, version_name, version_number,
                last_usage_time, is_trusted, is_restricted, is_local_address,
                tmp_secure_key, device_type
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                device.id,
                device.nickname,
                device.brand,
                device.model,
                device.version_name,
                device.version_number,
                device.last_usage_time,
                device.is_trusted,
                device.is_restricted,
                device.is_local_address,
                device.tmp_secure_key,
                device.device_type.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Gets a device, failing with `NotFound` if it is absent.
    pub fn get(&self, id: &str) -> StorageResult<Device> {
        self.find(id)?
            .ok_or_else(|| StorageError::not_found("device", id))
    }

    /// Gets a device if it exists.
    pub fn find(&self, id: &str) -> StorageResult<Option<Device>> {
        let conn = self.db.lock()?;
        let result = conn.query_row(
            &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?"),
            params![id],
            row_to_device,
        );

        match result {
            Ok(device) => Ok(Some(device)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists all devices, most recently used first.
    pub fn list(&self) -> StorageResult<Vec<Device>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY last_usage_time DESC, id"
        ))?;
        let devices = stmt
            .query_map([], row_to_device)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(devices)
    }

    /// Records a re-discovery. Returns false if the device is unknown.
    pub fn touch(&self, id: &str, at: i64) -> StorageResult<bool> {
        let conn = self.db.lock()?;
        let affected = conn.execute(
            "UPDATE devices SET last_usage_time = ? WHERE id = ?",
            params![at, id],
        )?;
        Ok(affected > 0)
    }

    /// Deletes the device row. Returns whether a row existed; deleting an
    /// absent device is not an error.
    pub fn remove(&self, id: &str) -> StorageResult<bool> {
        let conn = self.db.lock()?;
        let affected = conn.execute("DELETE FROM devices WHERE id = ?", params![id])?;
        Ok(affected > 0)
    }

    /// Deletes the device row and journals the id for dependent cleanup,
    /// both in one transaction.
    ///
    /// The id is journaled even when no row existed, so cleanup of stale
    /// dependents still happens for an already-removed device.
    pub fn remove_and_journal(&self, id: &str, queued_at: i64) -> StorageResult<bool> {
        self.db.in_transaction(|conn| {
            let affected = conn.execute("DELETE FROM devices WHERE id = ?", params![id])?;
            journal::record_with(conn, id, queued_at)?;
            Ok(affected > 0)
        })
    }

    pub fn count(&self) -> StorageResult<usize> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM devices", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_device(row: &duckdb::Row<'_>) -> duckdb::Result<Device> {
    let device_type: Option<String> = row.get(11)?;

    Ok(Device {
        id: row.get(0)?,
        nickname: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        brand: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        model: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        version_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        version_number: row.get(5)?,
        last_usage_time: row.get(6)?,
        is_trusted: row.get(7)?,
        is_restricted: row.get(8)?,
        is_local_address: row.get(9)?,
        tmp_secure_key: row.get(10)?,
        device_type: DeviceType::from_stored(device_type.as_deref()),
    })
}
