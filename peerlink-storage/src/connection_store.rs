//! Last-known network addresses of devices.

use crate::database::Database;
use crate::error::StorageResult;
use crate::models::{Connection, ConnectionKey};
use duckdb::params;

const CONNECTION_COLUMNS: &str = "device_id, adapter_name, ip_address, last_checked_date";

/// Owns the `device_connections` table.
///
/// Rows point back at a device but the store does not check that the device
/// exists; stale rows are removed by the registry's cascade.
#[derive(Clone)]
pub struct ConnectionStore {
    db: Database,
}

impl ConnectionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Replaces the row matching the connection's lookup key, or inserts one.
    ///
    /// With an address present, the row holding that address is replaced
    /// even when it belongs to another adapter. Any other row on the same
    /// `(device_id, adapter_name)` pair is replaced too, keeping at most one
    /// row per pair.
    pub fn upsert(&self, connection: &Connection) -> StorageResult<()> {
        self.db.in_transaction(|conn| {
            match connection.lookup_key() {
                ConnectionKey::Address(ip) => conn.execute(
                    "DELETE FROM device_connections \
                     WHERE ip_address = ? OR (device_id = ? AND adapter_name = ?)",
                    params![ip, connection.device_id, connection.adapter_name],
                )?,
                ConnectionKey::Adapter {
                    device_id,
                    adapter_name,
                } => conn.execute(
                    "DELETE FROM device_connections WHERE device_id = ? AND adapter_name = ?",
                    params![device_id, adapter_name],
                )?,
            };
            conn.execute(
                &format!("INSERT INTO device_connections ({CONNECTION_COLUMNS}) VALUES (?, ?, ?, ?)"),
                params![
                    connection.device_id,
                    connection.adapter_name,
                    connection.ip_address.as_deref(),
                    connection.last_checked_date,
                ],
            )?;
            Ok(())
        })
    }

    /// Gets the connection located by `key`.
    pub fn get(&self, key: &ConnectionKey) -> StorageResult<Option<Connection>> {
        let conn = self.db.lock()?;
        let result = match key {
            ConnectionKey::Address(ip) => conn.query_row(
                &format!(
                    "SELECT {CONNECTION_COLUMNS} FROM device_connections WHERE ip_address = ? \
                     ORDER BY last_checked_date DESC LIMIT 1"
                ),
                params![ip],
                row_to_connection,
            ),
            ConnectionKey::Adapter {
                device_id,
                adapter_name,
            } => conn.query_row(
                &format!(
                    "SELECT {CONNECTION_COLUMNS} FROM device_connections \
                     WHERE device_id = ? AND adapter_name = ? LIMIT 1"
                ),
                params![device_id, adapter_name],
                row_to_connection,
            ),
        };

        match result {
            Ok(c) => Ok(Some(c)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All connections of a device, most recently checked first.
    pub fn find_by_device(&self, device_id: &str) -> StorageResult<Vec<Connection>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM device_connections WHERE device_id = ? \
             ORDER BY last_checked_date DESC, adapter_name"
        ))?;
        let connections = stmt
            .query_map(params![device_id], row_to_connection)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(connections)
    }

    /// Deletes every connection of a device, returning how many were removed.
    pub fn remove_all_for_device(&self, device_id: &str) -> StorageResult<usize> {
        let conn = self.db.lock()?;
        let removed = conn.execute(
            "DELETE FROM device_connections WHERE device_id = ?",
            params![device_id],
        )?;
        Ok(removed)
    }
}

fn row_to_connection(row: &duckdb::Row<'_>) -> duckdb::Result<Connection> {
    Ok(Connection {
        device_id: row.get(0)?,
        adapter_name: row.get(1)?,
        ip_address: row.get(2)?,
        last_checked_date: row.get(3)?,
    })
}
