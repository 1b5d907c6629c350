use crate::error::StorageResult;
use duckdb::Connection;

pub(crate) fn initialize(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id VARCHAR PRIMARY KEY,
            nickname VARCHAR,
            brand VARCHAR,
            model VARCHAR,
            version_name VARCHAR,
            version_number INTEGER NOT NULL DEFAULT 0,
            last_usage_time BIGINT NOT NULL DEFAULT 0,
            is_trusted BOOLEAN NOT NULL DEFAULT FALSE,
            is_restricted BOOLEAN NOT NULL DEFAULT FALSE,
            is_local_address BOOLEAN NOT NULL DEFAULT FALSE,
            tmp_secure_key INTEGER NOT NULL DEFAULT 0,
            device_type VARCHAR
        );

        -- At most one row per (device_id, adapter_name), enforced by
        -- ConnectionStore::upsert.
        CREATE TABLE IF NOT EXISTS device_connections (
            device_id VARCHAR NOT NULL,
            adapter_name VARCHAR NOT NULL,
            ip_address VARCHAR,
            last_checked_date BIGINT NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_connections_device ON device_connections(device_id, adapter_name);
        CREATE INDEX IF NOT EXISTS idx_connections_ip ON device_connections(ip_address);

        CREATE TABLE IF NOT EXISTS transfer_groups (
            id BIGINT PRIMARY KEY,
            date_created BIGINT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transfer_assignees (
            group_id BIGINT NOT NULL,
            device_id VARCHAR NOT NULL,
            connection_adapter VARCHAR,
            PRIMARY KEY (group_id, device_id)
        );
        CREATE INDEX IF NOT EXISTS idx_assignees_device ON transfer_assignees(device_id);

        -- Devices whose row is gone but whose dependent cleanup has not
        -- completed without failures yet.
        CREATE TABLE IF NOT EXISTS cascade_journal (
            device_id VARCHAR PRIMARY KEY,
            queued_at BIGINT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
