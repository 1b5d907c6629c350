//! DuckDB storage layer for the peerlink device registry.
//!
//! Holds the records a peer-to-peer transfer client keeps about remote
//! devices: the devices themselves, their last-known network connections,
//! the transfer groups they take part in, and a journal of device removals
//! whose dependent cleanup has not finished yet.
//!
//! # Architecture
//!
//! - All tables live in one DuckDB database shared through [`Database`]
//! - Each record family has its own store type over that shared handle
//! - Foreign keys are not declared; referential cleanup is driven by the
//!   registry's cascade engine
//! - Schema creation is idempotent and runs on every open

mod connection_store;
mod database;
mod device_store;
mod error;
mod journal;
mod models;
mod schema;
mod transfer_store;

pub use connection_store::ConnectionStore;
pub use database::{open_duckdb_with_wal_recovery, Database};
pub use device_store::DeviceStore;
pub use error::{StorageError, StorageResult};
pub use journal::CascadeJournal;
pub use models::{
    picture_id_for, Assignee, Connection, ConnectionKey, Device, DeviceType, TransferGroup,
};
pub use transfer_store::TransferStore;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
