//! Namespace-scoped blob storage.
//!
//! Holds opaque binary resources such as device profile pictures, keyed by
//! `(namespace, blob_id)`. Content hashes are recorded so a caller can skip
//! rewriting an unchanged picture.

use chrono::Utc;
use duckdb::{params, Connection};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, MutexGuard};

// ============================================================================
// Error types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("blob not found: {0}/{1}")]
    NotFound(String, String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl BlobStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }
}

pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

// ============================================================================
// BlobMetadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobMetadata {
    pub namespace: String,
    pub blob_id: String,
    pub size: i64,
    pub content_hash: String,
    pub created_at: i64,
    pub modified_at: i64,
}

// ============================================================================
// BlobStore
// ============================================================================

pub struct BlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl BlobStore {
    /// Open with an existing shared connection.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> BlobStoreResult<Self> {
        let store = Self { conn };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open in-memory (for testing).
    pub fn open_in_memory() -> BlobStoreResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| BlobStoreError::Storage(e.to_string()))?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    fn lock(&self) -> BlobStoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| BlobStoreError::Storage(e.to_string()))
    }

    fn ensure_tables(&self) -> BlobStoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blobs (
                namespace VARCHAR NOT NULL,
                blob_id VARCHAR NOT NULL,
                data BLOB NOT NULL,
                size BIGINT NOT NULL DEFAULT 0,
                content_hash VARCHAR NOT NULL,
                created_at BIGINT NOT NULL,
                modified_at BIGINT NOT NULL,
                PRIMARY KEY (namespace, blob_id)
            );",
        )
        .map_err(|e| BlobStoreError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Store a blob, replacing any previous content under the same id.
    pub fn store(&self, namespace: &str, id: &str, data: &[u8]) -> BlobStoreResult<()> {
        let content_hash = hex_encode(Sha256::digest(data));
        let now = Utc::now().timestamp_millis();

        let blob = data.to_vec();

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO blobs (namespace, blob_id, data, size, content_hash, created_at, modified_at)
             VALUES (?, ?, ?, ?, ?, COALESCE((SELECT created_at FROM blobs WHERE namespace = ? AND blob_id = ?), ?), ?)",
            params![namespace, id, blob, data.len() as i64, content_hash, namespace, id, now, now],
        )
        .map_err(|e| BlobStoreError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Read a blob.
    pub fn read(&self, namespace: &str, id: &str) -> BlobStoreResult<Vec<u8>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT data FROM blobs WHERE namespace = ? AND blob_id = ?",
            params![namespace, id],
            |row| row.get(0),
        );

        match result {
            Ok(data) => Ok(data),
            Err(duckdb::Error::QueryReturnedNoRows) => Err(BlobStoreError::NotFound(
                namespace.to_string(),
                id.to_string(),
            )),
            Err(e) => Err(BlobStoreError::Storage(e.to_string())),
        }
    }

    /// Delete a blob. Fails with `NotFound` if nothing was stored under the id.
    pub fn delete(&self, namespace: &str, id: &str) -> BlobStoreResult<()> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "DELETE FROM blobs WHERE namespace = ? AND blob_id = ?",
                params![namespace, id],
            )
            .map_err(|e| BlobStoreError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(BlobStoreError::NotFound(
                namespace.to_string(),
                id.to_string(),
            ));
        }
        Ok(())
    }

    /// List blob metadata for a namespace.
    pub fn list(&self, namespace: &str) -> BlobStoreResult<Vec<BlobMetadata>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT namespace, blob_id, size, content_hash, created_at, modified_at
                 FROM blobs WHERE namespace = ? ORDER BY modified_at DESC, blob_id",
            )
            .map_err(|e| BlobStoreError::Storage(e.to_string()))?;

        let items: Vec<BlobMetadata> = stmt
            .query_map(params![namespace], |row| {
                Ok(BlobMetadata {
                    namespace: row.get(0)?,
                    blob_id: row.get(1)?,
                    size: row.get(2)?,
                    content_hash: row.get(3)?,
                    created_at: row.get(4)?,
                    modified_at: row.get(5)?,
                })
            })
            .map_err(|e| BlobStoreError::Storage(e.to_string()))?
            .collect::<duckdb::Result<Vec<_>>>()
            .map_err(|e| BlobStoreError::Storage(e.to_string()))?;

        Ok(items)
    }
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes
        .as_ref()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_read_delete() {
        let store = BlobStore::open_in_memory().unwrap();
        store.store("pictures", "picture_a", b"jpeg bytes").unwrap();

        assert_eq!(store.read("pictures", "picture_a").unwrap(), b"jpeg bytes");

        store.delete("pictures", "picture_a").unwrap();
        assert!(store.read("pictures", "picture_a").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = BlobStore::open_in_memory().unwrap();
        let err = store.delete("pictures", "picture_none").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn namespaces_are_isolated() {
        let store = BlobStore::open_in_memory().unwrap();
        store.store("pictures", "x", b"1").unwrap();
        store.store("other", "x", b"2").unwrap();

        store.delete("pictures", "x").unwrap();
        assert_eq!(store.read("other", "x").unwrap(), b"2");
        assert!(store.list("pictures").unwrap().is_empty());
    }

    #[test]
    fn overwrite_keeps_created_at_and_updates_hash() {
        let store = BlobStore::open_in_memory().unwrap();
        store.store("pictures", "p", b"first").unwrap();
        let before = store.list("pictures").unwrap().remove(0);

        store.store("pictures", "p", b"second").unwrap();
        let after = store.list("pictures").unwrap().remove(0);

        assert_eq!(after.created_at, before.created_at);
        assert_ne!(after.content_hash, before.content_hash);
        assert_eq!(after.size, 6);
    }
}
