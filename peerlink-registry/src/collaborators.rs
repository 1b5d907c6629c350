//! Seams between the cascade engine and the subsystems it cleans up.

use peerlink_blobstore::{BlobStore, BlobStoreResult};
use peerlink_storage::{Assignee, StorageResult, TransferStore};

/// Read/delete access to the transfer-group subsystem's records.
pub trait TransferGroupDirectory: Send + Sync {
    fn assignees_for_device(&self, device_id: &str) -> StorageResult<Vec<Assignee>>;

    /// Deletes one assignee. An absent row is success.
    fn remove_assignee(&self, assignee: &Assignee) -> StorageResult<bool>;

    fn group_exists(&self, group_id: i64) -> StorageResult<bool>;

    fn count_assignees(&self, group_id: i64) -> StorageResult<usize>;

    /// Deletes the group only if no assignee references it. Must be a single
    /// atomic operation in the backing store. Returns whether a row was deleted.
    fn remove_group_if_orphaned(&self, group_id: i64) -> StorageResult<bool>;
}

impl TransferGroupDirectory for TransferStore {
    fn assignees_for_device(&self, device_id: &str) -> StorageResult<Vec<Assignee>> {
        TransferStore::assignees_for_device(self, device_id)
    }

    fn remove_assignee(&self, assignee: &Assignee) -> StorageResult<bool> {
        TransferStore::remove_assignee(self, assignee)
    }

    fn group_exists(&self, group_id: i64) -> StorageResult<bool> {
        Ok(self.get_group(group_id)?.is_some())
    }

    fn count_assignees(&self, group_id: i64) -> StorageResult<usize> {
        TransferStore::count_assignees(self, group_id)
    }

    fn remove_group_if_orphaned(&self, group_id: i64) -> StorageResult<bool> {
        TransferStore::remove_group_if_orphaned(self, group_id)
    }
}

/// Where device profile pictures live.
pub trait PictureStore: Send + Sync {
    /// Deletes a picture by resource id; `NotFound` if none was stored.
    fn delete_picture(&self, picture_id: &str) -> BlobStoreResult<()>;
}

/// Profile pictures kept in one namespace of a [`BlobStore`].
pub struct ProfilePictures {
    blobs: BlobStore,
    namespace: String,
}

impl ProfilePictures {
    pub fn new(blobs: BlobStore, namespace: impl Into<String>) -> Self {
        Self {
            blobs,
            namespace: namespace.into(),
        }
    }

    pub fn save(&self, picture_id: &str, data: &[u8]) -> BlobStoreResult<()> {
        self.blobs.store(&self.namespace, picture_id, data)
    }

    pub fn read(&self, picture_id: &str) -> BlobStoreResult<Vec<u8>> {
        self.blobs.read(&self.namespace, picture_id)
    }
}

impl PictureStore for ProfilePictures {
    fn delete_picture(&self, picture_id: &str) -> BlobStoreResult<()> {
        self.blobs.delete(&self.namespace, picture_id)
    }
}
