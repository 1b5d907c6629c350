//! Registry error types.

use peerlink_blobstore::BlobStoreError;
use peerlink_storage::StorageError;
use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur in registry operations.
///
/// An incomplete cascade is not an error: it is reported through
/// [`CascadeReport::failures`](crate::CascadeReport) while the device
/// removal itself succeeds.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("picture store error: {0}")]
    Pictures(#[from] BlobStoreError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        match self {
            RegistryError::Storage(e) => e.is_not_found(),
            RegistryError::Pictures(e) => e.is_not_found(),
            _ => false,
        }
    }
}
