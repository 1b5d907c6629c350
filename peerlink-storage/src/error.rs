//! Storage error types.

use thiserror::Error;

/// Errors that can occur in registry storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Backend and availability failures may succeed on a later attempt;
    /// a missing row never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DuckDb(_) | Self::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
