//! Registry configuration.

use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a [`DeviceRegistry`](crate::DeviceRegistry).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// DuckDB file holding every registry table. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,

    /// DuckDB memory cap (e.g., "128MB").
    pub memory_limit: String,

    /// DuckDB worker threads.
    pub threads: u32,

    /// Blob namespace profile pictures are stored under.
    pub picture_namespace: String,

    /// Attempts per cascade step before a retryable failure is reported.
    pub group_cleanup_attempts: u32,

    /// Pause between attempts (milliseconds).
    pub retry_backoff_ms: u64,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            memory_limit: "128MB".to_string(),
            threads: 1,
            picture_namespace: "device_pictures".to_string(),
            group_cleanup_attempts: 3,
            retry_backoff_ms: 50,
            log_filter: "info".to_string(),
        }
    }
}

impl RegistryConfig {
    /// Default configuration persisted to the given database file.
    pub fn with_database(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> RegistryResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file.
    pub fn load(path: &Path) -> RegistryResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.group_cleanup_attempts == 0 {
            return Err(RegistryError::Config(
                "group_cleanup_attempts must be at least 1".into(),
            ));
        }
        if self.threads == 0 {
            return Err(RegistryError::Config("threads must be at least 1".into()));
        }
        if self.picture_namespace.is_empty() {
            return Err(RegistryError::Config("picture_namespace must not be empty".into()));
        }
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = RegistryConfig::from_json_str(r#"{"threads": 2}"#).unwrap();
        assert_eq!(config.threads, 2);
        assert_eq!(config.group_cleanup_attempts, 3);
        assert_eq!(config.picture_namespace, "device_pictures");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = RegistryConfig::from_json_str(r#"{"group_cleanup_attempts": 0}"#).unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = RegistryConfig::from_json_str("{threads:").unwrap_err();
        assert!(matches!(err, RegistryError::Serialization(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, r#"{"database_path": "/tmp/devices.duckdb", "retry_backoff_ms": 5}"#)
            .unwrap();

        let config = RegistryConfig::load(&path).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/devices.duckdb")));
        assert_eq!(config.retry_backoff(), Duration::from_millis(5));
    }
}
