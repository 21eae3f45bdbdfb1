//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use linkvault_core::AppError;
use std::collections::BTreeMap;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-object key/value metadata stored alongside the bytes.
pub type ObjectMetadata = BTreeMap<String, String>;

/// Source of an upload.
pub type StorageReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Storage abstraction trait
///
/// The ingestion pipeline only ever streams bytes in, checks for presence and
/// deletes (as a compensating action), so that is all a backend must provide.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a stream under `storage_key`, consuming the reader until EOF.
    ///
    /// Returns the number of bytes written. A failed upload leaves no object
    /// behind.
    async fn upload_stream(
        &self,
        storage_key: &str,
        content_type: &str,
        metadata: &ObjectMetadata,
        reader: StorageReader,
    ) -> StorageResult<u64>;

    /// Download a whole object.
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Bucket (S3) or root directory (local) the objects live in.
    fn bucket(&self) -> &str;
}
