use crate::keys::is_valid_key;
use crate::traits::{ObjectMetadata, Storage, StorageError, StorageReader, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const SIDECAR_SUFFIX: &str = ".meta.json";
const PARTIAL_SUFFIX: &str = ".part";

/// Content type and metadata written next to each object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectSidecar {
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    root_name: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`
    /// (e.g., "/var/lib/linkvault/media"), creating it if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let root_name = base_path.display().to_string();

        Ok(LocalStorage {
            base_path,
            root_name,
        })
    }

    /// Convert storage key to filesystem path, rejecting anything that could
    /// resolve outside the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if !is_valid_key(storage_key) {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let relative = Path::new(storage_key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(self.base_path.join(relative))
    }

    fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
        let mut s = path.as_os_str().to_owned();
        s.push(suffix);
        PathBuf::from(s)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_object(
        &self,
        path: &Path,
        content_type: &str,
        metadata: &ObjectMetadata,
        mut reader: StorageReader,
    ) -> StorageResult<u64> {
        let partial = Self::with_suffix(path, PARTIAL_SUFFIX);

        let mut file = fs::File::create(&partial).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                partial.display(),
                e
            ))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                partial.display(),
                e
            ))
        })?;

        file.flush().await?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to sync file {}: {}",
                partial.display(),
                e
            ))
        })?;
        drop(file);

        let sidecar = ObjectSidecar {
            content_type: content_type.to_string(),
            metadata: metadata.clone(),
        };
        let sidecar_json = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode metadata: {}", e)))?;
        fs::write(Self::with_suffix(path, SIDECAR_SUFFIX), sidecar_json).await?;

        fs::rename(&partial, path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to move {} into place: {}",
                partial.display(),
                e
            ))
        })?;

        Ok(bytes_copied)
    }

    /// Read back the metadata sidecar of an object.
    pub async fn read_sidecar(&self, storage_key: &str) -> StorageResult<ObjectSidecar> {
        let path = Self::with_suffix(&self.key_to_path(storage_key)?, SIDECAR_SUFFIX);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map_err(|e| StorageError::BackendError(format!("Corrupt metadata sidecar: {}", e)))
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_stream(
        &self,
        storage_key: &str,
        content_type: &str,
        metadata: &ObjectMetadata,
        reader: StorageReader,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        match self.write_object(&path, content_type, metadata, reader).await {
            Ok(size) => {
                tracing::info!(
                    path = %path.display(),
                    key = %storage_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream upload successful"
                );
                Ok(size)
            }
            Err(e) => {
                let _ = remove_if_present(&Self::with_suffix(&path, PARTIAL_SUFFIX)).await;
                let _ = remove_if_present(&Self::with_suffix(&path, SIDECAR_SUFFIX)).await;
                tracing::error!(
                    error = %e,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream upload failed"
                );
                Err(e)
            }
        }
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        remove_if_present(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete {}: {}", path.display(), e))
        })?;
        remove_if_present(&Self::with_suffix(&path, SIDECAR_SUFFIX))
            .await
            .map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete metadata for {}: {}",
                    path.display(),
                    e
                ))
            })?;
        // Left behind by an interrupted upload
        let _ = remove_if_present(&Self::with_suffix(&path, PARTIAL_SUFFIX)).await;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    fn bucket(&self) -> &str {
        &self.root_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn reader(data: &'static [u8]) -> StorageReader {
        Box::pin(data)
    }

    #[tokio::test]
    async fn test_upload_stream_writes_object_and_sidecar() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let mut metadata = ObjectMetadata::new();
        metadata.insert("content_id".to_string(), "examplechan_42".to_string());

        let size = storage
            .upload_stream(
                "examplechan/examplechan_42/a.txt",
                "text/plain",
                &metadata,
                reader(b"hello world"),
            )
            .await
            .unwrap();

        assert_eq!(size, 11);
        assert!(storage.exists("examplechan/examplechan_42/a.txt").await.unwrap());
        assert_eq!(
            storage.download("examplechan/examplechan_42/a.txt").await.unwrap(),
            b"hello world"
        );

        let sidecar = storage
            .read_sidecar("examplechan/examplechan_42/a.txt")
            .await
            .unwrap();
        assert_eq!(sidecar.content_type, "text/plain");
        assert_eq!(sidecar.metadata, metadata);
    }

    #[tokio::test]
    async fn test_delete_removes_object_and_sidecar() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload_stream("a/b/c.bin", "application/octet-stream", &ObjectMetadata::new(), reader(b"x"))
            .await
            .unwrap();
        storage.delete("a/b/c.bin").await.unwrap();

        assert!(!storage.exists("a/b/c.bin").await.unwrap());
        assert!(matches!(
            storage.read_sidecar("a/b/c.bin").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_object_succeeds() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        assert!(storage.delete("nothing/here.bin").await.is_ok());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.download("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_no_object() {
        struct FailingReader;

        impl tokio::io::AsyncRead for FailingReader {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::other("connection reset")))
            }
        }

        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage
            .upload_stream(
                "a/b/broken.bin",
                "application/octet-stream",
                &ObjectMetadata::new(),
                Box::pin(FailingReader),
            )
            .await;

        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert!(!storage.exists("a/b/broken.bin").await.unwrap());
        assert!(!dir.path().join("a/b/broken.bin.part").exists());
    }
}
