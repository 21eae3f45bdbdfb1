//! Content hasher, uploader and deduplication gate.
//!
//! Every media item goes through [`MediaStore::store`]:
//!
//! 1. the media id is derived from the content id and the platform's native id;
//! 2. an item already recorded under that id is returned without touching the
//!    source;
//! 3. otherwise the bytes are streamed to object storage while being hashed;
//! 4. the row is inserted, and if that fails the object is deleted again.

use chrono::Utc;
use linkvault_core::models::{media_id_for, MediaDescriptor, MediaItem, Platform};
use linkvault_core::AppError;
use linkvault_db::MediaItemStore;
use linkvault_storage::keys::{media_file_name, media_key};
use linkvault_storage::{ObjectMetadata, Storage, StorageError};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, ReadBuf};

use crate::ByteStream;

/// Where a content's items are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreTarget {
    pub content_id: String,
    pub platform: Platform,
    /// First key segment: the display name for Telegram, `youtube` for YouTube.
    pub origin: String,
}

impl StoreTarget {
    pub fn new(content_id: impl Into<String>, platform: Platform, origin: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            platform,
            origin: origin.into(),
        }
    }

    pub fn media_id(&self, native_id: &str) -> String {
        media_id_for(&self.content_id, native_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreOutcome {
    /// Uploaded and recorded by this call.
    Stored(MediaItem),
    /// Already recorded, nothing was downloaded.
    AlreadyPresent(MediaItem),
}

impl StoreOutcome {
    pub fn item(&self) -> &MediaItem {
        match self {
            StoreOutcome::Stored(item) | StoreOutcome::AlreadyPresent(item) => item,
        }
    }

    pub fn into_item(self) -> MediaItem {
        match self {
            StoreOutcome::Stored(item) | StoreOutcome::AlreadyPresent(item) => item,
        }
    }

    pub fn was_stored(&self) -> bool {
        matches!(self, StoreOutcome::Stored(_))
    }
}

#[derive(Default)]
struct HashState {
    hasher: Sha256,
    bytes: u64,
    read_error: Option<String>,
}

/// Reader that hashes and counts everything read through it.
struct HashingReader {
    inner: ByteStream,
    state: Arc<Mutex<HashState>>,
}

impl HashingReader {
    fn new(inner: ByteStream) -> (Self, Arc<Mutex<HashState>>) {
        let state = Arc::new(Mutex::new(HashState::default()));
        (
            Self {
                inner,
                state: state.clone(),
            },
            state,
        )
    }
}

impl AsyncRead for HashingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = self.inner.as_mut().poll_read(cx, buf);

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &poll {
            Poll::Ready(Ok(())) => {
                let chunk = &buf.filled()[before..];
                state.hasher.update(chunk);
                state.bytes += chunk.len() as u64;
            }
            Poll::Ready(Err(e)) => state.read_error = Some(e.to_string()),
            Poll::Pending => {}
        }
        drop(state);

        poll
    }
}

fn take_digest(state: &Mutex<HashState>) -> (String, u64, Option<String>) {
    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    let taken = std::mem::take(&mut *state);
    (
        hex::encode(taken.hasher.finalize()),
        taken.bytes,
        taken.read_error,
    )
}

/// S3 user metadata must be ASCII; anything else is percent-encoded.
fn metadata_value(value: &str) -> String {
    if value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        value.to_string()
    } else {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }
}

fn object_metadata(
    target: &StoreTarget,
    media_id: &str,
    descriptor: &MediaDescriptor,
) -> ObjectMetadata {
    let mut metadata: ObjectMetadata = descriptor
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), metadata_value(v)))
        .collect();
    metadata.insert("content_id".to_string(), target.content_id.clone());
    metadata.insert("media_id".to_string(), media_id.to_string());
    metadata.insert(
        "original_file_name".to_string(),
        metadata_value(&descriptor.file_name),
    );
    metadata.insert("platform".to_string(), target.platform.to_string());
    metadata
}

/// Writes media bytes to object storage and records them.
#[derive(Clone)]
pub struct MediaStore {
    storage: Arc<dyn Storage>,
    media_items: Arc<dyn MediaItemStore>,
}

impl MediaStore {
    pub fn new(storage: Arc<dyn Storage>, media_items: Arc<dyn MediaItemStore>) -> Self {
        Self {
            storage,
            media_items,
        }
    }

    /// Item already recorded for this native id, if any.
    pub async fn existing(
        &self,
        target: &StoreTarget,
        native_id: &str,
    ) -> Result<Option<MediaItem>, AppError> {
        self.media_items.get(&target.media_id(native_id)).await
    }

    /// Items recorded for a content id.
    pub async fn list(&self, content_id: &str) -> Result<Vec<MediaItem>, AppError> {
        self.media_items.list_by_content(content_id).await
    }

    /// Store one item, opening its source only if it is not recorded yet.
    ///
    /// Opening and uploading together must finish within `deadline`.
    pub async fn store<F, Fut>(
        &self,
        target: &StoreTarget,
        descriptor: &MediaDescriptor,
        deadline: Duration,
        open: F,
    ) -> Result<StoreOutcome, AppError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<ByteStream, AppError>> + Send,
    {
        if let Some(item) = self.existing(target, &descriptor.native_id).await? {
            tracing::debug!(
                content_id = %target.content_id,
                media_id = %item.media_id,
                "Media item already stored, skipping download"
            );
            return Ok(StoreOutcome::AlreadyPresent(item));
        }

        self.upload_and_record(target, descriptor, deadline, open)
            .await
    }

    /// Store an already opened stream.
    pub async fn store_stream(
        &self,
        target: &StoreTarget,
        descriptor: &MediaDescriptor,
        deadline: Duration,
        reader: ByteStream,
    ) -> Result<StoreOutcome, AppError> {
        self.store(target, descriptor, deadline, || async move { Ok(reader) })
            .await
    }

    #[tracing::instrument(
        skip(self, descriptor, open),
        fields(content_id = %target.content_id, native_id = %descriptor.native_id)
    )]
    async fn upload_and_record<F, Fut>(
        &self,
        target: &StoreTarget,
        descriptor: &MediaDescriptor,
        deadline: Duration,
        open: F,
    ) -> Result<StoreOutcome, AppError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<ByteStream, AppError>> + Send,
    {
        let start = Instant::now();
        let media_id = target.media_id(&descriptor.native_id);
        let file_name = media_file_name(&descriptor.native_id, &descriptor.file_name);
        let storage_key = media_key(&target.origin, &target.content_id, &file_name);
        let metadata = object_metadata(target, &media_id, descriptor);

        let upload = async {
            let source = open().await?;
            let (reader, state) = HashingReader::new(source);
            let written = self
                .storage
                .upload_stream(
                    &storage_key,
                    descriptor.content_type(),
                    &metadata,
                    Box::pin(reader),
                )
                .await;
            let (hash, counted, read_error) = take_digest(&state);
            match (written, read_error) {
                (Ok(written), _) => {
                    if written != counted {
                        tracing::warn!(
                            storage_key = %storage_key,
                            written,
                            counted,
                            "Storage reported a different size than was read"
                        );
                    }
                    Ok((hash, counted))
                }
                (Err(_), Some(read_error)) => Err(AppError::Download(read_error)),
                (Err(StorageError::IoError(e)), None) => Err(AppError::Download(e.to_string())),
                (Err(e), None) => Err(AppError::from(e)),
            }
        };

        let uploaded = match tokio::time::timeout(deadline, upload).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "transfer exceeded {}s",
                deadline.as_secs()
            ))),
        };

        let (content_hash, byte_size) = match uploaded {
            Ok(done) => done,
            Err(e) => {
                self.discard_aborted(&media_id, &storage_key).await;
                return Err(e.context(format!("media {}", media_id)));
            }
        };

        let duplicate_of = self
            .duplicate_of(&media_id, &content_hash)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(
                    media_id = %media_id,
                    error = %e,
                    "Duplicate lookup failed"
                );
                None
            });

        let mut item_metadata: serde_json::Map<String, serde_json::Value> = descriptor
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        item_metadata.insert("kind".to_string(), descriptor.kind.as_str().into());
        if let Some(original) = &duplicate_of {
            item_metadata.insert("duplicate_of".to_string(), original.clone().into());
        }

        let item = MediaItem {
            media_id: media_id.clone(),
            content_id: target.content_id.clone(),
            origin_file_name: descriptor.file_name.clone(),
            file_name,
            mime_type: descriptor.content_type().to_string(),
            byte_size: i64::try_from(byte_size).unwrap_or(i64::MAX),
            content_hash,
            storage_backend: self.storage.backend_type().to_string(),
            storage_bucket: self.storage.bucket().to_string(),
            storage_key: storage_key.clone(),
            metadata: serde_json::Value::Object(item_metadata),
            created_at: Utc::now(),
        };

        match self.media_items.insert_if_absent(&item).await {
            Ok(true) => {
                tracing::info!(
                    media_id = %media_id,
                    storage_key = %storage_key,
                    size_bytes = byte_size,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Media item stored"
                );
                Ok(StoreOutcome::Stored(item))
            }
            Ok(false) => {
                // A concurrent ingestion recorded it first, under the same key
                let existing = self.media_items.get(&media_id).await?;
                Ok(StoreOutcome::AlreadyPresent(existing.unwrap_or(item)))
            }
            Err(insert_err) => Err(self.compensate(&media_id, &storage_key, insert_err).await),
        }
    }

    /// Remove what an aborted transfer may have left at `storage_key`.
    ///
    /// The backends clean up failed uploads but not abandoned ones. An object
    /// already referenced by a recorded item is left alone.
    async fn discard_aborted(&self, media_id: &str, storage_key: &str) {
        match self.media_items.get(media_id).await {
            Ok(Some(recorded)) if recorded.storage_key == storage_key => {
                tracing::debug!(
                    media_id = %media_id,
                    storage_key = %storage_key,
                    "Object belongs to a recorded item, keeping it"
                );
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    media_id = %media_id,
                    storage_key = %storage_key,
                    error = %e,
                    "Could not check for a recorded item, keeping object"
                );
                return;
            }
        }

        if let Err(delete_err) = self.storage.delete(storage_key).await {
            tracing::warn!(
                storage_key = %storage_key,
                error = %delete_err,
                "Failed to clean up after aborted upload"
            );
        }
    }

    async fn duplicate_of(
        &self,
        media_id: &str,
        content_hash: &str,
    ) -> Result<Option<String>, AppError> {
        let original = self
            .media_items
            .find_by_hash(content_hash)
            .await?
            .into_iter()
            .find(|existing| existing.media_id != media_id)
            .map(|existing| existing.media_id);

        if let Some(original) = &original {
            tracing::info!(
                media_id = %media_id,
                duplicate_of = %original,
                content_hash = %content_hash,
                "Identical bytes already stored under another media id"
            );
        }
        Ok(original)
    }

    /// Delete an object whose row could not be written.
    async fn compensate(&self, media_id: &str, storage_key: &str, insert_err: AppError) -> AppError {
        match self.storage.delete(storage_key).await {
            Ok(()) => {
                tracing::warn!(
                    media_id = %media_id,
                    storage_key = %storage_key,
                    error = %insert_err,
                    "Media item insert failed, uploaded object deleted"
                );
                insert_err.context(format!("media {}", media_id))
            }
            Err(delete_err) => {
                tracing::error!(
                    alert = true,
                    reconcile = "storage_metadata_divergence",
                    media_id = %media_id,
                    storage_key = %storage_key,
                    insert_error = %insert_err,
                    delete_error = %delete_err,
                    "Object stored without a media item and could not be deleted"
                );
                AppError::CompensationFailed {
                    key: storage_key.to_string(),
                    message: format!(
                        "insert of {} failed ({}) and delete failed ({})",
                        media_id, insert_err, delete_err
                    ),
                }
            }
        }
    }
}
