use async_trait::async_trait;
use chrono::Utc;
use linkvault_core::models::{ContentRecord, ContentStatus, MediaItem, NewContentRecord};
use linkvault_core::{AppError, StorageBackend};
use linkvault_db::{ContentStore, MediaItemStore};
use linkvault_storage::{ObjectMetadata, Storage, StorageError, StorageReader, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncReadExt;

#[derive(Default)]
pub struct MemoryContentStore {
    records: Mutex<HashMap<String, ContentRecord>>,
    history: Mutex<HashMap<String, Vec<ContentStatus>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status the record was written with, in order.
    pub fn history(&self, content_id: &str) -> Vec<ContentStatus> {
        self.history
            .lock()
            .unwrap()
            .get(content_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, content_id: &str) -> Option<ContentRecord> {
        self.records.lock().unwrap().get(content_id).cloned()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn push_history(&self, content_id: &str, status: ContentStatus) {
        self.history
            .lock()
            .unwrap()
            .entry(content_id.to_string())
            .or_default()
            .push(status);
    }

    fn transition(
        &self,
        content_id: &str,
        from: ContentStatus,
        to: ContentStatus,
        apply: impl FnOnce(&mut ContentRecord),
    ) -> Result<ContentRecord, AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(content_id)
            .ok_or_else(|| AppError::NotFound(format!("content {}", content_id)))?;
        if record.status != from || !from.can_transition_to(to) {
            return Err(AppError::InvalidState(format!(
                "content {} is {}, expected {}",
                content_id, record.status, from
            )));
        }
        record.status = to;
        record.updated_at = Utc::now();
        apply(record);
        let updated = record.clone();
        drop(records);
        self.push_history(content_id, to);
        Ok(updated)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>, AppError> {
        Ok(self.record(content_id))
    }

    async fn get_by_source_link(
        &self,
        source_link: &str,
    ) -> Result<Option<ContentRecord>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.source_link == source_link)
            .cloned())
    }

    async fn upsert_pending(&self, new: &NewContentRecord) -> Result<ContentRecord, AppError> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let record = records
            .entry(new.content_id.clone())
            .or_insert_with(|| ContentRecord {
                content_id: new.content_id.clone(),
                source_link: new.source_link.clone(),
                platform: new.platform,
                origin_name: new.origin_name.clone(),
                display_name: new.display_name.clone(),
                status: ContentStatus::Failed,
                media_count: None,
                total_size: None,
                error_message: None,
                created_at: now,
                updated_at: now,
            });
        if record.status != ContentStatus::Failed {
            return Ok(record.clone());
        }
        record.status = ContentStatus::Pending;
        record.source_link = new.source_link.clone();
        record.error_message = None;
        record.media_count = None;
        record.total_size = None;
        record.updated_at = now;
        let updated = record.clone();
        drop(records);
        self.push_history(&new.content_id, ContentStatus::Pending);
        Ok(updated)
    }

    async fn mark_processing(&self, content_id: &str) -> Result<ContentRecord, AppError> {
        self.transition(
            content_id,
            ContentStatus::Pending,
            ContentStatus::Processing,
            |_| {},
        )
    }

    async fn mark_completed(
        &self,
        content_id: &str,
        media_count: i32,
        total_size: i64,
    ) -> Result<ContentRecord, AppError> {
        self.transition(
            content_id,
            ContentStatus::Processing,
            ContentStatus::Completed,
            |r| {
                r.media_count = Some(media_count);
                r.total_size = Some(total_size);
            },
        )
    }

    async fn mark_failed(
        &self,
        content_id: &str,
        error_message: &str,
    ) -> Result<ContentRecord, AppError> {
        self.transition(
            content_id,
            ContentStatus::Processing,
            ContentStatus::Failed,
            |r| r.error_message = Some(error_message.to_string()),
        )
    }

    async fn set_origin(
        &self,
        content_id: &str,
        origin_name: &str,
        display_name: &str,
    ) -> Result<(), AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(content_id)
            .ok_or_else(|| AppError::NotFound(format!("content {}", content_id)))?;
        record
            .origin_name
            .get_or_insert_with(|| origin_name.to_string());
        record
            .display_name
            .get_or_insert_with(|| display_name.to_string());
        Ok(())
    }

    async fn delete(&self, content_id: &str) -> Result<bool, AppError> {
        Ok(self.records.lock().unwrap().remove(content_id).is_some())
    }
}

#[derive(Default)]
pub struct MemoryMediaItemStore {
    items: Mutex<Vec<MediaItem>>,
    fail_insert: AtomicBool,
}

impl MemoryMediaItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub fn get_sync(&self, media_id: &str) -> Option<MediaItem> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.media_id == media_id)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaItemStore for MemoryMediaItemStore {
    async fn get(&self, media_id: &str) -> Result<Option<MediaItem>, AppError> {
        Ok(self.get_sync(media_id))
    }

    async fn list_by_content(&self, content_id: &str) -> Result<Vec<MediaItem>, AppError> {
        let mut items: Vec<MediaItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.content_id == content_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.media_id.cmp(&b.media_id));
        Ok(items)
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Vec<MediaItem>, AppError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.content_hash == content_hash)
            .cloned()
            .collect())
    }

    async fn insert_if_absent(&self, item: &MediaItem) -> Result<bool, AppError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected insert failure".to_string()));
        }
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|i| i.media_id == item.media_id) {
            return Ok(false);
        }
        items.push(item.clone());
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    fail_delete: AtomicBool,
    uploads: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    upload_delay: Mutex<Option<Duration>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = Some(delay);
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Uploads started, successful or not.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Highest number of uploads seen running at once.
    pub fn max_concurrent_uploads(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload_stream(
        &self,
        storage_key: &str,
        content_type: &str,
        metadata: &ObjectMetadata,
        mut reader: StorageReader,
    ) -> StorageResult<u64> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let delay = *self.upload_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut data = Vec::new();
        let read = reader.read_to_end(&mut data).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        read.map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let size = data.len() as u64;
        self.objects.lock().unwrap().insert(
            storage_key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(size)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.object(storage_key)
            .map(|o| o.data)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("injected delete failure".to_string()));
        }
        self.objects.lock().unwrap().remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    fn bucket(&self) -> &str {
        "memory"
    }
}
