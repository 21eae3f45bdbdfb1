//! Store trait abstractions for the ingestion pipeline
//!
//! These traits define the minimal interface the pipeline needs from the
//! relational store, allowing in-memory implementations in tests.

use async_trait::async_trait;
use linkvault_core::models::{ContentRecord, MediaItem, NewContentRecord};
use linkvault_core::AppError;

use crate::content::ContentRepository;
use crate::media_item::MediaItemRepository;

/// Content record operations
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>, AppError>;

    async fn get_by_source_link(&self, source_link: &str)
        -> Result<Option<ContentRecord>, AppError>;

    /// Create a Pending record or reset a Failed one; any other existing
    /// record is returned unchanged.
    async fn upsert_pending(&self, new: &NewContentRecord) -> Result<ContentRecord, AppError>;

    async fn mark_processing(&self, content_id: &str) -> Result<ContentRecord, AppError>;

    async fn mark_completed(
        &self,
        content_id: &str,
        media_count: i32,
        total_size: i64,
    ) -> Result<ContentRecord, AppError>;

    async fn mark_failed(
        &self,
        content_id: &str,
        error_message: &str,
    ) -> Result<ContentRecord, AppError>;

    async fn set_origin(
        &self,
        content_id: &str,
        origin_name: &str,
        display_name: &str,
    ) -> Result<(), AppError>;

    async fn delete(&self, content_id: &str) -> Result<bool, AppError>;
}

/// Media item operations
#[async_trait]
pub trait MediaItemStore: Send + Sync {
    async fn get(&self, media_id: &str) -> Result<Option<MediaItem>, AppError>;

    async fn list_by_content(&self, content_id: &str) -> Result<Vec<MediaItem>, AppError>;

    async fn find_by_hash(&self, content_hash: &str) -> Result<Vec<MediaItem>, AppError>;

    /// Returns `true` if the row was written, `false` if the media id existed.
    async fn insert_if_absent(&self, item: &MediaItem) -> Result<bool, AppError>;
}

// Implementations for concrete repository types

#[async_trait]
impl ContentStore for ContentRepository {
    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>, AppError> {
        ContentRepository::get(self, content_id).await
    }

    async fn get_by_source_link(
        &self,
        source_link: &str,
    ) -> Result<Option<ContentRecord>, AppError> {
        ContentRepository::get_by_source_link(self, source_link).await
    }

    async fn upsert_pending(&self, new: &NewContentRecord) -> Result<ContentRecord, AppError> {
        ContentRepository::upsert_pending(self, new).await
    }

    async fn mark_processing(&self, content_id: &str) -> Result<ContentRecord, AppError> {
        ContentRepository::mark_processing(self, content_id).await
    }

    async fn mark_completed(
        &self,
        content_id: &str,
        media_count: i32,
        total_size: i64,
    ) -> Result<ContentRecord, AppError> {
        ContentRepository::mark_completed(self, content_id, media_count, total_size).await
    }

    async fn mark_failed(
        &self,
        content_id: &str,
        error_message: &str,
    ) -> Result<ContentRecord, AppError> {
        ContentRepository::mark_failed(self, content_id, error_message).await
    }

    async fn set_origin(
        &self,
        content_id: &str,
        origin_name: &str,
        display_name: &str,
    ) -> Result<(), AppError> {
        ContentRepository::set_origin(self, content_id, origin_name, display_name).await
    }

    async fn delete(&self, content_id: &str) -> Result<bool, AppError> {
        ContentRepository::delete(self, content_id).await
    }
}

#[async_trait]
impl MediaItemStore for MediaItemRepository {
    async fn get(&self, media_id: &str) -> Result<Option<MediaItem>, AppError> {
        MediaItemRepository::get(self, media_id).await
    }

    async fn list_by_content(&self, content_id: &str) -> Result<Vec<MediaItem>, AppError> {
        MediaItemRepository::list_by_content(self, content_id).await
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Vec<MediaItem>, AppError> {
        MediaItemRepository::find_by_hash(self, content_hash).await
    }

    async fn insert_if_absent(&self, item: &MediaItem) -> Result<bool, AppError> {
        MediaItemRepository::insert_if_absent(self, item).await
    }
}
