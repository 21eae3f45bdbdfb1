//! Media item repository: CRUD for media_items table.

use linkvault_core::models::MediaItem;
use linkvault_core::AppError;
use sqlx::{PgPool, Postgres};

const COLUMNS: &str = "media_id, content_id, origin_file_name, file_name, mime_type, byte_size, \
                       content_hash, storage_backend, storage_bucket, storage_key, metadata, created_at";

/// Repository for media_items table.
#[derive(Clone)]
pub struct MediaItemRepository {
    pool: PgPool,
}

impl MediaItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_items", db.operation = "select"))]
    pub async fn get(&self, media_id: &str) -> Result<Option<MediaItem>, AppError> {
        let item = sqlx::query_as::<Postgres, MediaItem>(&format!(
            "SELECT {} FROM media_items WHERE media_id = $1",
            COLUMNS
        ))
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_items", db.operation = "select"))]
    pub async fn list_by_content(&self, content_id: &str) -> Result<Vec<MediaItem>, AppError> {
        let items = sqlx::query_as::<Postgres, MediaItem>(&format!(
            "SELECT {} FROM media_items WHERE content_id = $1 ORDER BY created_at, media_id",
            COLUMNS
        ))
        .bind(content_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_items", db.operation = "select"))]
    pub async fn find_by_hash(&self, content_hash: &str) -> Result<Vec<MediaItem>, AppError> {
        let items = sqlx::query_as::<Postgres, MediaItem>(&format!(
            "SELECT {} FROM media_items WHERE content_hash = $1 ORDER BY created_at, media_id",
            COLUMNS
        ))
        .bind(content_hash)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Insert `item` unless a row with its media id exists. Returns whether a
    /// row was written.
    #[tracing::instrument(
        skip(self, item),
        fields(db.table = "media_items", db.operation = "insert", media_id = %item.media_id)
    )]
    pub async fn insert_if_absent(&self, item: &MediaItem) -> Result<bool, AppError> {
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO media_items ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (media_id) DO NOTHING
            "#,
            COLUMNS
        ))
        .bind(&item.media_id)
        .bind(&item.content_id)
        .bind(&item.origin_file_name)
        .bind(&item.file_name)
        .bind(&item.mime_type)
        .bind(item.byte_size)
        .bind(&item.content_hash)
        .bind(&item.storage_backend)
        .bind(&item.storage_bucket)
        .bind(&item.storage_key)
        .bind(&item.metadata)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
