//! Content record repository: lifecycle updates for the content_records table.
//!
//! Every status update carries the expected current status in its WHERE
//! clause, so a transition the lifecycle does not allow matches no row and is
//! reported as `AppError::InvalidState` instead of being applied.

use linkvault_core::models::{ContentRecord, ContentStatus, NewContentRecord};
use linkvault_core::AppError;
use sqlx::{PgPool, Postgres};

const COLUMNS: &str = "content_id, source_link, platform, origin_name, display_name, status, \
                       media_count, total_size, error_message, created_at, updated_at";

/// Repository for content_records table.
#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "content_records", db.operation = "select"))]
    pub async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ContentRecord>(&format!(
            "SELECT {} FROM content_records WHERE content_id = $1",
            COLUMNS
        ))
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "content_records", db.operation = "select"))]
    pub async fn get_by_source_link(
        &self,
        source_link: &str,
    ) -> Result<Option<ContentRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ContentRecord>(&format!(
            "SELECT {} FROM content_records WHERE source_link = $1 ORDER BY created_at LIMIT 1",
            COLUMNS
        ))
        .bind(source_link)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Create a Pending record, or reset a Failed one to Pending.
    ///
    /// `content_id`, `created_at` and `origin_name` of a reset row are
    /// preserved. Pending, Processing and Completed rows are returned
    /// unchanged.
    #[tracing::instrument(
        skip(self, new),
        fields(db.table = "content_records", db.operation = "upsert", content_id = %new.content_id)
    )]
    pub async fn upsert_pending(&self, new: &NewContentRecord) -> Result<ContentRecord, AppError> {
        let upserted = sqlx::query_as::<Postgres, ContentRecord>(&format!(
            r#"
            INSERT INTO content_records (content_id, source_link, platform, origin_name, display_name, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            ON CONFLICT (content_id) DO UPDATE SET
                status = 'pending',
                source_link = EXCLUDED.source_link,
                origin_name = COALESCE(content_records.origin_name, EXCLUDED.origin_name),
                display_name = COALESCE(content_records.display_name, EXCLUDED.display_name),
                media_count = NULL,
                total_size = NULL,
                error_message = NULL,
                updated_at = NOW()
            WHERE content_records.status = 'failed'
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&new.content_id)
        .bind(&new.source_link)
        .bind(new.platform)
        .bind(&new.origin_name)
        .bind(&new.display_name)
        .fetch_optional(&self.pool)
        .await?;

        match upserted {
            Some(record) => Ok(record),
            None => self.get(&new.content_id).await?.ok_or_else(|| {
                AppError::Internal(format!(
                    "content record {} vanished during upsert",
                    new.content_id
                ))
            }),
        }
    }

    async fn transition(
        &self,
        content_id: &str,
        from: ContentStatus,
        to: ContentStatus,
        set_clause: &str,
        bind_completed: Option<(i32, i64)>,
        bind_error: Option<&str>,
    ) -> Result<ContentRecord, AppError> {
        if !from.can_transition_to(to) {
            return Err(AppError::InvalidState(format!(
                "{} -> {} is not a valid transition",
                from, to
            )));
        }

        let sql = format!(
            "UPDATE content_records SET status = $2, {}, updated_at = NOW() \
             WHERE content_id = $1 AND status = $3 RETURNING {}",
            set_clause, COLUMNS
        );
        let mut query = sqlx::query_as::<Postgres, ContentRecord>(&sql)
            .bind(content_id)
            .bind(to)
            .bind(from);
        if let Some((count, size)) = bind_completed {
            query = query.bind(count).bind(size);
        }
        if let Some(message) = bind_error {
            query = query.bind(message);
        }

        match query.fetch_optional(&self.pool).await? {
            Some(record) => Ok(record),
            None => match self.get(content_id).await? {
                Some(current) => Err(AppError::InvalidState(format!(
                    "content {} is {}, expected {}",
                    content_id, current.status, from
                ))),
                None => Err(AppError::NotFound(format!("content {}", content_id))),
            },
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "content_records", db.operation = "update"))]
    pub async fn mark_processing(&self, content_id: &str) -> Result<ContentRecord, AppError> {
        self.transition(
            content_id,
            ContentStatus::Pending,
            ContentStatus::Processing,
            "error_message = NULL",
            None,
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "content_records", db.operation = "update"))]
    pub async fn mark_completed(
        &self,
        content_id: &str,
        media_count: i32,
        total_size: i64,
    ) -> Result<ContentRecord, AppError> {
        self.transition(
            content_id,
            ContentStatus::Processing,
            ContentStatus::Completed,
            "media_count = $4, total_size = $5, error_message = NULL",
            Some((media_count, total_size)),
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self, error_message), fields(db.table = "content_records", db.operation = "update"))]
    pub async fn mark_failed(
        &self,
        content_id: &str,
        error_message: &str,
    ) -> Result<ContentRecord, AppError> {
        self.transition(
            content_id,
            ContentStatus::Processing,
            ContentStatus::Failed,
            "error_message = $4, media_count = NULL, total_size = NULL",
            None,
            Some(error_message),
        )
        .await
    }

    /// Record the origin (channel or author) once. `origin_name` is never
    /// overwritten; `display_name` is filled only when empty.
    #[tracing::instrument(skip(self), fields(db.table = "content_records", db.operation = "update"))]
    pub async fn set_origin(
        &self,
        content_id: &str,
        origin_name: &str,
        display_name: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE content_records
            SET origin_name = COALESCE(origin_name, $2),
                display_name = COALESCE(display_name, $3),
                updated_at = NOW()
            WHERE content_id = $1
            "#,
        )
        .bind(content_id)
        .bind(origin_name)
        .bind(display_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a record and, through the foreign key, its media items rows.
    #[tracing::instrument(skip(self), fields(db.table = "content_records", db.operation = "delete"))]
    pub async fn delete(&self, content_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM content_records WHERE content_id = $1")
            .bind(content_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
