//! Ingestion orchestrator.
//!
//! `submit` classifies a link, persists a Pending content record and returns
//! it; the ingestion itself runs on a background task owned by the
//! orchestrator's [`TaskSpawner`]. That task moves the record to Processing
//! before any media work and always persists Completed or Failed at the end,
//! panics included.

use futures::FutureExt;
use linkvault_core::models::{
    ContentRecord, ContentStatus, MediaItem, NewContentRecord, Platform,
};
use linkvault_core::{AppError, ErrorMetadata, LogLevel};
use linkvault_db::ContentStore;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::classifier::{classify, LinkTarget};
use crate::spawner::TaskSpawner;
use crate::store::{MediaStore, StoreOutcome, StoreTarget};
use crate::telegram::{ExtractedMedia, TelegramExtractor};
use crate::youtube::YouTubeResolver;

const YOUTUBE_ORIGIN: &str = "youtube";

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Process-wide limit on simultaneous downloads.
    pub max_concurrent_downloads: usize,
    /// Deadline for a single item's download and upload.
    pub download_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
            download_timeout: Duration::from_secs(1800),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Requested YouTube quality in lines (`720` for 720p).
    pub quality: Option<u32>,
}

/// A content record together with its stored media.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub record: ContentRecord,
    pub items: Vec<MediaItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Summary {
    media_count: i32,
    total_size: i64,
}

impl Summary {
    fn of(items: &[MediaItem]) -> Self {
        Self {
            media_count: i32::try_from(items.len()).unwrap_or(i32::MAX),
            total_size: items.iter().map(|i| i.byte_size).sum(),
        }
    }
}

/// Content ids with an ingestion running in this process.
type InFlight = Arc<Mutex<HashSet<String>>>;

/// Releases an in-flight claim when dropped.
struct FlightGuard {
    in_flight: InFlight,
    content_id: String,
}

impl FlightGuard {
    fn claim(in_flight: &InFlight, content_id: &str) -> Option<Self> {
        let mut set = in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(content_id.to_string()) {
            return None;
        }
        Some(Self {
            in_flight: in_flight.clone(),
            content_id: content_id.to_string(),
        })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.content_id);
    }
}

struct Inner {
    contents: Arc<dyn ContentStore>,
    store: MediaStore,
    telegram: TelegramExtractor,
    youtube: YouTubeResolver,
    admission: Arc<Semaphore>,
    spawner: TaskSpawner,
    in_flight: InFlight,
    config: IngestConfig,
}

/// Entry point of the pipeline. Cheap to clone.
#[derive(Clone)]
pub struct IngestOrchestrator {
    inner: Arc<Inner>,
}

impl IngestOrchestrator {
    pub fn new(
        contents: Arc<dyn ContentStore>,
        store: MediaStore,
        telegram: TelegramExtractor,
        youtube: YouTubeResolver,
        config: IngestConfig,
    ) -> Self {
        let permits = config.max_concurrent_downloads.max(1);
        Self {
            inner: Arc::new(Inner {
                contents,
                store,
                telegram,
                youtube,
                admission: Arc::new(Semaphore::new(permits)),
                spawner: TaskSpawner::new(),
                in_flight: Arc::new(Mutex::new(HashSet::new())),
                config,
            }),
        }
    }

    pub async fn submit(&self, link: &str) -> Result<ContentRecord, AppError> {
        self.submit_with(link, SubmitOptions::default()).await
    }

    /// Accept a link for ingestion.
    ///
    /// Returns the persisted record without waiting for the ingestion. A
    /// Completed record, or one already being ingested, is returned as is.
    #[tracing::instrument(skip(self, options))]
    pub async fn submit_with(
        &self,
        link: &str,
        options: SubmitOptions,
    ) -> Result<ContentRecord, AppError> {
        let link = link.trim();
        let target = classify(link);
        let (platform, content_id) = match (target.platform(), target.content_id()) {
            (Some(platform), Some(content_id)) => (platform, content_id),
            _ => return Err(AppError::InvalidLink(link.to_string())),
        };

        if self.inner.spawner.is_shutting_down() {
            return Err(AppError::Cancelled(
                "ingestion service is shutting down".to_string(),
            ));
        }

        if let Some(existing) = self.inner.contents.get(&content_id).await? {
            if existing.is_completed() {
                tracing::debug!(content_id = %content_id, "Content already ingested");
                return Ok(existing);
            }
        }

        let new = NewContentRecord {
            content_id: content_id.clone(),
            source_link: link.to_string(),
            platform,
            origin_name: None,
            display_name: None,
        };

        let Some(guard) = FlightGuard::claim(&self.inner.in_flight, &content_id) else {
            tracing::debug!(content_id = %content_id, "Ingestion already running");
            return match self.inner.contents.get(&content_id).await? {
                Some(record) => Ok(record),
                None => self.inner.contents.upsert_pending(&new).await,
            };
        };

        let record = self.inner.contents.upsert_pending(&new).await?;
        if record.status != ContentStatus::Pending {
            // Completed meanwhile, or Processing under another process
            tracing::debug!(
                content_id = %content_id,
                status = %record.status,
                "Content not pending, nothing to start"
            );
            return Ok(record);
        }

        tracing::info!(
            content_id = %content_id,
            platform = %platform,
            "Ingestion accepted"
        );

        let inner = self.inner.clone();
        self.inner.spawner.spawn(async move {
            let _guard = guard;
            inner.run(target, content_id, options).await;
        });

        Ok(record)
    }

    /// Current record and stored items.
    pub async fn status(&self, content_id: &str) -> Result<Option<IngestReport>, AppError> {
        let Some(record) = self.inner.contents.get(content_id).await? else {
            return Ok(None);
        };
        let items = self.inner.store.list(content_id).await?;
        Ok(Some(IngestReport { record, items }))
    }

    /// Fail a record stuck in Processing so it can be submitted again.
    pub async fn abandon(&self, content_id: &str) -> Result<ContentRecord, AppError> {
        let in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(content_id);
        if in_flight {
            return Err(AppError::InvalidState(format!(
                "content {} is being ingested by this process",
                content_id
            )));
        }
        self.inner
            .contents
            .mark_failed(content_id, "INTERRUPTED: ingestion abandoned by operator")
            .await
    }

    /// Wait for all running ingestions without cancelling them.
    pub async fn drain(&self) {
        self.inner.spawner.drain().await;
    }

    /// Stop accepting work, cancel queued downloads and wait up to `grace`
    /// for ingestions to persist their final status.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        tracing::info!(
            active = self.inner.spawner.active_tasks(),
            "Shutting down ingestion"
        );
        self.inner.spawner.shutdown(grace).await
    }
}

impl Inner {
    async fn run(self: Arc<Self>, target: LinkTarget, content_id: String, options: SubmitOptions) {
        let start = Instant::now();

        if let Err(e) = self.contents.mark_processing(&content_id).await {
            tracing::error!(
                content_id = %content_id,
                error = %e,
                "Could not mark content as processing, left pending"
            );
            return;
        }

        let result = match AssertUnwindSafe(self.ingest(&target, &content_id, &options))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(AppError::Internal(format!("ingestion task panicked: {}", reason)))
            }
        };

        let persisted = match result {
            Ok(summary) => {
                tracing::info!(
                    content_id = %content_id,
                    media_count = summary.media_count,
                    size_bytes = summary.total_size,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Ingestion completed"
                );
                self.contents
                    .mark_completed(&content_id, summary.media_count, summary.total_size)
                    .await
            }
            Err(e) => {
                log_failure(&content_id, &e, start);
                self.contents
                    .mark_failed(&content_id, &e.persisted_message())
                    .await
            }
        };

        if let Err(e) = persisted {
            tracing::error!(
                content_id = %content_id,
                error = %e,
                "Failed to persist final ingestion status"
            );
        }
    }

    async fn ingest(
        self: &Arc<Self>,
        target: &LinkTarget,
        content_id: &str,
        options: &SubmitOptions,
    ) -> Result<Summary, AppError> {
        match target {
            LinkTarget::Telegram {
                channel,
                message_id,
            } => self.ingest_telegram(content_id, channel, *message_id).await,
            LinkTarget::YouTube { video_id } => {
                self.ingest_youtube(content_id, video_id, options.quality)
                    .await
            }
            LinkTarget::Unrecognized => Err(AppError::InvalidLink(content_id.to_string())),
        }
    }

    async fn ingest_telegram(
        self: &Arc<Self>,
        content_id: &str,
        channel: &str,
        message_id: i64,
    ) -> Result<Summary, AppError> {
        let post = self.telegram.extract(channel, message_id).await?;
        let username = &post.channel.username;
        self.contents
            .set_origin(content_id, username, username)
            .await?;

        // Keys follow the display name, which may have been renamed since
        let origin = self
            .contents
            .get(content_id)
            .await?
            .and_then(|record| record.display_name)
            .unwrap_or_else(|| username.clone());
        let target = StoreTarget::new(content_id, Platform::Telegram, origin);
        let total = post.items.len();

        let mut tasks = JoinSet::new();
        for item in post.items {
            let this = self.clone();
            let target = target.clone();
            tasks.spawn(async move {
                let media_id = target.media_id(&item.descriptor.native_id);
                let result = this.store_telegram_item(&target, &item).await;
                (media_id, result)
            });
        }

        let mut stored = Vec::with_capacity(total);
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => stored.push(outcome.into_item()),
                Ok((media_id, Err(e))) => {
                    tracing::warn!(
                        content_id = %content_id,
                        media_id = %media_id,
                        error_code = e.error_code(),
                        error = %e,
                        "Media item failed"
                    );
                    failures.push(e);
                }
                Err(join_err) => {
                    tracing::error!(
                        content_id = %content_id,
                        error = %join_err,
                        "Media item task aborted"
                    );
                    failures.push(AppError::Internal(format!(
                        "media task aborted: {}",
                        join_err
                    )));
                }
            }
        }

        aggregate(failures, total)?;
        Ok(Summary::of(&stored))
    }

    async fn store_telegram_item(
        &self,
        target: &StoreTarget,
        item: &ExtractedMedia,
    ) -> Result<StoreOutcome, AppError> {
        if let Some(existing) = self
            .store
            .existing(target, &item.descriptor.native_id)
            .await?
        {
            return Ok(StoreOutcome::AlreadyPresent(existing));
        }

        let _permit = self.admit().await?;
        self.store
            .store(
                target,
                &item.descriptor,
                self.config.download_timeout,
                || self.telegram.download(item),
            )
            .await
    }

    async fn ingest_youtube(
        &self,
        content_id: &str,
        video_id: &str,
        quality: Option<u32>,
    ) -> Result<Summary, AppError> {
        let target = StoreTarget::new(content_id, Platform::Youtube, YOUTUBE_ORIGIN);

        if let Some(existing) = self.store.existing(&target, video_id).await? {
            tracing::debug!(
                content_id = %content_id,
                media_id = %existing.media_id,
                "Merged video already stored, skipping download"
            );
            return Ok(Summary::of(&[existing]));
        }

        let _permit = self.admit().await?;
        let (merged, info) = self.youtube.fetch(video_id, quality).await?;
        self.contents
            .set_origin(content_id, &info.author, &info.author)
            .await?;

        let descriptor = merged.descriptor(&info);
        let outcome = self
            .store
            .store_stream(
                &target,
                &descriptor,
                self.config.download_timeout,
                Box::pin(merged),
            )
            .await?;

        Ok(Summary::of(&[outcome.into_item()]))
    }

    /// Wait for a download slot, giving up on shutdown.
    async fn admit(&self) -> Result<OwnedSemaphorePermit, AppError> {
        let cancel = self.spawner.cancel_token();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled(
                "shutdown before download started".to_string(),
            )),
            permit = self.admission.clone().acquire_owned() => permit.map_err(|_| {
                AppError::Cancelled("download admission closed".to_string())
            }),
        }
    }
}

/// Fold per-item failures into the post's result.
///
/// Any failure fails the post. A compensation failure is surfaced as is so it
/// stays distinguishable; a single-item post keeps its own error.
fn aggregate(mut failures: Vec<AppError>, total: usize) -> Result<(), AppError> {
    if failures.is_empty() {
        return Ok(());
    }
    if let Some(pos) = failures
        .iter()
        .position(|e| matches!(e, AppError::CompensationFailed { .. }))
    {
        return Err(failures.swap_remove(pos));
    }
    if total == 1 && failures.len() == 1 {
        return Err(failures.swap_remove(0));
    }
    Err(AppError::PartialFailure {
        failed: failures.len(),
        total,
    })
}

fn log_failure(content_id: &str, error: &AppError, start: Instant) {
    let duration_ms = start.elapsed().as_millis() as u64;
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(
            content_id = %content_id,
            error_code = error.error_code(),
            error = %error,
            duration_ms,
            "Ingestion failed"
        ),
        LogLevel::Warn => tracing::warn!(
            content_id = %content_id,
            error_code = error.error_code(),
            error = %error,
            duration_ms,
            "Ingestion failed"
        ),
        LogLevel::Error => tracing::error!(
            content_id = %content_id,
            error_code = error.error_code(),
            error = %error,
            details = %error.detailed_message(),
            duration_ms,
            "Ingestion failed"
        ),
    }
}
