//! Wiring and output helpers for the `linkvault` binary.

use anyhow::{Context, Result};
use linkvault_core::models::{ContentRecord, MediaItem};
use linkvault_core::Config;
use linkvault_db::{setup_database, ContentRepository, MediaItemRepository};
use linkvault_ingest::telegram::TelegramExtractor;
use linkvault_ingest::youtube::formats::parse_quality;
use linkvault_ingest::youtube::{
    FfmpegMuxer, InnertubeClient, InnertubeConfig, MuxerConfig, YouTubeConfig, YouTubeResolver,
};
use linkvault_ingest::{IngestConfig, IngestOrchestrator, IngestReport, MediaStore};
use linkvault_storage::create_storage;
use serde::Serialize;
use std::sync::Arc;

/// Build the orchestrator and everything it depends on from configuration.
pub async fn build_orchestrator(config: &Config) -> Result<IngestOrchestrator> {
    let pool = setup_database(&config.database).await?;
    let storage = create_storage(&config.storage)
        .await
        .context("Failed to initialize storage")?;

    let contents = Arc::new(ContentRepository::new(pool.clone()));
    let media_items = Arc::new(MediaItemRepository::new(pool));

    let youtube_client = InnertubeClient::new(InnertubeConfig {
        api_base: config.pipeline.youtube_api_base.clone(),
        ..Default::default()
    })?;
    let muxer = FfmpegMuxer::new(MuxerConfig {
        ffmpeg_path: config.pipeline.ffmpeg_path.clone(),
        audio_codec: config.pipeline.mux_audio_codec.clone(),
    });
    let default_quality = match config.pipeline.youtube_default_quality.as_deref() {
        Some(setting) => parse_quality_arg(setting).context("Invalid YOUTUBE_DEFAULT_QUALITY")?,
        None => None,
    };
    let resolver = YouTubeResolver::new(
        Arc::new(youtube_client),
        Arc::new(muxer),
        YouTubeConfig {
            temp_dir: config.pipeline.temp_dir.clone(),
            download_timeout: config.download_timeout(),
            mux_timeout: config.mux_timeout(),
            default_quality,
        },
    );

    // No MTProto session is wired into this binary
    let telegram = TelegramExtractor::unavailable();
    tracing::warn!("Telegram session not configured, Telegram links will fail as unavailable");

    tracing::info!(
        storage_backend = %storage.backend_type(),
        max_concurrent_downloads = config.pipeline.max_concurrent_downloads,
        "Ingestion pipeline ready"
    );

    Ok(IngestOrchestrator::new(
        contents,
        MediaStore::new(storage, media_items),
        telegram,
        resolver,
        IngestConfig {
            max_concurrent_downloads: config.pipeline.max_concurrent_downloads,
            download_timeout: config.download_timeout(),
        },
    ))
}

/// `720p`, `1080`, or `best`/`highest` for no preference.
pub fn parse_quality_arg(value: &str) -> Result<Option<u32>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("best") || value.eq_ignore_ascii_case("highest") {
        return Ok(None);
    }
    parse_quality(value)
        .map(Some)
        .with_context(|| format!("'{}' is not a video quality (expected e.g. 720p)", value))
}

/// Human-readable byte count.
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[derive(Serialize)]
pub struct ReportView<'a> {
    pub record: &'a ContentRecord,
    pub items: &'a [MediaItem],
}

impl<'a> From<&'a IngestReport> for ReportView<'a> {
    fn from(report: &'a IngestReport) -> Self {
        Self {
            record: &report.record,
            items: &report.items,
        }
    }
}

pub fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}
