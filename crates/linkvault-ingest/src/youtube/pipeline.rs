use linkvault_core::models::{MediaDescriptor, MediaKind};
use linkvault_core::AppError;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};

use super::client::YouTubeClient;
use super::formats::{select_formats, StreamFormat, VideoInfo};
use super::muxer::Muxer;
use super::sanitize::sanitize_file_name;

#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    /// Parent of the per-fetch scratch directories, system temp if unset.
    pub temp_dir: Option<PathBuf>,
    pub download_timeout: Duration,
    pub mux_timeout: Duration,
    /// Quality used when a submission does not ask for one.
    pub default_quality: Option<u32>,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            download_timeout: Duration::from_secs(1800),
            mux_timeout: Duration::from_secs(900),
            default_quality: None,
        }
    }
}

/// Merged mp4 ready to be read.
///
/// Owns the scratch directory holding the file; the directory is removed when
/// the stream is dropped, whether or not it was read to the end.
pub struct MergedStream {
    file: tokio::fs::File,
    /// Sanitized name for the stored object.
    pub file_name: String,
    /// Size of the merged file.
    pub size: u64,
    pub video_itag: u32,
    pub audio_itag: u32,
    scratch: TempDir,
}

impl MergedStream {
    /// Descriptor of the merged file, keyed by the video id.
    pub fn descriptor(&self, info: &VideoInfo) -> MediaDescriptor {
        let mut descriptor =
            MediaDescriptor::new(info.video_id.clone(), self.file_name.clone(), MediaKind::Video)
                .with_size(self.size)
                .with_mime("video/mp4")
                .with_metadata("video_id", info.video_id.clone())
                .with_metadata("title", info.title.clone())
                .with_metadata("author", info.author.clone())
                .with_metadata("video_itag", self.video_itag.to_string())
                .with_metadata("audio_itag", self.audio_itag.to_string());
        if let Some(length) = info.length_seconds {
            descriptor = descriptor.with_metadata("duration_secs", length.to_string());
        }
        descriptor
    }

    /// Directory removed on drop.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

impl AsyncRead for MergedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

/// Resolves YouTube videos and produces a single merged mp4 per video.
#[derive(Clone)]
pub struct YouTubeResolver {
    client: Arc<dyn YouTubeClient>,
    muxer: Arc<dyn Muxer>,
    config: YouTubeConfig,
}

impl YouTubeResolver {
    pub fn new(
        client: Arc<dyn YouTubeClient>,
        muxer: Arc<dyn Muxer>,
        config: YouTubeConfig,
    ) -> Self {
        Self {
            client,
            muxer,
            config,
        }
    }

    pub async fn resolve(&self, video_id: &str) -> Result<VideoInfo, AppError> {
        Ok(self.client.list_formats(video_id).await?.info)
    }

    /// Download the best video-only and audio-only streams and merge them.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(
        &self,
        video_id: &str,
        quality: Option<u32>,
    ) -> Result<(MergedStream, VideoInfo), AppError> {
        let manifest = self.client.list_formats(video_id).await?;
        let requested = quality.or(self.config.default_quality);
        let (video, audio) = select_formats(&manifest, requested)?;

        tracing::info!(
            video_id = %video_id,
            video_itag = video.itag,
            video_quality = video.quality(),
            audio_itag = audio.itag,
            audio_bitrate = audio.bitrate,
            "YouTube formats selected"
        );

        let dir = self.create_scratch_dir()?;
        let video_path = dir.path().join(format!("video.{}", video.container));
        let audio_path = dir.path().join(format!("audio.{}", audio.container));

        tokio::try_join!(
            self.download_to(video, &video_path),
            self.download_to(audio, &audio_path)
        )?;

        let output_path = dir.path().join("merged.mp4");
        let muxed = self
            .muxer
            .mux(&video_path, &audio_path, &output_path, self.config.mux_timeout)
            .await?;

        // Inputs are no longer needed once merged
        let _ = tokio::fs::remove_file(&video_path).await;
        let _ = tokio::fs::remove_file(&audio_path).await;

        let file = tokio::fs::File::open(&muxed.output_path).await?;
        let stream = MergedStream {
            file,
            file_name: sanitize_file_name(&manifest.info.title),
            size: muxed.byte_size,
            video_itag: video.itag,
            audio_itag: audio.itag,
            scratch: dir,
        };

        Ok((stream, manifest.info))
    }

    fn create_scratch_dir(&self) -> Result<TempDir, AppError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("linkvault-yt-");
        let dir = match &self.config.temp_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        dir.map_err(|e| AppError::Internal(format!("failed to create scratch directory: {}", e)))
    }

    async fn download_to(&self, format: &StreamFormat, path: &Path) -> Result<u64, AppError> {
        let start = Instant::now();
        let deadline = self.config.download_timeout;

        let copy = async {
            let mut reader = self.client.open_stream(format).await?;
            let mut file = tokio::fs::File::create(path).await?;
            let written = tokio::io::copy(&mut reader, &mut file)
                .await
                .map_err(|e| AppError::Download(format!("itag {}: {}", format.itag, e)))?;
            file.flush().await?;
            Ok::<u64, AppError>(written)
        };

        let written = tokio::time::timeout(deadline, copy).await.map_err(|_| {
            AppError::Timeout(format!(
                "download of itag {} exceeded {}s",
                format.itag,
                deadline.as_secs()
            ))
        })??;

        tracing::debug!(
            itag = format.itag,
            size_bytes = written,
            duration_ms = start.elapsed().as_millis() as u64,
            "Stream downloaded"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{sample_manifest, FakeYouTubeClient, RecordingMuxer};
    use tokio::io::AsyncReadExt;

    fn resolver(
        client: Arc<FakeYouTubeClient>,
        muxer: Arc<RecordingMuxer>,
        temp_dir: &Path,
    ) -> YouTubeResolver {
        YouTubeResolver::new(
            client,
            muxer,
            YouTubeConfig {
                temp_dir: Some(temp_dir.to_path_buf()),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_fetch_merges_selected_streams() {
        let scratch = tempfile::tempdir().unwrap();
        let client = Arc::new(FakeYouTubeClient::new());
        client.add_video(sample_manifest("dQw4w9WgXcQ"), b"VIDEO".to_vec(), b"AUDIO".to_vec());
        let muxer = Arc::new(RecordingMuxer::new());
        let resolver = resolver(client.clone(), muxer.clone(), scratch.path());

        let (mut stream, info) = resolver.fetch("dQw4w9WgXcQ", None).await.unwrap();
        assert_eq!(info.author, "Rick Astley");
        assert_eq!(stream.file_name, "Never Gonna Give You Up.mp4");
        assert_eq!(stream.size, 10);
        assert_eq!(stream.video_itag, 136);
        assert_eq!(stream.audio_itag, 140);

        let descriptor = stream.descriptor(&info);
        assert_eq!(descriptor.native_id, "dQw4w9WgXcQ");
        assert_eq!(descriptor.byte_size, Some(10));
        assert_eq!(descriptor.content_type(), "video/mp4");

        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"VIDEOAUDIO");
        assert_eq!(muxer.calls(), 1);
        assert_eq!(client.open_count(), 2);

        let dir = stream.scratch_dir().to_path_buf();
        assert!(dir.exists());
        drop(stream);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_merge_failure_cleans_up() {
        let scratch = tempfile::tempdir().unwrap();
        let client = Arc::new(FakeYouTubeClient::new());
        client.add_video(sample_manifest("dQw4w9WgXcQ"), b"V".to_vec(), b"A".to_vec());
        let muxer = Arc::new(RecordingMuxer::failing());
        let resolver = resolver(client, muxer, scratch.path());

        let result = resolver.fetch("dQw4w9WgXcQ", Some(720)).await;
        assert!(matches!(result, Err(AppError::Merge { .. })));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_no_audio_stream_is_rejected_before_download() {
        let scratch = tempfile::tempdir().unwrap();
        let client = Arc::new(FakeYouTubeClient::new());
        let mut manifest = sample_manifest("dQw4w9WgXcQ");
        manifest.formats.retain(|f| !f.is_audio_only());
        client.add_video(manifest, b"V".to_vec(), vec![]);
        let muxer = Arc::new(RecordingMuxer::new());
        let resolver = resolver(client.clone(), muxer.clone(), scratch.path());

        let result = resolver.fetch("dQw4w9WgXcQ", None).await;
        assert!(matches!(result, Err(AppError::NoSuitableFormat(_))));
        assert_eq!(client.open_count(), 0);
        assert_eq!(muxer.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_returns_info() {
        let scratch = tempfile::tempdir().unwrap();
        let client = Arc::new(FakeYouTubeClient::new());
        client.add_video(sample_manifest("dQw4w9WgXcQ"), vec![], vec![]);
        let resolver = resolver(client, Arc::new(RecordingMuxer::new()), scratch.path());

        let info = resolver.resolve("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert!(matches!(
            resolver.resolve("missing").await,
            Err(AppError::ExtractionUnavailable(_))
        ));
    }
}
