use async_trait::async_trait;
use linkvault_core::AppError;

use super::formats::{StreamFormat, VideoManifest};
use crate::ByteStream;

/// Source of YouTube format listings and streams.
#[async_trait]
pub trait YouTubeClient: Send + Sync {
    /// All formats of a video, with its basic info.
    ///
    /// Fails with [`AppError::ExtractionUnavailable`] when the video cannot be
    /// played (private, removed, region locked) or the service is unreachable.
    async fn list_formats(&self, video_id: &str) -> Result<VideoManifest, AppError>;

    /// Open one format for reading.
    async fn open_stream(&self, format: &StreamFormat) -> Result<ByteStream, AppError>;
}
