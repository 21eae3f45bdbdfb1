//! YouTube client over the Innertube player endpoint.

use async_trait::async_trait;
use futures::TryStreamExt;
use linkvault_core::AppError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_util::io::StreamReader;

use super::client::YouTubeClient;
use super::formats::{StreamFormat, VideoInfo, VideoManifest};
use crate::ByteStream;

const PLAYER_PATH: &str = "/youtubei/v1/player";

#[derive(Debug, Clone)]
pub struct InnertubeConfig {
    /// `https://www.youtube.com` in production.
    pub api_base: String,
    pub client_name: String,
    pub client_version: String,
    pub connect_timeout: Duration,
}

impl Default for InnertubeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.youtube.com".to_string(),
            client_name: "ANDROID".to_string(),
            client_version: "19.09.37".to_string(),
            connect_timeout: Duration::from_secs(15),
        }
    }
}

pub struct InnertubeClient {
    http: reqwest::Client,
    config: InnertubeConfig,
}

impl InnertubeClient {
    pub fn new(config: InnertubeConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(format!(
                "com.google.android.youtube/{} (Linux; U; Android 11) gzip",
                config.client_version
            ))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn player_url(&self) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), PLAYER_PATH)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    video_details: Option<VideoDetails>,
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    video_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    length_seconds: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<RawFormat>,
    #[serde(default)]
    adaptive_formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormat {
    itag: u32,
    /// Absent when the URL is behind a signature cipher.
    url: Option<String>,
    mime_type: String,
    #[serde(default)]
    bitrate: u64,
    height: Option<u32>,
    quality_label: Option<String>,
    content_length: Option<String>,
}

impl RawFormat {
    fn into_stream_format(self, muxed: bool) -> Option<StreamFormat> {
        let url = self.url?;
        let essence = self.mime_type.split(';').next().unwrap_or("").trim();
        let (top, subtype) = essence.split_once('/')?;
        let is_video = top == "video";
        let is_audio = top == "audio";
        if !is_video && !is_audio {
            return None;
        }

        Some(StreamFormat {
            itag: self.itag,
            container: subtype.to_ascii_lowercase(),
            mime_type: self.mime_type,
            has_video: is_video,
            has_audio: is_audio || muxed,
            height: self.height,
            quality_label: self.quality_label,
            bitrate: self.bitrate,
            content_length: self.content_length.and_then(|l| l.parse().ok()),
            url,
        })
    }
}

fn into_manifest(video_id: &str, response: PlayerResponse) -> Result<VideoManifest, AppError> {
    if let Some(status) = &response.playability_status {
        if status.status != "OK" {
            return Err(AppError::ExtractionUnavailable(format!(
                "video {} is not playable: {}",
                video_id,
                status.reason.as_deref().unwrap_or(&status.status)
            )));
        }
    }

    let details = response.video_details.ok_or_else(|| {
        AppError::ExtractionUnavailable(format!("no video details for {}", video_id))
    })?;
    let streaming = response.streaming_data.unwrap_or_default();

    let formats: Vec<StreamFormat> = streaming
        .formats
        .into_iter()
        .filter_map(|f| f.into_stream_format(true))
        .chain(
            streaming
                .adaptive_formats
                .into_iter()
                .filter_map(|f| f.into_stream_format(false)),
        )
        .collect();

    Ok(VideoManifest {
        info: VideoInfo {
            video_id: details.video_id,
            title: details.title,
            author: details.author,
            length_seconds: details.length_seconds.and_then(|s| s.parse().ok()),
        },
        formats,
    })
}

#[async_trait]
impl YouTubeClient for InnertubeClient {
    #[tracing::instrument(skip(self))]
    async fn list_formats(&self, video_id: &str) -> Result<VideoManifest, AppError> {
        let body = json!({
            "videoId": video_id,
            "context": {
                "client": {
                    "clientName": self.config.client_name,
                    "clientVersion": self.config.client_version,
                    "androidSdkVersion": 30,
                    "hl": "en",
                    "gl": "US"
                }
            },
            "contentCheckOk": true,
            "racyCheckOk": true
        });

        let response = self
            .http
            .post(self.player_url())
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                AppError::ExtractionUnavailable(format!("player request failed: {}", e))
            })?;

        let player: PlayerResponse = response.json().await.map_err(|e| {
            AppError::ExtractionUnavailable(format!("malformed player response: {}", e))
        })?;

        let manifest = into_manifest(video_id, player)?;
        tracing::debug!(
            video_id = %video_id,
            format_count = manifest.formats.len(),
            "YouTube formats listed"
        );
        Ok(manifest)
    }

    async fn open_stream(&self, format: &StreamFormat) -> Result<ByteStream, AppError> {
        let response = self
            .http
            .get(&format.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Download(format!("itag {}: {}", format.itag, e)))?;

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(Box::pin(stream))))
    }
}
