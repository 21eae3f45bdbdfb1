use async_trait::async_trait;
use linkvault_core::AppError;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::telegram::client::{ChannelRef, FileLocation, RawMedia, RawMessage, TelegramClient};
use crate::youtube::formats::{StreamFormat, VideoInfo, VideoManifest};
use crate::youtube::{MuxOutput, Muxer, YouTubeClient};
use crate::ByteStream;

fn cursor(data: Vec<u8>) -> ByteStream {
    Box::pin(std::io::Cursor::new(data))
}

pub struct FakeTelegramClient {
    channel: String,
    messages: Mutex<HashMap<i64, RawMessage>>,
    payloads: Mutex<HashMap<i64, Vec<u8>>>,
    failing: Mutex<HashSet<i64>>,
    downloads: Mutex<HashMap<i64, usize>>,
}

impl FakeTelegramClient {
    pub fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            messages: Mutex::new(HashMap::new()),
            payloads: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            downloads: Mutex::new(HashMap::new()),
        }
    }

    /// Register a message and the bytes of its media.
    pub fn add_message(&self, message: RawMessage, payload: Vec<u8>) {
        let location_id = match &message.media {
            Some(RawMedia::Photo(photo)) => Some(photo.id),
            Some(RawMedia::Document(document)) => Some(document.id),
            _ => None,
        };
        if let Some(id) = location_id {
            self.payloads.lock().unwrap().insert(id, payload);
        }
        self.messages.lock().unwrap().insert(message.id, message);
    }

    /// Make downloads of a file id fail (or succeed again).
    pub fn set_failing(&self, location_id: i64, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(location_id);
        } else {
            set.remove(&location_id);
        }
    }

    pub fn downloads_of(&self, location_id: i64) -> usize {
        self.downloads
            .lock()
            .unwrap()
            .get(&location_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_downloads(&self) -> usize {
        self.downloads.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl TelegramClient for FakeTelegramClient {
    async fn resolve_channel(&self, username: &str) -> Result<ChannelRef, AppError> {
        if username == "panicchan" {
            panic!("injected client panic");
        }
        if !username.eq_ignore_ascii_case(&self.channel) {
            return Err(AppError::ExtractionUnavailable(format!(
                "channel {} cannot be resolved",
                username
            )));
        }
        Ok(ChannelRef {
            id: 1_000_001,
            access_hash: 77,
            username: self.channel.clone(),
            title: "Example Channel".to_string(),
        })
    }

    async fn fetch_messages(
        &self,
        _channel: &ChannelRef,
        ids: &[i64],
    ) -> Result<Vec<RawMessage>, AppError> {
        let messages = self.messages.lock().unwrap();
        Ok(ids.iter().filter_map(|id| messages.get(id).cloned()).collect())
    }

    async fn download_by_location(&self, location: &FileLocation) -> Result<ByteStream, AppError> {
        let id = location.id();
        *self.downloads.lock().unwrap().entry(id).or_insert(0) += 1;

        if self.failing.lock().unwrap().contains(&id) {
            return Err(AppError::Download(format!("file {}: connection reset", id)));
        }
        let payload = self
            .payloads
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::Download(format!("file {} not found", id)))?;
        Ok(cursor(payload))
    }
}

/// One 720p mp4 video-only stream (itag 136) and one 128k audio-only stream
/// (itag 140).
pub fn sample_manifest(video_id: &str) -> VideoManifest {
    VideoManifest {
        info: VideoInfo {
            video_id: video_id.to_string(),
            title: "Never Gonna Give You Up".to_string(),
            author: "Rick Astley".to_string(),
            length_seconds: Some(212),
        },
        formats: vec![
            StreamFormat {
                itag: 136,
                mime_type: "video/mp4; codecs=\"avc1.4d401f\"".to_string(),
                container: "mp4".to_string(),
                has_video: true,
                has_audio: false,
                height: Some(720),
                quality_label: Some("720p".to_string()),
                bitrate: 2_000_000,
                content_length: None,
                url: "https://media.example/136".to_string(),
            },
            StreamFormat {
                itag: 140,
                mime_type: "audio/mp4; codecs=\"mp4a.40.2\"".to_string(),
                container: "mp4".to_string(),
                has_video: false,
                has_audio: true,
                height: None,
                quality_label: None,
                bitrate: 128_000,
                content_length: None,
                url: "https://media.example/140".to_string(),
            },
        ],
    }
}

#[derive(Default)]
pub struct FakeYouTubeClient {
    manifests: Mutex<HashMap<String, VideoManifest>>,
    payloads: Mutex<HashMap<u32, Vec<u8>>>,
    opens: AtomicUsize,
}

impl FakeYouTubeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a video; every video-only format serves `video`, every
    /// audio-only format serves `audio`.
    pub fn add_video(&self, manifest: VideoManifest, video: Vec<u8>, audio: Vec<u8>) {
        let mut payloads = self.payloads.lock().unwrap();
        for format in &manifest.formats {
            if format.is_video_only() {
                payloads.insert(format.itag, video.clone());
            } else if format.is_audio_only() {
                payloads.insert(format.itag, audio.clone());
            }
        }
        self.manifests
            .lock()
            .unwrap()
            .insert(manifest.info.video_id.clone(), manifest);
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl YouTubeClient for FakeYouTubeClient {
    async fn list_formats(&self, video_id: &str) -> Result<VideoManifest, AppError> {
        self.manifests
            .lock()
            .unwrap()
            .get(video_id)
            .cloned()
            .ok_or_else(|| AppError::ExtractionUnavailable(format!("video {} unavailable", video_id)))
    }

    async fn open_stream(&self, format: &StreamFormat) -> Result<ByteStream, AppError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let payload = self
            .payloads
            .lock()
            .unwrap()
            .get(&format.itag)
            .cloned()
            .ok_or_else(|| AppError::Download(format!("itag {} not served", format.itag)))?;
        Ok(cursor(payload))
    }
}

/// Muxer that concatenates its inputs, or fails like a broken ffmpeg.
#[derive(Default)]
pub struct RecordingMuxer {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let muxer = Self::default();
        muxer.fail.store(true, Ordering::SeqCst);
        muxer
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Muxer for RecordingMuxer {
    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        _deadline: Duration,
    ) -> Result<MuxOutput, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Merge {
                message: "ffmpeg exited with exit status: 1".to_string(),
                output: "Invalid data found when processing input".to_string(),
            });
        }

        let mut merged = tokio::fs::read(video).await?;
        merged.extend(tokio::fs::read(audio).await?);
        tokio::fs::write(output, &merged).await?;

        Ok(MuxOutput {
            output_path: output.to_path_buf(),
            byte_size: merged.len() as u64,
            diagnostics: String::new(),
        })
    }
}
