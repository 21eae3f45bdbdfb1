//! Stream format descriptors and selection.

use linkvault_core::AppError;
use serde::{Deserialize, Serialize};

/// Basic facts about a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub length_seconds: Option<u64>,
}

/// One downloadable stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamFormat {
    pub itag: u32,
    /// Full MIME type, e.g. `video/mp4; codecs="avc1.640028"`.
    pub mime_type: String,
    /// Container from the MIME subtype (`mp4`, `webm`, `m4a`, ...).
    pub container: String,
    pub has_video: bool,
    pub has_audio: bool,
    pub height: Option<u32>,
    pub quality_label: Option<String>,
    pub bitrate: u64,
    pub content_length: Option<u64>,
    pub url: String,
}

impl StreamFormat {
    pub fn is_video_only(&self) -> bool {
        self.has_video && !self.has_audio
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    /// Vertical resolution, from the height or else the quality label.
    pub fn quality(&self) -> u32 {
        self.height
            .or_else(|| self.quality_label.as_deref().and_then(parse_quality))
            .unwrap_or(0)
    }
}

/// Everything `list_formats` knows about a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoManifest {
    pub info: VideoInfo,
    pub formats: Vec<StreamFormat>,
}

/// `"720p"`, `"1080p60"` or `"480"` to the number of lines.
pub fn parse_quality(label: &str) -> Option<u32> {
    let digits: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|q| *q > 0)
}

/// Best video-only stream.
///
/// The candidate pool is the mp4 video-only formats, or every video-only
/// format if there is no mp4 one. With a requested quality an exact match
/// wins, then the numerically closest (the higher one on a tie); without one
/// the highest quality wins. Bitrate breaks remaining ties.
pub fn select_video(formats: &[StreamFormat], requested: Option<u32>) -> Option<&StreamFormat> {
    let video_only: Vec<&StreamFormat> = formats.iter().filter(|f| f.is_video_only()).collect();
    let mp4: Vec<&StreamFormat> = video_only
        .iter()
        .copied()
        .filter(|f| f.container == "mp4")
        .collect();
    let pool = if mp4.is_empty() { video_only } else { mp4 };

    match requested {
        Some(target) => pool.into_iter().min_by(|a, b| {
            let da = a.quality().abs_diff(target);
            let db = b.quality().abs_diff(target);
            da.cmp(&db)
                .then_with(|| b.quality().cmp(&a.quality()))
                .then_with(|| b.bitrate.cmp(&a.bitrate))
        }),
        None => pool
            .into_iter()
            .max_by(|a, b| a.quality().cmp(&b.quality()).then(a.bitrate.cmp(&b.bitrate))),
    }
}

/// Highest-bitrate audio-only stream, preferring mp4/m4a containers.
pub fn select_audio(formats: &[StreamFormat]) -> Option<&StreamFormat> {
    let audio_only: Vec<&StreamFormat> = formats.iter().filter(|f| f.is_audio_only()).collect();
    let preferred: Vec<&StreamFormat> = audio_only
        .iter()
        .copied()
        .filter(|f| matches!(f.container.as_str(), "mp4" | "m4a"))
        .collect();
    let pool = if preferred.is_empty() {
        audio_only
    } else {
        preferred
    };

    pool.into_iter().max_by_key(|f| f.bitrate)
}

/// Pick the (video, audio) pair or fail with `NoSuitableFormat`.
pub fn select_formats<'a>(
    manifest: &'a VideoManifest,
    requested: Option<u32>,
) -> Result<(&'a StreamFormat, &'a StreamFormat), AppError> {
    let video = select_video(&manifest.formats, requested).ok_or_else(|| {
        AppError::NoSuitableFormat(format!(
            "no video-only stream for {}",
            manifest.info.video_id
        ))
    })?;
    let audio = select_audio(&manifest.formats).ok_or_else(|| {
        AppError::NoSuitableFormat(format!(
            "no audio-only stream for {}",
            manifest.info.video_id
        ))
    })?;
    Ok((video, audio))
}
