//! Platform classifier: purely syntactic, no network access.

use linkvault_core::models::Platform;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const TELEGRAM_HOSTS: [&str; 2] = ["t.me", "telegram.me"];

/// YouTube URL shapes in priority order; the first match wins.
const YOUTUBE_PATTERNS: [&str; 5] = [
    r"^(?:https?://)?(?:(?:www|m|music)\.)?youtube\.com/watch\?(?:[^#]*&)?v=([A-Za-z0-9_-]{11})(?:[&#]|$)",
    r"^(?:https?://)?youtu\.be/([A-Za-z0-9_-]{11})(?:[/?&#]|$)",
    r"^(?:https?://)?(?:(?:www|m)\.)?youtube(?:-nocookie)?\.com/embed/([A-Za-z0-9_-]{11})(?:[/?&#]|$)",
    r"^(?:https?://)?(?:(?:www|m)\.)?youtube\.com/v/([A-Za-z0-9_-]{11})(?:[/?&#]|$)",
    r"^(?:https?://)?(?:(?:www|m)\.)?youtube\.com/shorts/([A-Za-z0-9_-]{11})(?:[/?&#]|$)",
];

static YOUTUBE_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    YOUTUBE_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// What a submitted link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Telegram { channel: String, message_id: i64 },
    YouTube { video_id: String },
    Unrecognized,
}

impl LinkTarget {
    pub fn platform(&self) -> Option<Platform> {
        match self {
            LinkTarget::Telegram { .. } => Some(Platform::Telegram),
            LinkTarget::YouTube { .. } => Some(Platform::Youtube),
            LinkTarget::Unrecognized => None,
        }
    }

    /// Deterministic content id: `<channel>_<message_id>` or `youtube_<video_id>`.
    pub fn content_id(&self) -> Option<String> {
        match self {
            LinkTarget::Telegram {
                channel,
                message_id,
            } => Some(format!("{}_{}", channel, message_id)),
            LinkTarget::YouTube { video_id } => Some(format!("youtube_{}", video_id)),
            LinkTarget::Unrecognized => None,
        }
    }
}

/// Classify a link as a Telegram post, a YouTube video or neither.
pub fn classify(link: &str) -> LinkTarget {
    let link = link.trim();
    if link.is_empty() {
        return LinkTarget::Unrecognized;
    }

    if let Some(target) = classify_telegram(link) {
        return target;
    }

    classify_youtube(link).unwrap_or(LinkTarget::Unrecognized)
}

fn classify_telegram(link: &str) -> Option<LinkTarget> {
    let url = if link.contains("://") {
        Url::parse(link).ok()?
    } else {
        Url::parse(&format!("https://{}", link)).ok()?
    };

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?;
    if !TELEGRAM_HOSTS.contains(&host) {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let [channel, message_id] = segments.as_slice() else {
        return None;
    };

    if channel.is_empty()
        || !channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }

    if message_id.is_empty() || !message_id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let message_id: i64 = message_id.parse().ok()?;
    if message_id <= 0 {
        return None;
    }

    Some(LinkTarget::Telegram {
        channel: channel.to_string(),
        message_id,
    })
}

fn classify_youtube(link: &str) -> Option<LinkTarget> {
    YOUTUBE_REGEXES.iter().find_map(|re| {
        re.captures(link)
            .and_then(|caps| caps.get(1))
            .map(|m| LinkTarget::YouTube {
                video_id: m.as_str().to_string(),
            })
    })
}
