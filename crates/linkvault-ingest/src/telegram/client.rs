use async_trait::async_trait;
use linkvault_core::AppError;

use crate::ByteStream;

/// A resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: i64,
    pub access_hash: i64,
    pub username: String,
    pub title: String,
}

/// A channel message as returned by the protocol client.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub id: i64,
    /// Shared by all messages of an album.
    pub grouped_id: Option<i64>,
    pub media: Option<RawMedia>,
}

/// Media payload of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMedia {
    Photo(RawPhoto),
    Document(RawDocument),
    /// Web page previews, polls, geo points and the like.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPhoto {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: Vec<u8>,
    pub sizes: Vec<PhotoSize>,
}

/// One size variant of a photo. `kind` is the protocol's size letter
/// (`s`, `m`, `x`, `y`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSize {
    pub kind: String,
    pub width: i32,
    pub height: i32,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: Vec<u8>,
    pub mime_type: Option<String>,
    pub size: u64,
    pub attributes: Vec<DocumentAttribute>,
}

/// Document attributes the extractor looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentAttribute {
    Filename(String),
    Video {
        duration_secs: f64,
        width: i32,
        height: i32,
        round_message: bool,
    },
    Animated,
    ImageSize {
        width: i32,
        height: i32,
    },
    Audio {
        duration_secs: i32,
        voice: bool,
        title: Option<String>,
        performer: Option<String>,
    },
    Sticker,
}

/// Where to download a file from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocation {
    Photo {
        id: i64,
        access_hash: i64,
        file_reference: Vec<u8>,
        thumb_size: String,
    },
    Document {
        id: i64,
        access_hash: i64,
        file_reference: Vec<u8>,
    },
}

impl FileLocation {
    pub fn id(&self) -> i64 {
        match self {
            FileLocation::Photo { id, .. } | FileLocation::Document { id, .. } => *id,
        }
    }
}

/// Low-level protocol primitives the extractor composes. Session and
/// connection lifecycle are the implementor's concern.
#[async_trait]
pub trait TelegramClient: Send + Sync {
    async fn resolve_channel(&self, username: &str) -> Result<ChannelRef, AppError>;

    /// Fetch messages by id. Ids that do not exist are omitted.
    async fn fetch_messages(
        &self,
        channel: &ChannelRef,
        ids: &[i64],
    ) -> Result<Vec<RawMessage>, AppError>;

    async fn download_by_location(&self, location: &FileLocation) -> Result<ByteStream, AppError>;
}
