use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Coarse kind of a downloadable item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Everything known about one item before its bytes are fetched.
///
/// `native_id` is the platform's identifier for the item (Telegram message id
/// or YouTube video id) and, together with the content id, determines the
/// item's media id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub native_id: String,
    pub file_name: String,
    /// Size announced by the platform. The stored size is the number of bytes
    /// actually read, which may differ.
    pub byte_size: Option<u64>,
    pub mime_type: Option<String>,
    pub kind: MediaKind,
    /// Platform-specific fields carried into the object metadata and the
    /// media item's metadata column.
    pub metadata: BTreeMap<String, String>,
}

impl MediaDescriptor {
    pub fn new(native_id: impl Into<String>, file_name: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            native_id: native_id.into(),
            file_name: file_name.into(),
            byte_size: None,
            mime_type: None,
            kind,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.byte_size = Some(size);
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// MIME type to store, falling back to a generic binary type.
    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let d = MediaDescriptor::new("42", "clip.mp4", MediaKind::Video)
            .with_size(500_000)
            .with_mime("video/mp4")
            .with_metadata("message_id", "42");

        assert_eq!(d.byte_size, Some(500_000));
        assert_eq!(d.content_type(), "video/mp4");
        assert_eq!(d.metadata.get("message_id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_content_type_default() {
        let d = MediaDescriptor::new("1", "blob", MediaKind::Document);
        assert_eq!(d.content_type(), "application/octet-stream");
    }
}
