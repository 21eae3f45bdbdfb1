use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deterministic media id: `<content_id>_<native_id>`.
///
/// Stable across retries so that already-stored items are recognised and
/// skipped.
pub fn media_id_for(content_id: &str, native_id: &str) -> String {
    format!("{}_{}", content_id, native_id)
}

/// One stored binary object and its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MediaItem {
    pub media_id: String,
    pub content_id: String,
    pub origin_file_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub byte_size: i64,
    /// Lowercase hex SHA-256 of exactly the stored bytes.
    pub content_hash: String,
    pub storage_backend: String,
    pub storage_bucket: String,
    pub storage_key: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl MediaItem {
    /// Id of an earlier item with identical bytes, if one was recorded at
    /// upload time.
    pub fn duplicate_of(&self) -> Option<&str> {
        self.metadata.get("duplicate_of").and_then(|v| v.as_str())
    }
}
