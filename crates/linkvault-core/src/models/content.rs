use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Source platform of an ingested link.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "platform", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Telegram,
    Youtube,
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Platform::Telegram => write!(f, "telegram"),
            Platform::Youtube => write!(f, "youtube"),
        }
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telegram" => Ok(Platform::Telegram),
            "youtube" => Ok(Platform::Youtube),
            _ => Err(anyhow::anyhow!("Invalid platform: {}", s)),
        }
    }
}

/// Persisted lifecycle of a content record.
///
/// `Pending -> Processing -> {Completed, Failed}`, with `Failed -> Pending` as the
/// only backward edge (retry by re-submission).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "content_status", rename_all = "lowercase")
)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ContentStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ContentStatus) -> bool {
        matches!(
            (self, next),
            (ContentStatus::Pending, ContentStatus::Processing)
                | (ContentStatus::Processing, ContentStatus::Completed)
                | (ContentStatus::Processing, ContentStatus::Failed)
                | (ContentStatus::Failed, ContentStatus::Pending)
        )
    }

    /// Completed records are returned as-is on re-submission; everything else
    /// is (re)written as a fresh Pending record.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContentStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Pending => "pending",
            ContentStatus::Processing => "processing",
            ContentStatus::Completed => "completed",
            ContentStatus::Failed => "failed",
        }
    }
}

impl Display for ContentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ContentStatus::Pending),
            "processing" => Ok(ContentStatus::Processing),
            "completed" => Ok(ContentStatus::Completed),
            "failed" => Ok(ContentStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid content status: {}", s)),
        }
    }
}

/// One ingested link.
///
/// `media_count`/`total_size` are only meaningful once the record is
/// `Completed`; `error_message` only when it is `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ContentRecord {
    pub content_id: String,
    pub source_link: String,
    pub platform: Platform,
    /// Channel name or video author as first observed. Never overwritten.
    pub origin_name: Option<String>,
    /// Platform-normalized name, may be renamed later.
    pub display_name: Option<String>,
    pub status: ContentStatus,
    pub media_count: Option<i32>,
    pub total_size: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn is_completed(&self) -> bool {
        self.status == ContentStatus::Completed
    }

    /// Name used as the first segment of storage keys.
    pub fn storage_prefix(&self) -> &str {
        match self.platform {
            Platform::Youtube => "youtube",
            Platform::Telegram => self
                .origin_name
                .as_deref()
                .unwrap_or(self.content_id.as_str()),
        }
    }
}

/// Values for creating (or resetting) a Pending record.
#[derive(Debug, Clone)]
pub struct NewContentRecord {
    pub content_id: String,
    pub source_link: String,
    pub platform: Platform,
    pub origin_name: Option<String>,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_forward_edges() {
        assert!(ContentStatus::Pending.can_transition_to(ContentStatus::Processing));
        assert!(ContentStatus::Processing.can_transition_to(ContentStatus::Completed));
        assert!(ContentStatus::Processing.can_transition_to(ContentStatus::Failed));
    }

    #[test]
    fn test_lifecycle_rejects_skips_and_backward_edges() {
        assert!(!ContentStatus::Pending.can_transition_to(ContentStatus::Completed));
        assert!(!ContentStatus::Pending.can_transition_to(ContentStatus::Failed));
        assert!(!ContentStatus::Completed.can_transition_to(ContentStatus::Pending));
        assert!(!ContentStatus::Completed.can_transition_to(ContentStatus::Failed));
        assert!(!ContentStatus::Processing.can_transition_to(ContentStatus::Pending));
    }

    #[test]
    fn test_failed_is_the_only_backward_edge() {
        assert!(ContentStatus::Failed.can_transition_to(ContentStatus::Pending));
        assert!(!ContentStatus::Failed.can_transition_to(ContentStatus::Processing));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ContentStatus::Pending,
            ContentStatus::Processing,
            ContentStatus::Completed,
            ContentStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<ContentStatus>().unwrap(), status);
        }
        assert!("done".parse::<ContentStatus>().is_err());
    }

    #[test]
    fn test_storage_prefix_per_platform() {
        let now = Utc::now();
        let mut record = ContentRecord {
            content_id: "examplechan_42".to_string(),
            source_link: "https://t.me/examplechan/42".to_string(),
            platform: Platform::Telegram,
            origin_name: Some("examplechan".to_string()),
            display_name: Some("examplechan".to_string()),
            status: ContentStatus::Pending,
            media_count: None,
            total_size: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(record.storage_prefix(), "examplechan");

        record.platform = Platform::Youtube;
        assert_eq!(record.storage_prefix(), "youtube");
    }
}
