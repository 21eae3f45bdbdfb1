//! Error types module
//!
//! All pipeline failures are unified under [`AppError`]. Each variant describes
//! itself through [`ErrorMetadata`] so that the orchestrator can decide what to
//! log, at which level, and what to persist on a failed content record.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like malformed links
    Debug,
    /// Warning level - for recoverable issues like an unreachable platform
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Self-description of an error: how it is logged and what survives into
/// persisted state.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "MERGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether re-submitting the link may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the operator
    fn suggested_action(&self) -> Option<&'static str>;

    /// Human-readable message safe to persist on a content record
    fn client_message(&self) -> String;

    /// Whether details should be kept out of persisted state
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("No suitable format: {0}")]
    NoSuitableFormat(String),

    #[error("Merge failed: {message}")]
    Merge { message: String, output: String },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("{failed} of {total} media items failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("No media found: {0}")]
    NoMedia(String),

    #[error("Compensating delete failed for {key}: {message}")]
    CompensationFailed { key: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, bool, LogLevel) {
    match err {
        AppError::InvalidLink(_) => (
            "INVALID_LINK",
            false,
            Some("Submit a t.me post link or a YouTube video link"),
            false,
            LogLevel::Debug,
        ),
        AppError::ExtractionUnavailable(_) => (
            "EXTRACTION_UNAVAILABLE",
            true,
            Some("Check platform credentials and connectivity, then re-submit"),
            false,
            LogLevel::Warn,
        ),
        AppError::NoSuitableFormat(_) => (
            "NO_SUITABLE_FORMAT",
            false,
            Some("Try a different quality or check the video is available"),
            false,
            LogLevel::Warn,
        ),
        AppError::Merge { .. } => (
            "MERGE_ERROR",
            true,
            Some("Check the ffmpeg installation and re-submit"),
            false,
            LogLevel::Error,
        ),
        AppError::Download(_) => (
            "DOWNLOAD_ERROR",
            true,
            Some("Re-submit the link"),
            false,
            LogLevel::Warn,
        ),
        AppError::Timeout(_) => (
            "TIMEOUT",
            true,
            Some("Re-submit the link or raise the download timeout"),
            false,
            LogLevel::Warn,
        ),
        AppError::Cancelled(_) => (
            "CANCELLED",
            true,
            Some("Re-submit the link once the service is running"),
            false,
            LogLevel::Warn,
        ),
        AppError::PartialFailure { .. } => (
            "PARTIAL_FAILURE",
            true,
            Some("Re-submit the link; stored items are skipped"),
            false,
            LogLevel::Warn,
        ),
        AppError::NoMedia(_) => (
            "NO_MEDIA",
            false,
            Some("Check that the post contains media"),
            false,
            LogLevel::Debug,
        ),
        AppError::CompensationFailed { .. } => (
            "COMPENSATION_FAILED",
            false,
            Some("Reconcile the storage object with the metadata store manually"),
            true,
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Verify the content ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidState(_) => (
            "INVALID_STATE",
            false,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::Database(_) => (
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for logging
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidLink(_) => "InvalidLink",
            AppError::ExtractionUnavailable(_) => "ExtractionUnavailable",
            AppError::NoSuitableFormat(_) => "NoSuitableFormat",
            AppError::Merge { .. } => "Merge",
            AppError::Download(_) => "Download",
            AppError::Timeout(_) => "Timeout",
            AppError::Cancelled(_) => "Cancelled",
            AppError::PartialFailure { .. } => "PartialFailure",
            AppError::NoMedia(_) => "NoMedia",
            AppError::CompensationFailed { .. } => "CompensationFailed",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidState(_) => "InvalidState",
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }

    /// The text stored in a failed content record's `error_message`.
    pub fn persisted_message(&self) -> String {
        format!("{}: {}", self.error_code(), self.client_message())
    }

    /// Adds context (content id, media id) to the human-readable part of
    /// message-carrying variants.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            AppError::Download(msg) => AppError::Download(format!("{}: {}", ctx, msg)),
            AppError::Timeout(msg) => AppError::Timeout(format!("{}: {}", ctx, msg)),
            AppError::Storage(msg) => AppError::Storage(format!("{}: {}", ctx, msg)),
            AppError::Internal(msg) => AppError::Internal(format!("{}: {}", ctx, msg)),
            other => other,
        }
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidLink(ref msg) => format!("unrecognized link: {}", msg),
            AppError::ExtractionUnavailable(ref msg) => msg.clone(),
            AppError::NoSuitableFormat(ref msg) => msg.clone(),
            AppError::Merge { ref message, .. } => message.clone(),
            AppError::Download(ref msg) => msg.clone(),
            AppError::Timeout(ref msg) => msg.clone(),
            AppError::Cancelled(ref msg) => msg.clone(),
            AppError::PartialFailure { failed, total } => {
                format!("{} of {} media items failed", failed, total)
            }
            AppError::NoMedia(ref msg) => msg.clone(),
            AppError::CompensationFailed { .. } => {
                "Stored object could not be removed after a metadata failure".to_string()
            }
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::InvalidState(ref msg) => msg.clone(),
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}
