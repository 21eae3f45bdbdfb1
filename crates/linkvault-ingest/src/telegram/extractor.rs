use linkvault_core::models::MediaDescriptor;
use linkvault_core::AppError;
use std::sync::Arc;

use super::client::{ChannelRef, FileLocation, TelegramClient};
use super::media::describe_message;
use crate::ByteStream;

/// Albums are looked up in this many message ids on either side of the
/// requested one.
const ALBUM_WINDOW: i64 = 9;

/// One downloadable item of a post.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMedia {
    pub descriptor: MediaDescriptor,
    pub location: FileLocation,
}

/// All media of a post, ordered by message id.
#[derive(Debug, Clone)]
pub struct TelegramPost {
    pub channel: ChannelRef,
    pub message_id: i64,
    pub items: Vec<ExtractedMedia>,
}

/// Enumerates and downloads the media of a Telegram post.
///
/// Without a client (no session or credentials configured) every call fails
/// with [`AppError::ExtractionUnavailable`].
#[derive(Clone)]
pub struct TelegramExtractor {
    client: Option<Arc<dyn TelegramClient>>,
}

impl TelegramExtractor {
    pub fn new(client: Option<Arc<dyn TelegramClient>>) -> Self {
        Self { client }
    }

    pub fn unavailable() -> Self {
        Self { client: None }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&Arc<dyn TelegramClient>, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::ExtractionUnavailable("Telegram session is not configured".to_string())
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn extract(&self, channel: &str, message_id: i64) -> Result<TelegramPost, AppError> {
        let client = self.client()?;

        let channel_ref = client.resolve_channel(channel).await?;
        let messages = client.fetch_messages(&channel_ref, &[message_id]).await?;
        let message = messages
            .into_iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| {
                AppError::NoMedia(format!("message {} not found in {}", message_id, channel))
            })?;

        let mut group = match message.grouped_id {
            Some(grouped_id) => {
                let window: Vec<i64> = (message_id.saturating_sub(ALBUM_WINDOW).max(1)
                    ..=message_id.saturating_add(ALBUM_WINDOW))
                    .collect();
                let mut members: Vec<_> = client
                    .fetch_messages(&channel_ref, &window)
                    .await?
                    .into_iter()
                    .filter(|m| m.grouped_id == Some(grouped_id))
                    .collect();
                if !members.iter().any(|m| m.id == message_id) {
                    members.push(message);
                }
                members
            }
            None => vec![message],
        };
        group.sort_by_key(|m| m.id);
        group.dedup_by_key(|m| m.id);

        let items: Vec<ExtractedMedia> = group
            .iter()
            .filter_map(describe_message)
            .map(|(descriptor, location)| ExtractedMedia {
                descriptor: descriptor
                    .with_metadata("channel", channel_ref.username.clone())
                    .with_metadata("channel_title", channel_ref.title.clone()),
                location,
            })
            .collect();

        if items.is_empty() {
            return Err(AppError::NoMedia(format!(
                "message {} in {} has no downloadable media",
                message_id, channel
            )));
        }

        tracing::debug!(
            channel = %channel,
            message_id,
            item_count = items.len(),
            "Telegram post extracted"
        );

        Ok(TelegramPost {
            channel: channel_ref,
            message_id,
            items,
        })
    }

    pub async fn download(&self, item: &ExtractedMedia) -> Result<ByteStream, AppError> {
        self.client()?.download_by_location(&item.location).await
    }
}
