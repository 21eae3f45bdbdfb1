//! In-memory doubles for every external seam of the pipeline.

mod clients;
mod stores;

pub use clients::{sample_manifest, FakeTelegramClient, FakeYouTubeClient, RecordingMuxer};
pub use stores::{MemoryContentStore, MemoryMediaItemStore, MemoryStorage};

use crate::orchestrator::{IngestOrchestrator, IngestReport};

/// Wait for every running ingestion, then read the record back.
pub async fn settle(orchestrator: &IngestOrchestrator, content_id: &str) -> IngestReport {
    orchestrator.drain().await;
    orchestrator
        .status(content_id)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("content {} was never recorded", content_id))
}
