//! Linkvault ingestion pipeline
//!
//! Turns a submitted link into stored media:
//!
//! - [`classifier`] decides whether a link is a Telegram post or a YouTube video.
//! - [`telegram`] enumerates the media of a post (albums included) and downloads them.
//! - [`youtube`] picks a video-only and an audio-only stream, downloads both and
//!   muxes them into one mp4 with ffmpeg.
//! - [`store`] hashes bytes while uploading them and records the media item,
//!   skipping items whose media id is already recorded.
//! - [`orchestrator`] ties it together and drives the content record through
//!   `Pending -> Processing -> Completed | Failed`.

pub mod classifier;
pub mod orchestrator;
pub mod spawner;
pub mod store;
pub mod telegram;
pub mod youtube;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classifier::{classify, LinkTarget};
pub use orchestrator::{IngestConfig, IngestOrchestrator, IngestReport, SubmitOptions};
pub use store::{MediaStore, StoreOutcome, StoreTarget};

/// Byte source handed from a platform client to storage.
pub type ByteStream = linkvault_storage::StorageReader;
