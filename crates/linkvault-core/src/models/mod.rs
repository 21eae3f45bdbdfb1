//! Domain models for ingested content.

pub mod content;
pub mod descriptor;
pub mod media;

pub use content::{ContentRecord, ContentStatus, NewContentRecord, Platform};
pub use descriptor::{MediaDescriptor, MediaKind};
pub use media::{media_id_for, MediaItem};
