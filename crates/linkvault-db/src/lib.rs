//! Linkvault Database Layer
//!
//! Postgres repositories for content records and media items, the store traits
//! the ingestion pipeline is written against, and pool/migration setup.

pub mod content;
pub mod media_item;
pub mod setup;
pub mod store_traits;

pub use content::ContentRepository;
pub use media_item::MediaItemRepository;
pub use setup::setup_database;
pub use store_traits::{ContentStore, MediaItemStore};
